//! The CubeDB TCP service.
//!
//! One task per connection; a connection reads one line-framed request at
//! a time, dispatches it against the shared store, and writes the framed
//! reply before looking at the next request. Replies to different
//! connections never interleave because each reply is a single write of a
//! fully encoded buffer.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

mod connection;
mod dispatcher;

pub use dispatcher::CubeDb;

use observability_deps::tracing::{debug, info};
use snafu::{ResultExt, Snafu};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("error accepting connection: {}", source))]
    Accept { source: std::io::Error },

    #[snafu(display("error reading listener address: {}", source))]
    LocalAddr { source: std::io::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Accept connections on `listener` and serve them against `db` until the
/// listener fails.
pub async fn serve(listener: TcpListener, db: Arc<CubeDb>) -> Result<()> {
    let local = listener.local_addr().context(LocalAddrSnafu)?;
    info!(%local, "cubedb listening");

    loop {
        let (stream, remote) = listener.accept().await.context(AcceptSnafu)?;
        debug!(%remote, "accepted connection");
        tokio::spawn(connection::handle(Arc::clone(&db), stream, remote));
    }
}

//! Per-connection request loop.

use crate::dispatcher::CubeDb;
use cubedb_protocol::MAX_LINE_LENGTH;
use futures::StreamExt;
use observability_deps::tracing::{debug, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

/// Serve one connection to completion.
///
/// Command errors are replied to and the loop continues; protocol-level
/// failures (oversize line, bytes that are not UTF-8) terminate the
/// connection, as does `QUIT` after its OK.
pub(crate) async fn handle(db: Arc<CubeDb>, stream: TcpStream, remote: SocketAddr) {
    let (read_half, mut write_half) = stream.into_split();
    let mut requests = FramedRead::new(
        read_half,
        LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
    );

    while let Some(request) = requests.next().await {
        let line = match request {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!(%remote, "request line too long, closing connection");
                break;
            }
            Err(LinesCodecError::Io(source)) => {
                debug!(%remote, %source, "read failed, closing connection");
                break;
            }
        };

        let (reply, close) = db.handle_line(&line);
        if let Err(source) = write_half.write_all(&reply).await {
            debug!(%remote, %source, "write failed, closing connection");
            break;
        }
        if close {
            break;
        }
    }

    debug!(%remote, "connection done");
}

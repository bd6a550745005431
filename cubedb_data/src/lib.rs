//! Shared data types for CubeDB: dense symbol ids, argument validation and
//! the request types exchanged between the protocol, the store and the
//! server.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

mod ids;
mod request;
mod text;

pub use ids::*;
pub use request::*;
pub use text::*;

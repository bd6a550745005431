//! The CubeDB wire contract.
//!
//! Requests are single text lines: a case-insensitive verb and shell-style
//! tokenized arguments. Replies are framed as `0` for success, a negative
//! code for failure, or a count line optionally followed by exactly that
//! many payload lines. Both sides of this crate, the [`Command`] parser
//! and the [`Reply`] encoder, must stay byte-for-byte stable: every
//! client reimplements them.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

mod command;
mod grammar;
mod reply;
mod tokenizer;

pub use command::{help_lines, Command};
pub use grammar::{parse_filter, parse_row};
pub use reply::{Reply, WireError};
pub use tokenizer::tokenize;

/// The reply sent for `PING`.
pub const PONG: &str = "PONG";

/// Longest accepted request line in bytes. Anything longer is a protocol
/// violation and closes the connection.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

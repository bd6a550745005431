//! This crate exists to pin the tracing version used across the workspace.
//!
//! Every crate logs through this re-export so a version bump is a single
//! edit here rather than a sweep over every manifest.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]

pub use tracing;

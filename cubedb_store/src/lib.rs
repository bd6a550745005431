//! The CubeDB in-memory engine.
//!
//! A [`Store`] maps cube names to [`Cube`]s; a cube maps partition names to
//! [`Partition`]s ordered by name; a partition is an inverted index from
//! column id to value id to a summed count. All strings are interned once,
//! process-wide, by the store's [`Interner`].
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

mod cube;
mod interner;
mod partition;
mod query;
mod store;

pub use cube::Cube;
pub use interner::{Interner, SymbolTable};
pub use partition::Partition;
pub use store::{Error, PartitionRangeCount, RangeCount, Result, Store};

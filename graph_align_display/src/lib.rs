#![forbid(clippy::mod_module_files)]

//! Plain-text rendering of [`graph_align_core::GraphAlignment`] results: the
//! alignment-writer sink a demonstration CLI hands each successfully aligned
//! read to, short of a VCF/JSON serializer.

pub mod error;
pub mod plain_text;

pub use error::{Error, Result};
pub use plain_text::{Mate, write_alignment};

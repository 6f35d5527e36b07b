#![forbid(clippy::mod_module_files)]

//! A fixed-`k` k-mer index over a [`graph_model::Graph`], used to seed the gapped
//! graph aligner and to drive the orientation predictor.

pub mod error;
pub mod index;
pub mod kmer;

pub use error::{Error, Result};
pub use index::KmerIndex;
pub use kmer::Kmer;

#![forbid(clippy::mod_module_files)]

//! Orients, aligns, and classifies reads against targeted short tandem
//! repeat locus graphs: the k-mer-seeded gapped aligner's downstream half
//! (classification, in-repeat read recovery, coverage stats) tied together
//! by a per-locus driver.

pub mod classifier;
pub mod error;
pub mod irr;
pub mod locus;
pub mod read_source;
pub mod stats;

pub use error::{Error, Result};
pub use locus::{LocusDriver, LocusResult, LocusSpecification};

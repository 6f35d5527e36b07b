#![forbid(clippy::mod_module_files)]

//! CIGAR-style alignment records (C3) for a read aligned against a walk
//! through a sequence graph.

pub mod cigar;
pub mod error;
pub mod graph_alignment;
pub mod score;

pub use cigar::{LinearAlignment, Operation, OperationKind};
pub use error::{Error, Result};
pub use graph_alignment::GraphAlignment;
pub use score::{NMatchPolicy, Score, ScoreParameters};

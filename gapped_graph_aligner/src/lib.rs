#![forbid(clippy::mod_module_files)]

//! K-mer seeded gapped alignment of reads against a sequence graph (C7, C8):
//! the affine-gap DAG aligner over unrolled repeat nodes, the orientation
//! predictor, and the seed-and-extend pipeline that ties them together.

pub mod dag_aligner;
pub mod error;
pub mod gapped_aligner;
pub mod orientation;
pub mod unrolled;

pub use dag_aligner::{AffineScores, DEFAULT_MAX_REPEATS, DagAligner, DagAlignmentResult, NodeSegment, TargetStartPolicy};
pub use error::{Error, Result};
pub use gapped_aligner::{GappedAligner, HeuristicParameters};
pub use orientation::{Orientation, predict_orientation, reverse_complement};
pub use unrolled::{UnrolledGraph, unroll_backward, unroll_forward};

#![forbid(clippy::mod_module_files)]

//! The sequence graph data model: a labeled DAG of short sequences with
//! self-loops on repeat nodes, and the [`Path`] walk abstraction over it.

pub mod error;
pub mod graph;
pub mod node;
pub mod path;

#[cfg(feature = "json")]
pub mod json;

pub use error::{Error, Result};
pub use graph::{Graph, NodeId};
pub use node::Node;
pub use path::Path;

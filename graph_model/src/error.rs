use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Node {0} does not exist.")]
    UnknownNode(usize),

    #[error("Edge ({edge_source}, {sink}) breaks topological order: source must not exceed sink unless it is a self-loop on a repeat node.")]
    EdgeOrder { edge_source: usize, sink: usize },

    #[error("Edge ({0}, {1}) already exists.")]
    DuplicateEdge(usize, usize),

    #[error("Node sequence must not be empty.")]
    InvalidSequence,

    #[error("Path is invalid: {0}")]
    InvalidPath(String),

    #[error("An IO error occurred: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "json")]
    #[error("A JSON error occurred: {0}")]
    Json(#[from] serde_json::Error),
}

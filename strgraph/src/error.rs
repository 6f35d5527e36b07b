use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] graph_model::Error),

    #[error(transparent)]
    Align(#[from] graph_align_core::Error),

    #[error(transparent)]
    Kmer(#[from] kmer_index::Error),

    #[error(transparent)]
    GappedAlign(#[from] gapped_graph_aligner::Error),

    #[error(transparent)]
    Display(#[from] graph_align_display::Error),

    #[error("An IO error occurred: {0}")]
    Io(#[from] std::io::Error),

    #[error("A JSON error occurred: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid variant bundle: {0}")]
    InvalidBundle(String),

    #[error("IRR binding error: {0}")]
    IrrBinding(String),

    #[error("invalid read input: {0}")]
    InvalidInput(String),
}

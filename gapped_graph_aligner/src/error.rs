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
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("k-mer length {k} does not fit the {bits}-bit packed key type (max {max})")]
    KmerTooLong { k: usize, bits: usize, max: usize },

    #[error(transparent)]
    Graph(#[from] graph_model::Error),
}

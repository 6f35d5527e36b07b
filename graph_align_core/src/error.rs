use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("An IO error occurred: {0}.")]
    Io(#[from] std::io::Error),

    #[error("A parsing error occurred on string '{input}': {kind:?}.")]
    Parser {
        input: String,
        kind: nom::error::ErrorKind,
    },

    #[error("Parsing was unsuccessful due to incomplete input: {0:?}.")]
    ParserIncomplete(nom::Needed),

    #[error("Invalid CIGAR string: '{0}'.")]
    InvalidCigar(String),

    #[error("Alignment is inconsistent: {0}")]
    AlignmentInconsistent(String),

    #[error(transparent)]
    Graph(#[from] graph_model::Error),
}

impl Error {
    pub(crate) fn from_nom(input: &str, error: nom::Err<nom::error::Error<&str>>) -> Self {
        match error {
            nom::Err::Incomplete(needed) => Error::ParserIncomplete(needed),
            nom::Err::Error(_) | nom::Err::Failure(_) => Error::InvalidCigar(input.to_string()),
        }
    }
}

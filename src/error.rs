use thiserror::Error;

/// Errors produced while loading, querying or mutating a [`BpeTokenizerEditor`](crate::editor::BpeTokenizerEditor).
#[derive(Debug, Error)]
pub enum Error {
    /// The tokenizer file could not be read from or written to disk.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// The input was not valid JSON, or not structurally a tokenizer document.
    #[error("parse error: {0}")]
    ParseError(String),

    /// `model.type` was present but was not `"BPE"`.
    #[error("unsupported model type: {0:?} (expected \"BPE\")")]
    UnsupportedModel(String),

    /// A token string was already present in the vocabulary at insertion time.
    #[error("token already exists in vocabulary: {0:?}")]
    TokenExists(String),

    /// A numeric id was already assigned to another token at insertion time.
    #[error("id already assigned: {0}")]
    IdTaken(u32),

    /// An operation received a malformed argument, e.g. an empty token string.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConsolidationError>;

#[derive(Debug, Error)]
pub enum ConsolidationError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Core(#[from] corpus_core::error::CoreError),

    #[error("{0}")]
    Other(String),
}

impl From<String> for ConsolidationError {
    fn from(s: String) -> Self {
        ConsolidationError::Other(s)
    }
}

impl From<&str> for ConsolidationError {
    fn from(s: &str) -> Self {
        ConsolidationError::Other(s.to_string())
    }
}

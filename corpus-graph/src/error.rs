use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<String> for GraphError {
    fn from(s: String) -> Self {
        GraphError::Other(s)
    }
}

impl From<&str> for GraphError {
    fn from(s: &str) -> Self {
        GraphError::Other(s.to_string())
    }
}

impl From<corpus_core::error::CoreError> for GraphError {
    fn from(err: corpus_core::error::CoreError) -> Self {
        GraphError::Storage(err.to_string())
    }
}

impl From<GraphError> for corpus_core::error::CoreError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::EntityNotFound(id) => corpus_core::error::CoreError::NotFound(id),
            other => corpus_core::error::CoreError::Database(other.to_string()),
        }
    }
}

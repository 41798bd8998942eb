use thiserror::Error;

/// Result alias used throughout `corpus-core` and the crates built on it.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Error taxonomy shared by every stage of the consolidation pipeline.
///
/// Crate-local errors (`GraphError`, `StorageError`, `ProviderError`,
/// `ConsolidationError`) convert into this type at component boundaries so
/// that `corpus-server` has one place to map into the tool-facing error
/// kinds from the external interface.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("LLM error ({kind}): {message}")]
    Llm { kind: LlmErrorKind, message: String },

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("conflict resolution error: {0}")]
    ConflictResolution(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Sub-kind of an `LLMError`, carried alongside the message so retry policy
/// can distinguish retriable failures (timeout) from non-retriable ones
/// (schema mismatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    Timeout,
    Schema,
    Empty,
    Other,
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LlmErrorKind::Timeout => "timeout",
            LlmErrorKind::Schema => "schema",
            LlmErrorKind::Empty => "empty",
            LlmErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

impl CoreError {
    pub fn llm(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        CoreError::Llm {
            kind,
            message: message.into(),
        }
    }

    /// Whether a caller may reasonably retry this error.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            CoreError::Llm {
                kind: LlmErrorKind::Timeout,
                ..
            } | CoreError::Embedding(_)
        )
    }
}

impl From<String> for CoreError {
    fn from(s: String) -> Self {
        CoreError::Other(s)
    }
}

impl From<&str> for CoreError {
    fn from(s: &str) -> Self {
        CoreError::Other(s.to_string())
    }
}

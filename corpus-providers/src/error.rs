use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to provider timed out")]
    Timeout,

    #[error("provider returned an empty response")]
    Empty,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<String> for ProviderError {
    fn from(s: String) -> Self {
        ProviderError::Other(s)
    }
}

impl From<&str> for ProviderError {
    fn from(s: &str) -> Self {
        ProviderError::Other(s.to_string())
    }
}

impl From<ProviderError> for corpus_core::error::CoreError {
    fn from(err: ProviderError) -> Self {
        use corpus_core::error::LlmErrorKind;
        match err {
            ProviderError::Timeout => {
                corpus_core::error::CoreError::llm(LlmErrorKind::Timeout, "provider timeout")
            }
            ProviderError::Empty => {
                corpus_core::error::CoreError::llm(LlmErrorKind::Empty, "empty response")
            }
            other => corpus_core::error::CoreError::llm(LlmErrorKind::Other, other.to_string()),
        }
    }
}

use corpus_core::error::{CoreError, LlmErrorKind};
use corpus_consolidation::error::ConsolidationError;
use corpus_graph::error::GraphError;
use corpus_storage::error::StorageError;
use serde::Serialize;
use serde_json::Value;

/// The tool-facing error taxonomy from the external interface, independent
/// of any single crate's internal error enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    Validation,
    NotFound,
    Llm,
    Embedding,
    Database,
    ConflictResolution,
    Other,
}

/// An error surfaced to a tool caller: `{kind, message, context}`, with
/// `retriable` carried alongside for transports that want to distinguish
/// timeouts/outages from validation failures without re-deriving it.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
    pub context: Value,
    pub retriable: bool,
}

pub type Result<T> = std::result::Result<T, ToolError>;

impl ToolError {
    pub fn validation(message: impl Into<String>) -> Self {
        ToolError {
            kind: ToolErrorKind::Validation,
            message: message.into(),
            context: Value::Null,
            retriable: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ToolError {
            kind: ToolErrorKind::NotFound,
            message: message.into(),
            context: Value::Null,
            retriable: false,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }
}

impl From<CoreError> for ToolError {
    fn from(err: CoreError) -> Self {
        let retriable = err.is_retriable();
        let kind = match &err {
            CoreError::Validation(_) => ToolErrorKind::Validation,
            CoreError::NotFound(_) => ToolErrorKind::NotFound,
            CoreError::Llm { .. } => ToolErrorKind::Llm,
            CoreError::Embedding(_) => ToolErrorKind::Embedding,
            CoreError::Database(_) => ToolErrorKind::Database,
            CoreError::ConflictResolution(_) => ToolErrorKind::ConflictResolution,
            CoreError::Serialization(_) | CoreError::Other(_) => ToolErrorKind::Other,
        };
        ToolError {
            kind,
            message: err.to_string(),
            context: Value::Null,
            retriable,
        }
    }
}

impl From<ConsolidationError> for ToolError {
    fn from(err: ConsolidationError) -> Self {
        match err {
            ConsolidationError::Validation(message) => ToolError::validation(message),
            ConsolidationError::Core(core) => core.into(),
            ConsolidationError::Other(message) => ToolError {
                kind: ToolErrorKind::Other,
                message,
                context: Value::Null,
                retriable: false,
            },
        }
    }
}

impl From<GraphError> for ToolError {
    fn from(err: GraphError) -> Self {
        CoreError::from(err).into()
    }
}

impl From<StorageError> for ToolError {
    fn from(err: StorageError) -> Self {
        CoreError::from(err).into()
    }
}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError {
            kind: ToolErrorKind::Other,
            message: err.to_string(),
            context: Value::Null,
            retriable: false,
        }
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ToolErrorKind::Llm
        } else {
            ToolErrorKind::Other
        };
        ToolError {
            kind,
            message: err.to_string(),
            context: Value::Null,
            retriable: err.is_timeout(),
        }
    }
}

/// Helper used by orchestrators to surface a deadline expiry in the exact
/// shape documented for the external interface.
pub fn timeout_error(message: impl Into<String>) -> ToolError {
    CoreError::llm(LlmErrorKind::Timeout, message.into()).into()
}

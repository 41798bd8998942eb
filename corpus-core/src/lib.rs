//! Domain types and service contracts shared by every stage of the
//! consolidation pipeline: documents, sections, claims, entities,
//! conflicts, supersessions and consolidations, plus the narrow
//! `EmbeddingService`/`LLMService` traits the core depends on.

pub mod error;
pub mod traits;
pub mod types;

pub mod prelude {
    pub use crate::error::{CoreError, LlmErrorKind, Result};
    pub use crate::traits::{cosine_similarity, strip_code_fence};
    pub use crate::traits::{EmbeddingService, LLMService, LlmRequest, OutputFormat};
    pub use crate::types::*;
}

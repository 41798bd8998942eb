//! HTTP-backed and deterministic mock implementations of the
//! `EmbeddingService`/`LLMService` contracts from `corpus-core`.

pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;

pub mod prelude {
    pub use crate::config::ProviderConfig;
    pub use crate::embedding::{HttpEmbeddingService, MockEmbeddingService};
    pub use crate::error::{ProviderError, Result};
    pub use crate::llm::{call_llm_with_retry, HttpLLMService, MockLLMService};
}

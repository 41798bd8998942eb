pub mod embedding;
pub mod llm;

pub use embedding::{cosine_similarity, EmbeddingService};
pub use llm::{strip_code_fence, LLMService, LlmRequest, OutputFormat};

//! Entity resolution and the canonical entity graph: mentions resolve to
//! entities via exact/alias/embedding-nearest-neighbor matching before
//! falling back to creating a new entity, and claims link to entities
//! through idempotent mention edges.

pub mod error;
pub mod resolve;
pub mod storage;

pub mod prelude {
    pub use crate::error::{GraphError, Result};
    pub use crate::resolve::{classify_mention_type, resolve_mentions, Mention};
    pub use crate::storage::{InMemoryGraph, KnowledgeGraph};
}

mod in_memory;

pub use in_memory::InMemoryGraph;

use async_trait::async_trait;
use corpus_core::types::Entity;
use uuid::Uuid;

use crate::error::Result;

/// Persistence contract for the entity graph: canonical entities plus
/// `Claim --MENTIONS--> Entity` edges.
///
/// The graph store is authoritative for entity identity and aliases (see
/// the design ledger's Open Question decision); `corpus-storage`'s
/// relational mirror is rebuilt from it, never the reverse.
#[async_trait]
pub trait KnowledgeGraph: Send + Sync {
    async fn get_entity(&self, id: Uuid) -> Result<Option<Entity>>;

    async fn find_by_canonical_name(&self, name: &str) -> Result<Option<Entity>>;

    async fn find_by_alias(&self, text: &str) -> Result<Option<Entity>>;

    /// All entities currently in the store, for embedding nearest-neighbor
    /// search. Small corpora only; production callers would index this.
    async fn all_entities(&self) -> Result<Vec<Entity>>;

    /// Upserts an entity by case-folded canonical name: creates it if no
    /// entity with that name exists, otherwise returns the existing one
    /// unchanged. Must be idempotent under concurrent callers.
    async fn upsert_entity(&self, entity: Entity) -> Result<Entity>;

    /// Adds `alias` to `entity_id`'s alias set if not already present.
    /// Tolerates being called twice with the same alias.
    async fn add_alias(&self, entity_id: Uuid, alias: &str) -> Result<()>;

    /// Idempotent: linking the same `(claim_id, entity_id)` pair twice is a
    /// no-op.
    async fn link_claim_to_entity(
        &self,
        claim_id: Uuid,
        entity_id: Uuid,
        document_id: Uuid,
    ) -> Result<()>;

    /// Entities reachable from `entity_id` via co-mention (two entities
    /// mentioned by the same claim, or transitively through shared claims)
    /// within `depth` hops.
    async fn find_related_entities(&self, entity_id: Uuid, depth: u32) -> Result<Vec<Entity>>;

    async fn delete_document_links(&self, document_id: Uuid) -> Result<()>;
}

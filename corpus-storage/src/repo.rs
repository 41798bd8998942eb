use async_trait::async_trait;
use corpus_core::types::{
    AtomicClaim, Conflict, ConflictResolution, Consolidation, Document, ProvenanceRecord, Section,
    Supersession,
};
use uuid::Uuid;

use crate::error::Result;

/// Durable store for [`Document`] values, keyed by id, with a content-hash
/// index used to short-circuit re-ingestion.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn insert(&self, document: Document) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Document>>;
    async fn find_by_content_hash(&self, hash: &str) -> Result<Option<Document>>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    async fn list(&self) -> Result<Vec<Document>>;
}

/// Durable store for [`Section`] values. Sections are immutable once
/// written; there is no update method by design.
#[async_trait]
pub trait SectionRepository: Send + Sync {
    async fn insert_many(&self, sections: Vec<Section>) -> Result<()>;
    async fn list_by_document(&self, document_id: Uuid) -> Result<Vec<Section>>;
    async fn get(&self, id: Uuid) -> Result<Option<Section>>;
    async fn delete_by_document(&self, document_id: Uuid) -> Result<()>;
}

/// Durable store for [`AtomicClaim`] values.
#[async_trait]
pub trait ClaimRepository: Send + Sync {
    async fn insert_many(&self, claims: Vec<AtomicClaim>) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<AtomicClaim>>;
    async fn list_by_document(&self, document_id: Uuid) -> Result<Vec<AtomicClaim>>;
    async fn list_by_documents(&self, document_ids: &[Uuid]) -> Result<Vec<AtomicClaim>>;
    /// Updates the `deprecated` flag and `confidence` of an existing claim,
    /// the only two fields a consolidation is permitted to revise.
    async fn update_deprecation(&self, id: Uuid, deprecated: bool, confidence: f32) -> Result<()>;
    async fn delete_by_document(&self, document_id: Uuid) -> Result<()>;
}

/// Durable store for detected [`Conflict`] values.
#[async_trait]
pub trait ConflictRepository: Send + Sync {
    async fn insert_many(&self, conflicts: Vec<Conflict>) -> Result<()>;
    async fn list_by_documents(&self, document_ids: &[Uuid]) -> Result<Vec<Conflict>>;
    /// Transitions a conflict from `Pending` to `Resolved`, recording the
    /// chosen outcome. A conflict resolves at most once.
    async fn update_resolution(&self, id: Uuid, resolution: ConflictResolution) -> Result<()>;
}

/// Durable store for [`Supersession`] edges.
#[async_trait]
pub trait SupersessionRepository: Send + Sync {
    async fn insert(&self, supersession: Supersession) -> Result<()>;
    async fn list_for_document(&self, document_id: Uuid) -> Result<Vec<Supersession>>;
}

/// Durable, append-only store for [`Consolidation`] records.
#[async_trait]
pub trait ConsolidationRepository: Send + Sync {
    async fn insert(&self, consolidation: Consolidation) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Consolidation>>;
}

/// Durable store for the idempotent `(document_id, tag)` relation.
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn add_tag(&self, document_id: Uuid, tag: &str) -> Result<()>;
    async fn remove_tag(&self, document_id: Uuid, tag: &str) -> Result<()>;
    async fn list_tags(&self, document_id: Uuid) -> Result<Vec<String>>;
}

/// Durable store for per-bullet [`ProvenanceRecord`] triples, keyed by the
/// consolidation (or dry-run) that produced them.
#[async_trait]
pub trait ProvenanceRepository: Send + Sync {
    async fn insert_many(&self, consolidation_id: Uuid, records: Vec<ProvenanceRecord>) -> Result<()>;
    async fn list_for_consolidation(&self, consolidation_id: Uuid) -> Result<Vec<ProvenanceRecord>>;
}

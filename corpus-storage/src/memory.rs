use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use corpus_core::types::{
    AtomicClaim, Conflict, ConflictResolution, ConflictResolutionStatus, Consolidation, Document,
    ProvenanceRecord, Section, Supersession,
};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::repo::{
    ClaimRepository, ConflictRepository, ConsolidationRepository, DocumentRepository,
    ProvenanceRepository, SectionRepository, SupersessionRepository, TagRepository,
};

/// Default, always-available backend implementing every C2 repository
/// trait over plain `HashMap`s guarded by `parking_lot::RwLock`, matching
/// the teacher's in-memory episodic-memory backend pattern.
#[derive(Default)]
pub struct InMemoryStore {
    documents: RwLock<HashMap<Uuid, Document>>,
    sections: RwLock<HashMap<Uuid, Section>>,
    claims: RwLock<HashMap<Uuid, AtomicClaim>>,
    conflicts: RwLock<HashMap<Uuid, Conflict>>,
    supersessions: RwLock<HashMap<Uuid, Supersession>>,
    consolidations: RwLock<HashMap<Uuid, Consolidation>>,
    tags: RwLock<HashMap<Uuid, HashSet<String>>>,
    provenance: RwLock<HashMap<Uuid, Vec<ProvenanceRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryStore {
    async fn insert(&self, document: Document) -> Result<()> {
        self.documents.write().insert(document.id, document);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Document>> {
        Ok(self.documents.read().get(&id).cloned())
    }

    async fn find_by_content_hash(&self, hash: &str) -> Result<Option<Document>> {
        Ok(self
            .documents
            .read()
            .values()
            .find(|d| d.content_hash == hash)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.documents.write().remove(&id);
        SectionRepository::delete_by_document(self, id).await?;
        ClaimRepository::delete_by_document(self, id).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Document>> {
        Ok(self.documents.read().values().cloned().collect())
    }
}

#[async_trait]
impl SectionRepository for InMemoryStore {
    async fn insert_many(&self, sections: Vec<Section>) -> Result<()> {
        let mut store = self.sections.write();
        for section in sections {
            store.insert(section.id, section);
        }
        Ok(())
    }

    async fn list_by_document(&self, document_id: Uuid) -> Result<Vec<Section>> {
        let mut sections: Vec<Section> = self
            .sections
            .read()
            .values()
            .filter(|s| s.document_id == document_id)
            .cloned()
            .collect();
        sections.sort_by_key(|s| s.order);
        Ok(sections)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Section>> {
        Ok(self.sections.read().get(&id).cloned())
    }

    async fn delete_by_document(&self, document_id: Uuid) -> Result<()> {
        self.sections.write().retain(|_, s| s.document_id != document_id);
        Ok(())
    }
}

#[async_trait]
impl ClaimRepository for InMemoryStore {
    async fn insert_many(&self, claims: Vec<AtomicClaim>) -> Result<()> {
        let mut store = self.claims.write();
        for claim in claims {
            store.insert(claim.id, claim);
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<AtomicClaim>> {
        Ok(self.claims.read().get(&id).cloned())
    }

    async fn list_by_document(&self, document_id: Uuid) -> Result<Vec<AtomicClaim>> {
        Ok(self
            .claims
            .read()
            .values()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn list_by_documents(&self, document_ids: &[Uuid]) -> Result<Vec<AtomicClaim>> {
        Ok(self
            .claims
            .read()
            .values()
            .filter(|c| document_ids.contains(&c.document_id))
            .cloned()
            .collect())
    }

    async fn update_deprecation(&self, id: Uuid, deprecated: bool, confidence: f32) -> Result<()> {
        let mut store = self.claims.write();
        let claim = store
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        claim.deprecated = deprecated;
        claim.confidence = confidence;
        Ok(())
    }

    async fn delete_by_document(&self, document_id: Uuid) -> Result<()> {
        self.claims.write().retain(|_, c| c.document_id != document_id);
        Ok(())
    }
}

#[async_trait]
impl ConflictRepository for InMemoryStore {
    async fn insert_many(&self, conflicts: Vec<Conflict>) -> Result<()> {
        let mut store = self.conflicts.write();
        for conflict in conflicts {
            store.insert(conflict.id, conflict);
        }
        Ok(())
    }

    async fn list_by_documents(&self, document_ids: &[Uuid]) -> Result<Vec<Conflict>> {
        Ok(self
            .conflicts
            .read()
            .values()
            .filter(|c| {
                document_ids.contains(&c.claim_a_document_id)
                    || document_ids.contains(&c.claim_b_document_id)
            })
            .cloned()
            .collect())
    }

    async fn update_resolution(&self, id: Uuid, resolution: ConflictResolution) -> Result<()> {
        let mut store = self.conflicts.write();
        let conflict = store
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        conflict.status = ConflictResolutionStatus::Resolved;
        conflict.resolution = Some(resolution);
        Ok(())
    }
}

#[async_trait]
impl SupersessionRepository for InMemoryStore {
    async fn insert(&self, supersession: Supersession) -> Result<()> {
        self.supersessions
            .write()
            .insert(supersession.id, supersession);
        Ok(())
    }

    async fn list_for_document(&self, document_id: Uuid) -> Result<Vec<Supersession>> {
        Ok(self
            .supersessions
            .read()
            .values()
            .filter(|s| s.old_document_id == document_id || s.new_document_id == document_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ConsolidationRepository for InMemoryStore {
    async fn insert(&self, consolidation: Consolidation) -> Result<()> {
        self.consolidations
            .write()
            .insert(consolidation.id, consolidation);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Consolidation>> {
        Ok(self.consolidations.read().get(&id).cloned())
    }
}

#[async_trait]
impl TagRepository for InMemoryStore {
    async fn add_tag(&self, document_id: Uuid, tag: &str) -> Result<()> {
        self.tags
            .write()
            .entry(document_id)
            .or_default()
            .insert(tag.to_string());
        Ok(())
    }

    async fn remove_tag(&self, document_id: Uuid, tag: &str) -> Result<()> {
        if let Some(tags) = self.tags.write().get_mut(&document_id) {
            tags.remove(tag);
        }
        Ok(())
    }

    async fn list_tags(&self, document_id: Uuid) -> Result<Vec<String>> {
        Ok(self
            .tags
            .read()
            .get(&document_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .collect())
    }
}

#[async_trait]
impl ProvenanceRepository for InMemoryStore {
    async fn insert_many(&self, consolidation_id: Uuid, records: Vec<ProvenanceRecord>) -> Result<()> {
        self.provenance
            .write()
            .entry(consolidation_id)
            .or_default()
            .extend(records);
        Ok(())
    }

    async fn list_for_consolidation(&self, consolidation_id: Uuid) -> Result<Vec<ProvenanceRecord>> {
        Ok(self
            .provenance
            .read()
            .get(&consolidation_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use corpus_core::types::{
        ConflictChannel, ConflictType, DocumentFormat, DocumentType,
    };

    use super::*;

    fn sample_conflict() -> Conflict {
        Conflict {
            id: Uuid::new_v4(),
            claim_a_id: Uuid::new_v4(),
            claim_a_document_id: Uuid::new_v4(),
            claim_a_text: "A".into(),
            claim_b_id: Uuid::new_v4(),
            claim_b_document_id: Uuid::new_v4(),
            claim_b_text: "B".into(),
            conflict_type: ConflictType::ValueConflict,
            strength: 0.9,
            channel: ConflictChannel::ValueExtraction,
            resolution_hints: vec![],
            created_at: Utc::now(),
            status: ConflictResolutionStatus::Pending,
            resolution: None,
        }
    }

    fn sample_document(hash: &str) -> Document {
        Document {
            id: Uuid::new_v4(),
            source_identifier: "test.md".into(),
            content_hash: hash.into(),
            format: DocumentFormat::Markdown,
            document_type: DocumentType::Spec,
            title: None,
            authority_level: 5,
            raw_content: "content".into(),
            frontmatter: Default::default(),
            created_at: Utc::now(),
            embedding: None,
        }
    }

    #[tokio::test]
    async fn find_by_content_hash_locates_duplicate() {
        let store = InMemoryStore::new();
        let doc = sample_document("abc123");
        let id = doc.id;
        DocumentRepository::insert(&store, doc).await.unwrap();

        let found = store.find_by_content_hash("abc123").await.unwrap().unwrap();
        assert_eq!(found.id, id);
    }

    #[tokio::test]
    async fn deleting_document_cascades_sections_and_claims() {
        let store = InMemoryStore::new();
        let doc = sample_document("h1");
        let doc_id = doc.id;
        DocumentRepository::insert(&store, doc).await.unwrap();

        let section = Section {
            id: Uuid::new_v4(),
            document_id: doc_id,
            header: "H".into(),
            body: "B".into(),
            heading_level: 1,
            order: 0,
            source_line_start: 0,
            source_line_end: 1,
            embedding: None,
        };
        SectionRepository::insert_many(&store, vec![section]).await.unwrap();

        DocumentRepository::delete(&store, doc_id).await.unwrap();
        assert!(SectionRepository::list_by_document(&store, doc_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn update_resolution_transitions_pending_to_resolved() {
        let store = InMemoryStore::new();
        let conflict = sample_conflict();
        let id = conflict.id;
        ConflictRepository::insert_many(&store, vec![conflict]).await.unwrap();

        store
            .update_resolution(id, ConflictResolution::Merged {
                merged_text: "combined".into(),
            })
            .await
            .unwrap();

        let resolved = store
            .conflicts
            .read()
            .get(&id)
            .cloned()
            .expect("conflict still present");
        assert_eq!(resolved.status, ConflictResolutionStatus::Resolved);
        assert!(matches!(resolved.resolution, Some(ConflictResolution::Merged { .. })));
    }

    #[tokio::test]
    async fn adding_then_removing_tag_is_a_noop() {
        let store = InMemoryStore::new();
        let doc_id = Uuid::new_v4();
        store.add_tag(doc_id, "draft").await.unwrap();
        store.remove_tag(doc_id, "draft").await.unwrap();
        assert!(store.list_tags(doc_id).await.unwrap().is_empty());
    }
}

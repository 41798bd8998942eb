use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use corpus_core::types::Entity;
use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::Result;

use super::KnowledgeGraph;

/// Mention edge: which entities a claim links to, and under which document.
#[derive(Clone)]
struct MentionEdge {
    entity_id: Uuid,
    document_id: Uuid,
}

/// Default, always-available backend: an in-process entity store guarded by
/// a concurrent map, matching the teacher's `Arc<RwLock<HashMap<...>>>`
/// episodic-memory backend pattern generalized to a `DashMap` keyed by
/// entity id (cheap concurrent upserts are the hot path here, per the
/// concurrency model's shared-entity-graph note).
#[derive(Default)]
pub struct InMemoryGraph {
    entities: DashMap<Uuid, Entity>,
    /// claim_id -> mention edges, for `find_related_entities` and
    /// `delete_document_links`.
    edges: RwLock<HashMap<Uuid, Vec<MentionEdge>>>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_by_canonical_name_sync(&self, name: &str) -> Option<Entity> {
        self.entities
            .iter()
            .find(|e| e.matches_name(name))
            .map(|e| e.value().clone())
    }

    fn find_by_alias_sync(&self, text: &str) -> Option<Entity> {
        self.entities
            .iter()
            .find(|e| e.matches_alias(text))
            .map(|e| e.value().clone())
    }
}

#[async_trait]
impl KnowledgeGraph for InMemoryGraph {
    async fn get_entity(&self, id: Uuid) -> Result<Option<Entity>> {
        Ok(self.entities.get(&id).map(|e| e.value().clone()))
    }

    async fn find_by_canonical_name(&self, name: &str) -> Result<Option<Entity>> {
        Ok(self.find_by_canonical_name_sync(name))
    }

    async fn find_by_alias(&self, text: &str) -> Result<Option<Entity>> {
        Ok(self.find_by_alias_sync(text))
    }

    async fn all_entities(&self) -> Result<Vec<Entity>> {
        Ok(self.entities.iter().map(|e| e.value().clone()).collect())
    }

    async fn upsert_entity(&self, entity: Entity) -> Result<Entity> {
        if let Some(existing) = self.find_by_canonical_name_sync(&entity.canonical_name) {
            return Ok(existing);
        }
        let id = entity.id;
        self.entities.insert(id, entity.clone());
        Ok(entity)
    }

    async fn add_alias(&self, entity_id: Uuid, alias: &str) -> Result<()> {
        if let Some(mut entity) = self.entities.get_mut(&entity_id) {
            entity.add_alias_if_new(alias);
        }
        Ok(())
    }

    async fn link_claim_to_entity(
        &self,
        claim_id: Uuid,
        entity_id: Uuid,
        document_id: Uuid,
    ) -> Result<()> {
        let mut edges = self.edges.write();
        let claim_edges = edges.entry(claim_id).or_default();
        if !claim_edges.iter().any(|e| e.entity_id == entity_id) {
            claim_edges.push(MentionEdge {
                entity_id,
                document_id,
            });
        }
        Ok(())
    }

    async fn find_related_entities(&self, entity_id: Uuid, depth: u32) -> Result<Vec<Entity>> {
        let edges = self.edges.read();

        // Build an adjacency view: entity -> co-mentioned entities (two
        // entities linked to the same claim).
        let mut co_mentions: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
        for claim_edges in edges.values() {
            for a in claim_edges {
                for b in claim_edges {
                    if a.entity_id != b.entity_id {
                        co_mentions.entry(a.entity_id).or_default().insert(b.entity_id);
                    }
                }
            }
        }

        let mut visited: HashSet<Uuid> = HashSet::new();
        let mut frontier: HashSet<Uuid> = HashSet::from([entity_id]);
        visited.insert(entity_id);

        for _ in 0..depth {
            let mut next_frontier = HashSet::new();
            for node in &frontier {
                if let Some(neighbors) = co_mentions.get(node) {
                    for n in neighbors {
                        if visited.insert(*n) {
                            next_frontier.insert(*n);
                        }
                    }
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }
        visited.remove(&entity_id);

        let mut result = Vec::with_capacity(visited.len());
        for id in visited {
            if let Some(entity) = self.entities.get(&id) {
                result.push(entity.value().clone());
            }
        }
        Ok(result)
    }

    async fn delete_document_links(&self, document_id: Uuid) -> Result<()> {
        let mut edges = self.edges.write();
        for claim_edges in edges.values_mut() {
            claim_edges.retain(|e| e.document_id != document_id);
        }
        edges.retain(|_, v| !v.is_empty());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use corpus_core::types::EntityType;

    use super::*;

    #[tokio::test]
    async fn upsert_is_idempotent_on_canonical_name() {
        let graph = InMemoryGraph::new();
        let a = Entity::new("Payment Service", EntityType::Component);
        let b = Entity::new("payment service", EntityType::Component);

        let first = graph.upsert_entity(a.clone()).await.unwrap();
        let second = graph.upsert_entity(b).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(graph.all_entities().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn alias_add_tolerates_duplicates() {
        let graph = InMemoryGraph::new();
        let entity = graph
            .upsert_entity(Entity::new("Payment Service", EntityType::Component))
            .await
            .unwrap();

        graph.add_alias(entity.id, "PaySvc").await.unwrap();
        graph.add_alias(entity.id, "PaySvc").await.unwrap();

        let refreshed = graph.get_entity(entity.id).await.unwrap().unwrap();
        assert_eq!(refreshed.aliases.len(), 1);
    }

    #[tokio::test]
    async fn related_entities_respect_depth() {
        let graph = InMemoryGraph::new();
        let a = graph
            .upsert_entity(Entity::new("A", EntityType::Unknown))
            .await
            .unwrap();
        let b = graph
            .upsert_entity(Entity::new("B", EntityType::Unknown))
            .await
            .unwrap();
        let c = graph
            .upsert_entity(Entity::new("C", EntityType::Unknown))
            .await
            .unwrap();

        let claim1 = Uuid::new_v4();
        let claim2 = Uuid::new_v4();
        let doc = Uuid::new_v4();
        graph.link_claim_to_entity(claim1, a.id, doc).await.unwrap();
        graph.link_claim_to_entity(claim1, b.id, doc).await.unwrap();
        graph.link_claim_to_entity(claim2, b.id, doc).await.unwrap();
        graph.link_claim_to_entity(claim2, c.id, doc).await.unwrap();

        let depth1 = graph.find_related_entities(a.id, 1).await.unwrap();
        assert_eq!(depth1.len(), 1);
        assert_eq!(depth1[0].id, b.id);

        let depth2 = graph.find_related_entities(a.id, 2).await.unwrap();
        assert_eq!(depth2.len(), 2);
    }
}

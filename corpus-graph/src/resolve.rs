use std::collections::HashMap;
use std::sync::LazyLock;

use corpus_core::traits::{cosine_similarity, EmbeddingService};
use corpus_core::types::{Entity, EntityType};
use regex::Regex;
use uuid::Uuid;

use crate::error::Result;
use crate::storage::KnowledgeGraph;

/// Cosine-similarity threshold above which an unmatched mention is resolved
/// to an existing entity by embedding nearest-neighbor rather than creating
/// a new one.
pub const EMBEDDING_MATCH_THRESHOLD: f32 = 0.85;

/// A named mention awaiting resolution to a canonical entity.
#[derive(Debug, Clone)]
pub struct Mention {
    pub text: String,
    pub entity_type: Option<EntityType>,
}

impl Mention {
    pub fn new(text: impl Into<String>) -> Self {
        Mention {
            text: text.into(),
            entity_type: None,
        }
    }
}

static GETTER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(get|set|is|has)[A-Z_]").unwrap());
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

const CONFIG_MARKERS: [&str; 3] = ["config", "settings", "env"];

/// Ordered type heuristic applied when a mention carries no explicit type:
/// getter/setter-style identifiers resolve to `Function`, config-looking
/// names to `Config`, anything with a trailing file extension to `File`,
/// email-shaped text to `Person`, and everything else to `Unknown`.
pub fn classify_mention_type(text: &str) -> EntityType {
    if GETTER_PATTERN.is_match(text) {
        return EntityType::Function;
    }
    let lower = text.to_lowercase();
    if CONFIG_MARKERS.iter().any(|m| lower.contains(m)) {
        return EntityType::Config;
    }
    if has_file_extension(text) {
        return EntityType::File;
    }
    if EMAIL_PATTERN.is_match(text) {
        return EntityType::Person;
    }
    EntityType::Unknown
}

fn has_file_extension(text: &str) -> bool {
    match text.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

/// Resolves a batch of mentions to canonical entities, applying the
/// exact-match -> alias-match -> embedding-nearest-neighbor -> create
/// cascade from the entity resolver contract.
///
/// `embeddings` is optional: when absent, step 3 is skipped silently per
/// the documented "backend unavailable" behavior rather than failing.
pub async fn resolve_mentions(
    graph: &dyn KnowledgeGraph,
    embeddings: Option<&dyn EmbeddingService>,
    mentions: &[Mention],
) -> Result<HashMap<String, Entity>> {
    let mut resolved = HashMap::with_capacity(mentions.len());

    for mention in mentions {
        let entity = resolve_one(graph, embeddings, mention).await?;
        resolved.insert(mention.text.clone(), entity);
    }

    Ok(resolved)
}

async fn resolve_one(
    graph: &dyn KnowledgeGraph,
    embeddings: Option<&dyn EmbeddingService>,
    mention: &Mention,
) -> Result<Entity> {
    if let Some(entity) = graph.find_by_canonical_name(&mention.text).await? {
        maybe_add_alias(graph, &entity, &mention.text).await?;
        return Ok(entity);
    }

    if let Some(entity) = graph.find_by_alias(&mention.text).await? {
        maybe_add_alias(graph, &entity, &mention.text).await?;
        return Ok(entity);
    }

    if let Some(service) = embeddings {
        if let Some(entity) = embedding_nearest_neighbor(graph, service, &mention.text).await? {
            maybe_add_alias(graph, &entity, &mention.text).await?;
            return Ok(entity);
        }
    }

    let entity_type = mention
        .entity_type
        .clone()
        .unwrap_or_else(|| classify_mention_type(&mention.text));
    let new_entity = Entity::new(mention.text.clone(), entity_type);
    graph.upsert_entity(new_entity).await.map_err(Into::into)
}

async fn maybe_add_alias(
    graph: &dyn KnowledgeGraph,
    entity: &Entity,
    mention_text: &str,
) -> Result<()> {
    if !entity.matches_name(mention_text) && !entity.matches_alias(mention_text) {
        graph.add_alias(entity.id, mention_text).await?;
    }
    Ok(())
}

async fn embedding_nearest_neighbor(
    graph: &dyn KnowledgeGraph,
    embeddings: &dyn EmbeddingService,
    text: &str,
) -> Result<Option<Entity>> {
    let candidates = graph.all_entities().await?;
    let candidates: Vec<Entity> = candidates
        .into_iter()
        .filter(|e| e.embedding.is_some())
        .collect();
    if candidates.is_empty() {
        return Ok(None);
    }

    let query_embedding = embeddings
        .embed(&[text.to_string()])
        .await?
        .into_iter()
        .next()
        .unwrap_or_default();

    let mut best: Option<(f32, Entity)> = None;
    for candidate in candidates {
        let similarity = cosine_similarity(&query_embedding, candidate.embedding.as_ref().unwrap());
        if best.as_ref().map(|(s, _)| similarity > *s).unwrap_or(true) {
            best = Some((similarity, candidate));
        }
    }

    match best {
        Some((similarity, entity)) if similarity >= EMBEDDING_MATCH_THRESHOLD => Ok(Some(entity)),
        _ => Ok(None),
    }
}

/// Stable id helper for tests and callers that need a fresh id without
/// going through `Entity::new`.
pub fn fresh_id() -> Uuid {
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use corpus_core::error::Result as CoreResult;

    use super::*;
    use crate::storage::InMemoryGraph;

    struct NoopEmbeddings;

    #[async_trait::async_trait]
    impl EmbeddingService for NoopEmbeddings {
        async fn embed(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
        fn dimensions(&self) -> usize {
            2
        }
    }

    #[test]
    fn classifies_getter_as_function() {
        assert_eq!(classify_mention_type("getUserName"), EntityType::Function);
    }

    #[test]
    fn classifies_config_marker() {
        assert_eq!(
            classify_mention_type("database.config"),
            EntityType::Config
        );
    }

    #[test]
    fn classifies_file_extension() {
        assert_eq!(classify_mention_type("README.md"), EntityType::File);
    }

    #[test]
    fn classifies_email_as_person() {
        assert_eq!(
            classify_mention_type("alice@example.com"),
            EntityType::Person
        );
    }

    #[test]
    fn classifies_unknown_fallback() {
        assert_eq!(classify_mention_type("PaymentService"), EntityType::Unknown);
    }

    #[tokio::test]
    async fn resolve_creates_new_entity_when_unmatched() {
        let graph = InMemoryGraph::new();
        let mentions = vec![Mention::new("PaymentService")];
        let resolved = resolve_mentions(&graph, None, &mentions).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(
            resolved.get("PaymentService").unwrap().canonical_name,
            "PaymentService"
        );
    }

    #[tokio::test]
    async fn resolve_adds_alias_on_case_difference() {
        let graph = InMemoryGraph::new();
        let first = resolve_mentions(&graph, None, &[Mention::new("PaymentService")])
            .await
            .unwrap();
        let entity_id = first.get("PaymentService").unwrap().id;

        // "SERVICE" vs "Service" is a case-only variant of an existing
        // canonical name, so it should resolve to the same entity and be
        // recorded as an alias rather than creating a duplicate.
        let second = resolve_mentions(&graph, None, &[Mention::new("PAYMENTSERVICE")])
            .await
            .unwrap();
        let resolved_entity = second.get("PAYMENTSERVICE").unwrap();
        assert_eq!(resolved_entity.id, entity_id);

        let stored = graph.get_entity(entity_id).await.unwrap().unwrap();
        assert!(stored.aliases.contains("PAYMENTSERVICE"));
    }

    #[tokio::test]
    async fn resolve_skips_embedding_step_when_unavailable() {
        let graph = InMemoryGraph::new();
        let mentions = vec![Mention::new("Thing")];
        let resolved = resolve_mentions(&graph, None, &mentions).await.unwrap();
        assert_eq!(resolved.len(), 1);
    }
}

use std::collections::HashMap;

use chrono::Utc;
use corpus_core::traits::llm::{strip_code_fence, LLMService, LlmRequest};
use corpus_core::traits::{cosine_similarity, EmbeddingService};
use corpus_core::types::{AtomicClaim, Conflict, ConflictChannel, ConflictResolutionStatus, ConflictType};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

const VALUE_EXTRACTION_STRENGTH: f32 = 0.95;
const SEMANTIC_SIMILARITY_THRESHOLD: f32 = 0.80;

struct Candidate {
    claim_a: AtomicClaim,
    claim_b: AtomicClaim,
    channel: ConflictChannel,
    strength: f32,
}

/// Stage A: groups claims by `(lower(subject), lower(predicate))` and
/// emits a candidate for every unordered pair within a group whose
/// normalized `object` differs.
fn value_extraction_candidates(claims: &[AtomicClaim]) -> Vec<Candidate> {
    let mut groups: HashMap<(String, String), Vec<&AtomicClaim>> = HashMap::new();
    for claim in claims {
        groups.entry(claim.group_key()).or_default().push(claim);
    }

    let mut candidates = Vec::new();
    for group in groups.values() {
        if group.len() < 2 {
            continue;
        }
        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                let a = group[i];
                let b = group[j];
                if a.normalized_object() != b.normalized_object() {
                    candidates.push(Candidate {
                        claim_a: a.clone(),
                        claim_b: b.clone(),
                        channel: ConflictChannel::ValueExtraction,
                        strength: VALUE_EXTRACTION_STRENGTH,
                    });
                }
            }
        }
    }
    candidates
}

/// Stage B: for claims from different sections whose surface-text
/// embeddings are cosine-similar above threshold and whose normalized
/// objects differ, emits a semantic-channel candidate.
async fn semantic_candidates(
    claims: &[AtomicClaim],
    embeddings: Option<&dyn EmbeddingService>,
) -> Result<Vec<Candidate>> {
    let Some(service) = embeddings else {
        return Ok(Vec::new());
    };
    if claims.len() < 2 {
        return Ok(Vec::new());
    }

    let texts: Vec<String> = claims.iter().map(|c| c.original_text.clone()).collect();
    let vectors = service.embed(&texts).await?;

    let mut candidates = Vec::new();
    for i in 0..claims.len() {
        for j in (i + 1)..claims.len() {
            let a = &claims[i];
            let b = &claims[j];
            if a.section_id == b.section_id {
                continue;
            }
            let similarity = cosine_similarity(&vectors[i], &vectors[j]);
            if similarity >= SEMANTIC_SIMILARITY_THRESHOLD && a.normalized_object() != b.normalized_object() {
                candidates.push(Candidate {
                    claim_a: a.clone(),
                    claim_b: b.clone(),
                    channel: ConflictChannel::Semantic,
                    strength: similarity,
                });
            }
        }
    }
    Ok(candidates)
}

#[derive(Deserialize)]
struct VerificationResponse {
    is_conflict: bool,
    #[serde(default)]
    conflict_type: Option<String>,
    #[serde(default)]
    resolution_hints: Vec<String>,
}

fn parse_conflict_type(raw: &str) -> ConflictType {
    match raw {
        "temporal_conflict" => ConflictType::TemporalConflict,
        "scope_conflict" => ConflictType::ScopeConflict,
        "not_a_conflict" => ConflictType::NotAConflict,
        _ => ConflictType::ValueConflict,
    }
}

fn verification_prompt(candidate: &Candidate) -> String {
    format!(
        "Claim A: \"{}\" (from one document)\nClaim B: \"{}\" (from another document)\n\n\
         Do these two claims genuinely disagree? Respond with JSON only, of the shape: \
         {{\"is_conflict\": bool, \"conflict_type\": \"value_conflict\"|\"temporal_conflict\"|\
         \"scope_conflict\"|\"not_a_conflict\", \"explanation\": str, \
         \"resolution_hints\": [str]}}.",
        candidate.claim_a.original_text, candidate.claim_b.original_text,
    )
}

/// Stage C: sends every candidate to the LLM for verification. A
/// `is_conflict=false` response drops the candidate; a parse failure keeps
/// it unchanged (never silently defaults to `is_conflict=true`, since it is
/// already a candidate by construction).
async fn verify_candidate(llm: &dyn LLMService, candidate: Candidate) -> Option<Conflict> {
    let prompt = verification_prompt(&candidate);
    let response = llm.generate(LlmRequest::json(prompt)).await;

    let (conflict_type, resolution_hints) = match response {
        Ok(raw) => {
            let cleaned = strip_code_fence(&raw);
            match serde_json::from_str::<VerificationResponse>(cleaned) {
                Ok(parsed) if !parsed.is_conflict => {
                    debug!("llm verification dropped candidate as not a conflict");
                    return None;
                }
                Ok(parsed) => (
                    parsed
                        .conflict_type
                        .as_deref()
                        .map(parse_conflict_type)
                        .unwrap_or(ConflictType::ValueConflict),
                    parsed.resolution_hints,
                ),
                Err(e) => {
                    warn!(error = %e, "conflict verification response failed to parse, keeping candidate");
                    (ConflictType::ValueConflict, Vec::new())
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "conflict verification call failed, keeping candidate");
            (ConflictType::ValueConflict, Vec::new())
        }
    };

    Some(Conflict {
        id: Uuid::new_v4(),
        claim_a_id: candidate.claim_a.id,
        claim_a_document_id: candidate.claim_a.document_id,
        claim_a_text: candidate.claim_a.original_text,
        claim_b_id: candidate.claim_b.id,
        claim_b_document_id: candidate.claim_b.document_id,
        claim_b_text: candidate.claim_b.original_text,
        conflict_type,
        strength: candidate.strength,
        channel: candidate.channel,
        resolution_hints,
        created_at: Utc::now(),
        status: ConflictResolutionStatus::Pending,
        resolution: None,
    })
}

/// Stage D: deduplicates by the unordered claim-id pair; when both
/// channels produce the same pair, the `value_extraction` entry wins
/// (it carries the higher fixed strength).
fn dedup_conflicts(conflicts: Vec<Conflict>) -> Vec<Conflict> {
    let mut by_pair: HashMap<(Uuid, Uuid), Conflict> = HashMap::new();
    for conflict in conflicts {
        let key = conflict.pair_key();
        match by_pair.get(&key) {
            Some(existing) if existing.channel == ConflictChannel::ValueExtraction => {}
            _ => {
                by_pair.insert(key, conflict);
            }
        }
    }
    by_pair.into_values().collect()
}

/// Runs the full four-stage conflict detection pipeline over a claim set.
pub async fn detect_conflicts(
    claims: &[AtomicClaim],
    embeddings: Option<&dyn EmbeddingService>,
    llm: &dyn LLMService,
) -> Result<Vec<Conflict>> {
    let mut candidates = value_extraction_candidates(claims);
    candidates.extend(semantic_candidates(claims, embeddings).await?);

    let mut verified = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if let Some(conflict) = verify_candidate(llm, candidate).await {
            verified.push(conflict);
        }
    }

    Ok(dedup_conflicts(verified))
}

/// Returns conflicts where either claim belongs to `document_id`.
pub fn conflicts_for_document(document_id: Uuid, conflicts: &[Conflict]) -> Vec<Conflict> {
    conflicts
        .iter()
        .filter(|c| c.involves_document(document_id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use corpus_core::types::SourceSpan;
    use corpus_providers::embedding::MockEmbeddingService;
    use corpus_providers::llm::MockLLMService;

    use super::*;

    fn make_claim(section_id: Uuid, document_id: Uuid, subject: &str, predicate: &str, object: &str) -> AtomicClaim {
        AtomicClaim {
            id: Uuid::new_v4(),
            section_id,
            document_id,
            original_text: format!("The {subject} {predicate} {object}."),
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            qualifier: None,
            confidence: 0.9,
            source_span: SourceSpan { start: 0, end: 20 },
            deprecated: false,
        }
    }

    #[tokio::test]
    async fn value_conflict_detected_for_differing_objects() {
        let section_a = Uuid::new_v4();
        let section_b = Uuid::new_v4();
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();
        let claims = vec![
            make_claim(section_a, doc_a, "server", "uses", "port 3000"),
            make_claim(section_b, doc_b, "server", "uses", "port 8080"),
        ];

        let llm = MockLLMService::fixed(
            "{\"is_conflict\":true,\"conflict_type\":\"value_conflict\",\
             \"explanation\":\"ports differ\",\"resolution_hints\":[]}",
        );

        let conflicts = detect_conflicts(&claims, None, &llm).await.unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].channel, ConflictChannel::ValueExtraction);
    }

    #[tokio::test]
    async fn same_section_claims_produce_no_semantic_conflicts() {
        let section = Uuid::new_v4();
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();
        let claims = vec![
            make_claim(section, doc_a, "widget", "costs", "5 dollars"),
            make_claim(section, doc_b, "widget", "weighs", "2 kg"),
        ];
        let embeddings = MockEmbeddingService::default();
        let candidates = semantic_candidates(&claims, Some(&embeddings)).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn llm_dropping_candidate_removes_it() {
        let section_a = Uuid::new_v4();
        let section_b = Uuid::new_v4();
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();
        let claims = vec![
            make_claim(section_a, doc_a, "server", "uses", "port 3000"),
            make_claim(section_b, doc_b, "server", "uses", "port 8080"),
        ];
        let llm = MockLLMService::fixed("{\"is_conflict\":false,\"resolution_hints\":[]}");
        let conflicts = detect_conflicts(&claims, None, &llm).await.unwrap();
        assert!(conflicts.is_empty());
    }

    #[tokio::test]
    async fn parse_failure_keeps_candidate() {
        let section_a = Uuid::new_v4();
        let section_b = Uuid::new_v4();
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();
        let claims = vec![
            make_claim(section_a, doc_a, "server", "uses", "port 3000"),
            make_claim(section_b, doc_b, "server", "uses", "port 8080"),
        ];
        let llm = MockLLMService::fixed("not json");
        let conflicts = detect_conflicts(&claims, None, &llm).await.unwrap();
        assert_eq!(conflicts.len(), 1);
    }

    #[test]
    fn dedup_prefers_value_extraction_over_semantic() {
        let claim_a = make_claim(Uuid::new_v4(), Uuid::new_v4(), "x", "y", "z");
        let claim_b = make_claim(Uuid::new_v4(), Uuid::new_v4(), "x", "y", "w");
        let base = Conflict {
            id: Uuid::new_v4(),
            claim_a_id: claim_a.id,
            claim_a_document_id: claim_a.document_id,
            claim_a_text: claim_a.original_text.clone(),
            claim_b_id: claim_b.id,
            claim_b_document_id: claim_b.document_id,
            claim_b_text: claim_b.original_text.clone(),
            conflict_type: ConflictType::ValueConflict,
            strength: 0.8,
            channel: ConflictChannel::Semantic,
            resolution_hints: vec![],
            created_at: Utc::now(),
            status: ConflictResolutionStatus::Pending,
            resolution: None,
        };
        let mut value_variant = base.clone();
        value_variant.id = Uuid::new_v4();
        value_variant.channel = ConflictChannel::ValueExtraction;
        value_variant.strength = 0.95;

        let deduped = dedup_conflicts(vec![base, value_variant]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].channel, ConflictChannel::ValueExtraction);
    }
}

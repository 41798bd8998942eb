use std::collections::{HashMap, HashSet};

use corpus_core::error::{CoreError, LlmErrorKind};
use corpus_core::traits::llm::{strip_code_fence, LLMService, LlmRequest};
use corpus_core::types::{AtomicClaim, SourceSpan};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

const VAGUE_PREDICATES: [&str; 4] = ["is", "has", "does", "can"];
const DEFAULT_BATCH_CONCURRENCY: usize = 4;

#[derive(Deserialize)]
struct ExtractedClaimsResponse {
    claims: Vec<ExtractedClaim>,
}

#[derive(Deserialize)]
struct ExtractedClaim {
    original_text: String,
    subject: String,
    predicate: String,
    object: String,
    #[serde(default)]
    qualifier: Option<String>,
    confidence: f32,
    start_char: u32,
    end_char: u32,
}

fn extraction_prompt(section_content: &str) -> String {
    format!(
        "Extract atomic factual claims from the following text. Each claim is a \
         minimal (subject, predicate, object) tuple, optionally qualified, anchored \
         to the exact character span it was lifted from. Respond with JSON only, \
         of the shape: {{\"claims\": [{{\"original_text\": str, \"subject\": str, \
         \"predicate\": str, \"object\": str, \"qualifier\": str|null, \
         \"confidence\": number in [0,1], \"start_char\": int, \"end_char\": int}}]}}.\n\n\
         TEXT:\n{section_content}"
    )
}

/// Extracts atomic claims from a single section's body. Empty or
/// whitespace-only content short-circuits to an empty list without calling
/// the LLM.
pub async fn extract(
    llm: &dyn LLMService,
    section_content: &str,
    section_id: Uuid,
    document_id: Uuid,
) -> Result<Vec<AtomicClaim>> {
    if section_content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let request = LlmRequest::json(extraction_prompt(section_content));
    let raw = llm.generate(request).await?;
    let cleaned = strip_code_fence(&raw);

    let parsed: ExtractedClaimsResponse = serde_json::from_str(cleaned).map_err(|e| {
        warn!(error = %e, "claim extraction response failed to parse");
        CoreError::llm(LlmErrorKind::Schema, e.to_string())
    })?;

    let claims = parsed
        .claims
        .into_iter()
        .map(|c| AtomicClaim {
            id: Uuid::new_v4(),
            section_id,
            document_id,
            original_text: c.original_text,
            subject: c.subject,
            predicate: c.predicate,
            object: c.object,
            qualifier: c.qualifier,
            confidence: c.confidence.clamp(0.0, 1.0),
            source_span: SourceSpan {
                start: c.start_char,
                end: c.end_char,
            },
            deprecated: false,
        })
        .collect::<Vec<_>>();

    debug!(count = claims.len(), %section_id, "extracted claims");
    Ok(claims)
}

/// One section's content plus the ids it needs stamped onto its claims.
pub struct SectionToExtract {
    pub section_id: Uuid,
    pub document_id: Uuid,
    pub content: String,
}

/// Runs [`extract`] over many sections with bounded concurrency, keyed by
/// section id. A single section's extraction failure does not abort the
/// batch; its entry is simply omitted and the error logged, so a caller
/// doing `extractBatch` over an entire document isn't blocked by one bad
/// section (the single-section `extract` call remains strict).
pub async fn extract_batch(
    llm: &dyn LLMService,
    sections: Vec<SectionToExtract>,
    concurrency: Option<usize>,
) -> HashMap<Uuid, Vec<AtomicClaim>> {
    let concurrency = concurrency.unwrap_or(DEFAULT_BATCH_CONCURRENCY).max(1);

    stream::iter(sections)
        .map(|section| async move {
            let result = extract(llm, &section.content, section.section_id, section.document_id).await;
            (section.section_id, result)
        })
        .buffer_unordered(concurrency)
        .fold(HashMap::new(), |mut acc, (section_id, result)| async move {
            match result {
                Ok(claims) => {
                    acc.insert(section_id, claims);
                }
                Err(err) => {
                    warn!(%section_id, error = %err, "section extraction failed, omitting from batch");
                }
            }
            acc
        })
        .await
}

/// A diagnostic issue attached to a claim by [`validate_claims`].
#[derive(Debug, Clone)]
pub struct ClaimIssue {
    pub claim_id: Uuid,
    pub issues: Vec<String>,
}

/// Flags structural problems with claims without filtering anything out;
/// validation here is diagnostic, matching the extractor's documented
/// contract.
pub fn validate_claims(claims: &[AtomicClaim]) -> Vec<ClaimIssue> {
    claims
        .iter()
        .filter_map(|claim| {
            let mut issues = Vec::new();

            if claim.subject.trim().is_empty() {
                issues.push("empty subject".to_string());
            }
            if claim.predicate.trim().is_empty() {
                issues.push("empty predicate".to_string());
            }
            if claim.object.trim().is_empty() {
                issues.push("empty object".to_string());
            }
            if claim.confidence < 0.3 {
                issues.push("very low confidence".to_string());
            }
            let predicate_lower = claim.predicate.to_lowercase();
            if predicate_lower.contains(" and ") || predicate_lower.contains(',') {
                issues.push("possibly compound, may need splitting".to_string());
            }
            if VAGUE_PREDICATES.contains(&predicate_lower.trim()) {
                issues.push("vague predicate".to_string());
            }

            if issues.is_empty() {
                None
            } else {
                Some(ClaimIssue {
                    claim_id: claim.id,
                    issues,
                })
            }
        })
        .collect()
}

fn normalized_tokens(claim: &AtomicClaim) -> HashSet<String> {
    format!("{} {} {}", claim.subject, claim.predicate, claim.object)
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f32;
    let union = a.union(b).count() as f32;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

fn exact_key(claim: &AtomicClaim) -> String {
    format!(
        "{}|{}|{}",
        claim.subject.to_lowercase().trim(),
        claim.predicate.to_lowercase().trim(),
        claim.object.to_lowercase().trim()
    )
}

/// Deduplicates claims, keeping the first occurrence per cluster.
/// `threshold=1.0` performs exact case-insensitive dedup on
/// (subject, predicate, object); `threshold<1.0` clusters by normalized
/// token-overlap Jaccard similarity at or above the threshold.
pub fn deduplicate(claims: Vec<AtomicClaim>, threshold: f32) -> Vec<AtomicClaim> {
    if (threshold - 1.0).abs() < f32::EPSILON {
        let mut seen = HashSet::new();
        return claims
            .into_iter()
            .filter(|claim| seen.insert(exact_key(claim)))
            .collect();
    }

    let mut kept: Vec<AtomicClaim> = Vec::new();
    let mut kept_tokens: Vec<HashSet<String>> = Vec::new();

    for claim in claims {
        let tokens = normalized_tokens(&claim);
        let is_duplicate = kept_tokens
            .iter()
            .any(|existing| jaccard(existing, &tokens) >= threshold);
        if !is_duplicate {
            kept_tokens.push(tokens);
            kept.push(claim);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use corpus_providers::llm::MockLLMService;

    use super::*;

    fn make_claim(subject: &str, predicate: &str, object: &str) -> AtomicClaim {
        AtomicClaim {
            id: Uuid::new_v4(),
            section_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            original_text: format!("{subject} {predicate} {object}"),
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            qualifier: None,
            confidence: 0.9,
            source_span: SourceSpan { start: 0, end: 10 },
            deprecated: false,
        }
    }

    #[tokio::test]
    async fn empty_content_short_circuits_without_llm_call() {
        let llm = MockLLMService::fixed("should not be used");
        let claims = extract(&llm, "   ", Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();
        assert!(claims.is_empty());
    }

    #[tokio::test]
    async fn extract_parses_fenced_json() {
        let llm = MockLLMService::fixed(
            "```json\n{\"claims\":[{\"original_text\":\"Server uses port 3000.\",\
             \"subject\":\"server\",\"predicate\":\"uses\",\"object\":\"port 3000\",\
             \"qualifier\":null,\"confidence\":0.9,\"start_char\":0,\"end_char\":22}]}\n```",
        );
        let claims = extract(&llm, "Server uses port 3000.", Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].subject, "server");
    }

    #[tokio::test]
    async fn extract_surfaces_schema_error_on_invalid_json() {
        let llm = MockLLMService::fixed("not json at all");
        let result = extract(&llm, "content", Uuid::new_v4(), Uuid::new_v4()).await;
        assert!(result.is_err());
    }

    #[test]
    fn validate_flags_vague_predicate() {
        let claim = make_claim("server", "is", "fast");
        let issues = validate_claims(&[claim]);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].issues.iter().any(|i| i.contains("vague")));
    }

    #[test]
    fn validate_flags_compound_predicate() {
        let claim = make_claim("server", "uses and requires", "port 3000");
        let issues = validate_claims(&[claim]);
        assert!(issues[0].issues.iter().any(|i| i.contains("compound")));
    }

    #[test]
    fn dedup_exact_removes_case_insensitive_duplicates() {
        let claims = vec![
            make_claim("Server", "Uses", "Port 3000"),
            make_claim("server", "uses", "port 3000"),
        ];
        let deduped = deduplicate(claims, 1.0);
        assert_eq!(deduped.len(), 1);
    }

    #[test]
    fn dedup_is_idempotent() {
        let claims = vec![
            make_claim("Server", "Uses", "Port 3000"),
            make_claim("server", "uses", "port 3000"),
            make_claim("client", "connects to", "server"),
        ];
        let once = deduplicate(claims, 1.0);
        let twice = deduplicate(once.clone(), 1.0);
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn dedup_fuzzy_clusters_similar_claims() {
        let claims = vec![
            make_claim("server", "listens on", "port 3000 now"),
            make_claim("server", "listens on", "port 3000"),
        ];
        let deduped = deduplicate(claims, 0.5);
        assert_eq!(deduped.len(), 1);
    }
}

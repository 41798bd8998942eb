use std::collections::{HashMap, HashSet};

use corpus_core::traits::llm::{strip_code_fence, LLMService, LlmRequest};
use corpus_core::types::{
    AtomicClaim, Conflict, ConflictResolutionStatus, Document, ProvenanceRecord, Section,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

/// Conflict resolution policy selected for a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    Smart,
    NewestWins,
    AuthorityWins,
    FlagAll,
}

/// The four merge inputs bundled as a single strategy value.
#[derive(Debug, Clone)]
pub struct MergeStrategy {
    pub mode: MergeMode,
    pub authority_order: Vec<String>,
    /// LLM confidence required to auto-resolve in `smart` mode. Per the
    /// unified-default decision in the design ledger, callers always
    /// populate this from the resolved tool argument rather than relying on
    /// a library default.
    pub conflict_threshold: f32,
}

/// Requested rendering of the merged artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Markdown,
    Json,
    Yaml,
}

#[derive(Debug, Clone)]
pub struct ResolvedConflictRecord {
    pub conflict_id: Uuid,
    pub resolution: String,
    pub reasoning: Option<String>,
    /// Set only when `resolution == "merged"`: the synthesized text a
    /// caller needs to record a `ConflictResolution::Merged` outcome.
    pub merged_text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FlaggedConflictRecord {
    pub conflict_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Bullet {
    pub text: String,
    pub provenance: Vec<ProvenanceRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputSection {
    pub header: String,
    pub bullets: Vec<Bullet>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeStatistics {
    pub documents_merged: usize,
    pub sections_merged: usize,
    pub redundancy_eliminated_percent: f64,
    pub conflicts_auto_resolved: usize,
    pub conflicts_flagged: usize,
}

#[derive(Debug, Clone)]
pub struct MergedDocument {
    pub id: Uuid,
    pub title: String,
    pub format: OutputFormat,
    pub content: String,
    pub sections: Vec<OutputSection>,
    pub conflicts_resolved: Vec<ResolvedConflictRecord>,
    pub conflicts_flagged: Vec<FlaggedConflictRecord>,
    pub statistics: MergeStatistics,
}

/// Simple `*`-wildcard glob matcher over source paths, sufficient for the
/// `authorityOrder` patterns the merge engine consumes (e.g. `*official*`).
fn glob_match(pattern: &str, text: &str) -> bool {
    let segments: Vec<&str> = pattern.split('*').collect();
    if segments.len() == 1 {
        return text == pattern;
    }

    let mut cursor = 0usize;
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if i == 0 {
            if !text[cursor..].starts_with(segment) {
                return false;
            }
            cursor += segment.len();
        } else if i == segments.len() - 1 {
            return text[cursor..].ends_with(segment);
        } else {
            match text[cursor..].find(segment) {
                Some(pos) => cursor += pos + segment.len(),
                None => return false,
            }
        }
    }
    true
}

/// Title-cases a topic key: underscores/hyphens become spaces, each word's
/// first letter is capitalized, and words that were already all-caps in the
/// source (likely acronyms) are preserved as-is.
pub fn title_case(subject: &str) -> String {
    subject
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|word| {
            if word.chars().all(|c| c.is_uppercase() || !c.is_alphabetic()) && word.len() > 1 {
                word.to_string()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Deserialize)]
struct SmartResolution {
    choice: String,
    confidence: f32,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    merged_text: Option<String>,
}

enum Outcome {
    ChoseA,
    ChoseB,
    Merged(String),
    Flagged(String),
}

fn smart_prompt(claim_a: &AtomicClaim, claim_b: &AtomicClaim) -> String {
    format!(
        "Two conflicting claims were extracted from different documents.\n\
         Claim A: \"{}\"\nClaim B: \"{}\"\n\n\
         Decide how to resolve this conflict. Respond with JSON only, of the shape: \
         {{\"choice\": \"chose_a\"|\"chose_b\"|\"merged\", \"confidence\": number in [0,1], \
         \"reasoning\": str, \"merged_text\": str|null}}. `merged_text` is required when \
         `choice` is `merged`.",
        claim_a.original_text, claim_b.original_text
    )
}

async fn resolve_conflict(
    conflict: &Conflict,
    claim_a: &AtomicClaim,
    claim_b: &AtomicClaim,
    documents_by_id: &HashMap<Uuid, &Document>,
    strategy: &MergeStrategy,
    llm: &dyn LLMService,
) -> Outcome {
    match strategy.mode {
        MergeMode::FlagAll => Outcome::Flagged("flag_all strategy requested".to_string()),

        MergeMode::NewestWins => {
            let doc_a = documents_by_id.get(&conflict.claim_a_document_id);
            let doc_b = documents_by_id.get(&conflict.claim_b_document_id);
            match (doc_a, doc_b) {
                (Some(a), Some(b)) if a.created_at > b.created_at => Outcome::ChoseA,
                (Some(a), Some(b)) if a.created_at < b.created_at => Outcome::ChoseB,
                _ => Outcome::Flagged("documents have equal creation timestamps".to_string()),
            }
        }

        MergeMode::AuthorityWins => {
            let rank = |doc: Option<&&Document>| -> Option<usize> {
                let doc = doc?;
                strategy
                    .authority_order
                    .iter()
                    .position(|pattern| glob_match(pattern, &doc.source_identifier))
            };
            let rank_a = rank(documents_by_id.get(&conflict.claim_a_document_id));
            let rank_b = rank(documents_by_id.get(&conflict.claim_b_document_id));
            match (rank_a, rank_b) {
                (Some(ra), Some(rb)) if ra < rb => Outcome::ChoseA,
                (Some(ra), Some(rb)) if rb < ra => Outcome::ChoseB,
                (Some(_), None) => Outcome::ChoseA,
                (None, Some(_)) => Outcome::ChoseB,
                _ => Outcome::Flagged("no authority pattern matched either document".to_string()),
            }
        }

        MergeMode::Smart => {
            let prompt = smart_prompt(claim_a, claim_b);
            let response = llm.generate(LlmRequest::json(prompt)).await;
            match response {
                Ok(raw) => {
                    let cleaned = strip_code_fence(&raw);
                    match serde_json::from_str::<SmartResolution>(cleaned) {
                        Ok(parsed) if parsed.confidence >= strategy.conflict_threshold => {
                            match parsed.choice.as_str() {
                                "chose_a" => Outcome::ChoseA,
                                "chose_b" => Outcome::ChoseB,
                                "merged" => match parsed.merged_text {
                                    Some(text) => Outcome::Merged(text),
                                    None => Outcome::Flagged(
                                        "merged choice missing merged_text".to_string(),
                                    ),
                                },
                                other => Outcome::Flagged(format!("unrecognized choice: {other}")),
                            }
                        }
                        Ok(parsed) => Outcome::Flagged(format!(
                            "Confidence {} below threshold {}",
                            parsed.confidence, strategy.conflict_threshold
                        )),
                        Err(e) => {
                            warn!(error = %e, "smart resolution response failed to parse, flagging");
                            Outcome::Flagged("unable to parse LLM resolution".to_string())
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "smart resolution call failed, flagging");
                    Outcome::Flagged("LLM resolution call failed".to_string())
                }
            }
        }
    }
}

struct TopicGroup<'a> {
    subject: String,
    claims: Vec<&'a AtomicClaim>,
    first_position: usize,
}

fn tie_break_authority<'a>(
    claims: &[&'a AtomicClaim],
    documents_by_id: &HashMap<Uuid, &Document>,
) -> &'a AtomicClaim {
    claims
        .iter()
        .copied()
        .max_by(|a, b| {
            let conf = a.confidence.partial_cmp(&b.confidence).unwrap();
            if conf != std::cmp::Ordering::Equal {
                return conf;
            }
            let auth_a = documents_by_id.get(&a.document_id).map(|d| d.authority_level).unwrap_or(0);
            let auth_b = documents_by_id.get(&b.document_id).map(|d| d.authority_level).unwrap_or(0);
            if auth_a != auth_b {
                return auth_a.cmp(&auth_b);
            }
            let created_a = documents_by_id.get(&a.document_id).map(|d| d.created_at);
            let created_b = documents_by_id.get(&b.document_id).map(|d| d.created_at);
            created_a.cmp(&created_b)
        })
        .expect("non-empty group")
}

fn render_bullet_text(claim: &AtomicClaim) -> String {
    match &claim.qualifier {
        Some(q) if !q.is_empty() => format!("{} {} ({})", claim.predicate, claim.object, q),
        _ => format!("{} {}", claim.predicate, claim.object),
    }
}

fn render_markdown(title: &str, sections: &[OutputSection], include_provenance: bool) -> String {
    let mut out = format!("# {title}\n\n");
    for section in sections {
        out.push_str(&format!("## {}\n\n", section.header));
        for bullet in &section.bullets {
            out.push_str(&format!("- {}\n", bullet.text));
            if include_provenance {
                for record in &bullet.provenance {
                    out.push_str(&format!(
                        "  <!-- provenance: document={} section={} claim={} -->\n",
                        record.document_id, record.section_id, record.claim_id
                    ));
                }
            }
        }
        out.push('\n');
    }
    out
}

fn render_json(title: &str, sections: &[OutputSection], include_provenance: bool) -> String {
    let value = serde_json::json!({
        "title": title,
        "sections": sections.iter().map(|s| {
            serde_json::json!({
                "header": s.header,
                "bullets": s.bullets.iter().map(|b| {
                    if include_provenance {
                        serde_json::json!({"text": b.text, "provenance": b.provenance})
                    } else {
                        serde_json::json!({"text": b.text})
                    }
                }).collect::<Vec<_>>(),
            })
        }).collect::<Vec<_>>(),
    });
    serde_json::to_string_pretty(&value).unwrap_or_default()
}

fn render_yaml(title: &str, sections: &[OutputSection], include_provenance: bool) -> String {
    let mut out = format!("title: {title}\nsections:\n");
    for section in sections {
        out.push_str(&format!("  - header: {}\n    bullets:\n", section.header));
        for bullet in &section.bullets {
            out.push_str(&format!("      - text: {}\n", bullet.text));
            if include_provenance {
                out.push_str("        provenance:\n");
                for record in &bullet.provenance {
                    out.push_str(&format!(
                        "          - document_id: {}\n            section_id: {}\n            claim_id: {}\n",
                        record.document_id, record.section_id, record.claim_id
                    ));
                }
            }
        }
    }
    out
}

/// Longest common contiguous token subsequence across document titles, or
/// "Consolidated Document" when there is none (including the no-titles
/// case).
fn synthesize_title(documents: &[Document]) -> String {
    let token_lists: Vec<Vec<&str>> = documents
        .iter()
        .filter_map(|d| d.title.as_deref())
        .map(|t| t.split_whitespace().collect())
        .collect();

    if token_lists.len() < 2 {
        return token_lists
            .first()
            .map(|tokens| tokens.join(" "))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Consolidated Document".to_string());
    }

    let mut best: Vec<&str> = Vec::new();
    let first = &token_lists[0];
    for start in 0..first.len() {
        for end in (start + 1)..=first.len() {
            let candidate = &first[start..end];
            if candidate.len() <= best.len() {
                continue;
            }
            let present_everywhere = token_lists[1..]
                .iter()
                .all(|tokens| contains_subsequence(tokens, candidate));
            if present_everywhere {
                best = candidate.to_vec();
            }
        }
    }

    if best.is_empty() {
        "Consolidated Document".to_string()
    } else {
        best.join(" ")
    }
}

fn contains_subsequence(haystack: &[&str], needle: &[&str]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Runs the merge engine: resolves conflicts under `strategy`, synthesizes
/// output sections deterministically, and renders the result in
/// `output_format`.
///
/// Claims are sorted by `(documentOrder, sectionOrder, sourceSpan.start,
/// id)` before grouping so that output is byte-for-byte deterministic given
/// identical inputs and strategy, independent of arrival order.
pub async fn merge(
    documents: &[Document],
    sections: &[Section],
    claims: &[AtomicClaim],
    conflicts: &[Conflict],
    strategy: &MergeStrategy,
    llm: &dyn LLMService,
    output_format: OutputFormat,
    include_provenance: bool,
) -> Result<MergedDocument> {
    let document_order: HashMap<Uuid, usize> =
        documents.iter().enumerate().map(|(i, d)| (d.id, i)).collect();
    let section_order: HashMap<Uuid, u32> = sections.iter().map(|s| (s.id, s.order)).collect();
    let documents_by_id: HashMap<Uuid, &Document> = documents.iter().map(|d| (d.id, d)).collect();
    let claims_by_id: HashMap<Uuid, &AtomicClaim> = claims.iter().map(|c| (c.id, c)).collect();

    let mut sorted_claims: Vec<&AtomicClaim> = claims.iter().collect();
    sorted_claims.sort_by_key(|c| {
        (
            document_order.get(&c.document_id).copied().unwrap_or(usize::MAX),
            section_order.get(&c.section_id).copied().unwrap_or(u32::MAX),
            c.source_span.start,
            c.id,
        )
    });
    let position_of: HashMap<Uuid, usize> = sorted_claims
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id, i))
        .collect();

    let mut resolved_records = Vec::new();
    let mut flagged_records = Vec::new();
    let mut excluded: HashSet<Uuid> = HashSet::new();
    let mut merged_bullets: Vec<(usize, String, Vec<Uuid>)> = Vec::new();

    for conflict in conflicts {
        if conflict.status == ConflictResolutionStatus::Resolved {
            continue;
        }
        let (Some(claim_a), Some(claim_b)) = (
            claims_by_id.get(&conflict.claim_a_id),
            claims_by_id.get(&conflict.claim_b_id),
        ) else {
            continue;
        };

        let outcome =
            resolve_conflict(conflict, claim_a, claim_b, &documents_by_id, strategy, llm).await;

        match outcome {
            Outcome::ChoseA => {
                excluded.insert(conflict.claim_b_id);
                resolved_records.push(ResolvedConflictRecord {
                    conflict_id: conflict.id,
                    resolution: "chose_a".to_string(),
                    reasoning: None,
                    merged_text: None,
                });
            }
            Outcome::ChoseB => {
                excluded.insert(conflict.claim_a_id);
                resolved_records.push(ResolvedConflictRecord {
                    conflict_id: conflict.id,
                    resolution: "chose_b".to_string(),
                    reasoning: None,
                    merged_text: None,
                });
            }
            Outcome::Merged(text) => {
                excluded.insert(conflict.claim_a_id);
                excluded.insert(conflict.claim_b_id);
                let position = position_of
                    .get(&conflict.claim_a_id)
                    .copied()
                    .unwrap_or(usize::MAX);
                merged_bullets.push((position, text.clone(), vec![conflict.claim_a_id, conflict.claim_b_id]));
                resolved_records.push(ResolvedConflictRecord {
                    conflict_id: conflict.id,
                    resolution: "merged".to_string(),
                    reasoning: None,
                    merged_text: Some(text),
                });
            }
            Outcome::Flagged(reason) => {
                flagged_records.push(FlaggedConflictRecord {
                    conflict_id: conflict.id,
                    reason,
                });
            }
        }
    }

    let surviving: Vec<&AtomicClaim> = sorted_claims
        .iter()
        .copied()
        .filter(|c| !c.deprecated && !excluded.contains(&c.id))
        .collect();

    let mut topic_order: Vec<String> = Vec::new();
    let mut topics: HashMap<String, TopicGroup> = HashMap::new();
    for (position, claim) in surviving.iter().enumerate() {
        let topic_key = claim.topic_key();
        let entry = topics.entry(topic_key.clone()).or_insert_with(|| {
            topic_order.push(topic_key.clone());
            TopicGroup {
                subject: claim.subject.clone(),
                claims: Vec::new(),
                first_position: position,
            }
        });
        entry.claims.push(claim);
    }

    let mut output_sections = Vec::new();
    for topic_key in &topic_order {
        let group = &topics[topic_key];

        let mut predicate_groups: HashMap<String, Vec<&AtomicClaim>> = HashMap::new();
        let mut predicate_order: Vec<String> = Vec::new();
        for claim in &group.claims {
            let key = claim.predicate.to_lowercase();
            if !predicate_groups.contains_key(&key) {
                predicate_order.push(key.clone());
            }
            predicate_groups.entry(key).or_default().push(claim);
        }

        let mut bullet_events: Vec<(usize, Bullet)> = Vec::new();
        for predicate_key in &predicate_order {
            let candidates = &predicate_groups[predicate_key];
            let chosen = tie_break_authority(candidates, &documents_by_id);
            let position = position_of.get(&chosen.id).copied().unwrap_or(usize::MAX);
            bullet_events.push((
                position,
                Bullet {
                    text: render_bullet_text(chosen),
                    provenance: vec![ProvenanceRecord {
                        document_id: chosen.document_id,
                        section_id: chosen.section_id,
                        claim_id: chosen.id,
                    }],
                },
            ));
        }

        for (position, text, claim_ids) in &merged_bullets {
            let belongs_to_topic = claim_ids
                .iter()
                .filter_map(|id| claims_by_id.get(id))
                .any(|c| c.topic_key() == *topic_key);
            if !belongs_to_topic {
                continue;
            }
            let provenance = claim_ids
                .iter()
                .filter_map(|id| claims_by_id.get(id))
                .map(|c| ProvenanceRecord {
                    document_id: c.document_id,
                    section_id: c.section_id,
                    claim_id: c.id,
                })
                .collect();
            bullet_events.push((
                *position,
                Bullet {
                    text: text.clone(),
                    provenance,
                },
            ));
        }

        bullet_events.sort_by_key(|(pos, _)| *pos);
        if bullet_events.is_empty() {
            continue;
        }

        output_sections.push(OutputSection {
            header: title_case(&group.subject),
            bullets: bullet_events.into_iter().map(|(_, b)| b).collect(),
        });
    }

    let title = synthesize_title(documents);
    let content = match output_format {
        OutputFormat::Markdown => render_markdown(&title, &output_sections, include_provenance),
        OutputFormat::Json => render_json(&title, &output_sections, include_provenance),
        OutputFormat::Yaml => render_yaml(&title, &output_sections, include_provenance),
    };

    let total_input_sections = sections.len().max(1);
    let redundancy_eliminated_percent = ((1.0
        - output_sections.len() as f64 / total_input_sections as f64)
        .max(0.0))
        * 100.0;

    debug!(
        resolved = resolved_records.len(),
        flagged = flagged_records.len(),
        sections = output_sections.len(),
        "merge complete"
    );

    Ok(MergedDocument {
        id: Uuid::new_v4(),
        title,
        format: output_format,
        content,
        statistics: MergeStatistics {
            documents_merged: documents.len(),
            sections_merged: output_sections.len(),
            redundancy_eliminated_percent,
            conflicts_auto_resolved: resolved_records.len(),
            conflicts_flagged: flagged_records.len(),
        },
        sections: output_sections,
        conflicts_resolved: resolved_records,
        conflicts_flagged: flagged_records,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use corpus_core::types::{ConflictChannel, ConflictType, DocumentFormat, DocumentType, SourceSpan};
    use corpus_providers::llm::MockLLMService;

    use super::*;

    fn make_document(source_identifier: &str, authority: u8, created_at_offset_secs: i64) -> Document {
        Document {
            id: Uuid::new_v4(),
            source_identifier: source_identifier.into(),
            content_hash: Uuid::new_v4().to_string(),
            format: DocumentFormat::Markdown,
            document_type: DocumentType::Spec,
            title: Some("API Guide".into()),
            authority_level: authority,
            raw_content: String::new(),
            frontmatter: Default::default(),
            created_at: Utc::now() + Duration::seconds(created_at_offset_secs),
            embedding: None,
        }
    }

    fn make_section(document_id: Uuid, order: u32) -> Section {
        Section {
            id: Uuid::new_v4(),
            document_id,
            header: "Server".into(),
            body: String::new(),
            heading_level: 2,
            order,
            source_line_start: 0,
            source_line_end: 1,
            embedding: None,
        }
    }

    fn make_claim(document_id: Uuid, section_id: Uuid, object: &str, confidence: f32) -> AtomicClaim {
        AtomicClaim {
            id: Uuid::new_v4(),
            section_id,
            document_id,
            original_text: format!("The server uses {object}."),
            subject: "server".into(),
            predicate: "uses".into(),
            object: object.into(),
            qualifier: None,
            confidence,
            source_span: SourceSpan { start: 0, end: 20 },
            deprecated: false,
        }
    }

    fn make_conflict(claim_a: &AtomicClaim, claim_b: &AtomicClaim) -> Conflict {
        Conflict {
            id: Uuid::new_v4(),
            claim_a_id: claim_a.id,
            claim_a_document_id: claim_a.document_id,
            claim_a_text: claim_a.original_text.clone(),
            claim_b_id: claim_b.id,
            claim_b_document_id: claim_b.document_id,
            claim_b_text: claim_b.original_text.clone(),
            conflict_type: ConflictType::ValueConflict,
            strength: 0.95,
            channel: ConflictChannel::ValueExtraction,
            resolution_hints: vec![],
            created_at: Utc::now(),
            status: ConflictResolutionStatus::Pending,
            resolution: None,
        }
    }

    #[tokio::test]
    async fn scenario_s1_smart_resolve_chooses_a() {
        let doc_a = make_document("/docs/a.md", 5, -10);
        let doc_b = make_document("/docs/b.md", 5, 0);
        let section_a = make_section(doc_a.id, 0);
        let section_b = make_section(doc_b.id, 0);
        let claim_a = make_claim(doc_a.id, section_a.id, "port 3000", 0.9);
        let claim_b = make_claim(doc_b.id, section_b.id, "port 8080", 0.9);
        let conflict = make_conflict(&claim_a, &claim_b);

        let llm = MockLLMService::fixed(
            "{\"choice\":\"chose_a\",\"confidence\":0.85,\"reasoning\":\"a is canonical\"}",
        );
        let strategy = MergeStrategy {
            mode: MergeMode::Smart,
            authority_order: vec![],
            conflict_threshold: 0.8,
        };

        let result = merge(
            &[doc_a, doc_b],
            &[section_a, section_b],
            &[claim_a.clone(), claim_b],
            &[conflict],
            &strategy,
            &llm,
            OutputFormat::Markdown,
            true,
        )
        .await
        .unwrap();

        assert_eq!(result.conflicts_resolved.len(), 1);
        assert_eq!(result.conflicts_resolved[0].resolution, "chose_a");
        assert_eq!(result.sections.len(), 1);
        assert_eq!(result.sections[0].bullets.len(), 1);
        assert!(result.sections[0].bullets[0].text.contains("port 3000"));
        assert_eq!(result.statistics.conflicts_auto_resolved, 1);
    }

    #[tokio::test]
    async fn scenario_s3_authority_wins_with_path_patterns() {
        let doc_a = make_document("/docs/official/api.md", 5, 0);
        let doc_b = make_document("/docs/draft/api.md", 5, 0);
        let section_a = make_section(doc_a.id, 0);
        let section_b = make_section(doc_b.id, 0);
        let claim_a = make_claim(doc_a.id, section_a.id, "port 3000", 0.9);
        let claim_b = make_claim(doc_b.id, section_b.id, "port 8080", 0.9);
        let conflict = make_conflict(&claim_a, &claim_b);

        let llm = MockLLMService::fixed("unused");
        let strategy = MergeStrategy {
            mode: MergeMode::AuthorityWins,
            authority_order: vec!["*official*".to_string(), "*draft*".to_string()],
            conflict_threshold: 0.7,
        };

        let result = merge(
            &[doc_a, doc_b],
            &[section_a, section_b],
            &[claim_a, claim_b],
            &[conflict],
            &strategy,
            &llm,
            OutputFormat::Markdown,
            false,
        )
        .await
        .unwrap();

        assert_eq!(result.conflicts_resolved[0].resolution, "chose_a");
    }

    #[tokio::test]
    async fn scenario_s4_flag_all_surfaces_every_conflict() {
        let doc_a = make_document("/docs/a.md", 5, 0);
        let doc_b = make_document("/docs/b.md", 5, 0);
        let section_a = make_section(doc_a.id, 0);
        let section_b = make_section(doc_b.id, 0);
        let claim_a = make_claim(doc_a.id, section_a.id, "port 3000", 0.9);
        let claim_b = make_claim(doc_b.id, section_b.id, "port 8080", 0.9);
        let conflict = make_conflict(&claim_a, &claim_b);

        let llm = MockLLMService::fixed("unused");
        let strategy = MergeStrategy {
            mode: MergeMode::FlagAll,
            authority_order: vec![],
            conflict_threshold: 0.8,
        };

        let result = merge(
            &[doc_a, doc_b],
            &[section_a, section_b],
            &[claim_a, claim_b],
            &[conflict],
            &strategy,
            &llm,
            OutputFormat::Markdown,
            false,
        )
        .await
        .unwrap();

        assert!(result.conflicts_resolved.is_empty());
        assert_eq!(result.conflicts_flagged.len(), 1);
    }

    #[tokio::test]
    async fn newest_wins_flags_on_equal_timestamps() {
        let now = Utc::now();
        let mut doc_a = make_document("/docs/a.md", 5, 0);
        let mut doc_b = make_document("/docs/b.md", 5, 0);
        doc_a.created_at = now;
        doc_b.created_at = now;
        let section_a = make_section(doc_a.id, 0);
        let section_b = make_section(doc_b.id, 0);
        let claim_a = make_claim(doc_a.id, section_a.id, "port 3000", 0.9);
        let claim_b = make_claim(doc_b.id, section_b.id, "port 8080", 0.9);
        let conflict = make_conflict(&claim_a, &claim_b);

        let llm = MockLLMService::fixed("unused");
        let strategy = MergeStrategy {
            mode: MergeMode::NewestWins,
            authority_order: vec![],
            conflict_threshold: 0.8,
        };

        let result = merge(
            &[doc_a, doc_b],
            &[section_a, section_b],
            &[claim_a, claim_b],
            &[conflict],
            &strategy,
            &llm,
            OutputFormat::Markdown,
            false,
        )
        .await
        .unwrap();

        assert_eq!(result.conflicts_flagged.len(), 1);
    }

    #[test]
    fn title_case_preserves_acronyms() {
        assert_eq!(title_case("api_gateway"), "Api Gateway");
        assert_eq!(title_case("HTTP_server"), "HTTP Server");
    }

    #[test]
    fn glob_match_supports_wildcard_patterns() {
        assert!(glob_match("*official*", "/docs/official/api.md"));
        assert!(!glob_match("*official*", "/docs/draft/api.md"));
        assert!(glob_match("exact.md", "exact.md"));
    }
}

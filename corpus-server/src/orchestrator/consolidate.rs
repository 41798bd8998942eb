use std::time::Instant;

use chrono::Utc;
use corpus_consolidation::conflict::detect_conflicts;
use corpus_consolidation::merge::{merge, MergeMode, MergeStrategy, MergedDocument, OutputFormat as MergeFormat};
use corpus_core::traits::{EmbeddingService, LLMService};
use corpus_core::types::{Consolidation, ConflictResolution, Document, DocumentFormat, DocumentType};
use corpus_storage::repo::{
    ClaimRepository, ConflictRepository, ConsolidationRepository, DocumentRepository,
    ProvenanceRepository, SectionRepository, TagRepository,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, ToolError};

fn default_strategy() -> String {
    "smart".to_string()
}
fn default_conflict_threshold() -> f32 {
    0.7
}
fn default_auto_resolve_below() -> f32 {
    0.3
}
fn default_require_human_above() -> f32 {
    0.9
}
fn default_output_format() -> String {
    "markdown".to_string()
}
fn default_true() -> bool {
    true
}

/// Arguments for the `consolidate_documents` tool.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsolidateArgs {
    #[serde(default)]
    pub document_ids: Option<Vec<Uuid>>,
    #[serde(default)]
    pub scope: Option<Vec<String>>,
    #[serde(default)]
    pub cluster_id: Option<String>,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default)]
    pub authority_order: Vec<String>,
    #[serde(default = "default_conflict_threshold")]
    pub conflict_threshold: f32,
    #[serde(default = "default_auto_resolve_below")]
    pub auto_resolve_below: f32,
    #[serde(default = "default_require_human_above")]
    pub require_human_above: f32,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    #[serde(default = "default_true")]
    pub include_provenance: bool,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputDocumentSummary {
    pub id: Uuid,
    pub format: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsolidateResult {
    pub consolidation_id: Uuid,
    pub source_documents: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_document: Option<OutputDocumentSummary>,
    pub conflicts_resolved: Vec<serde_json::Value>,
    pub conflicts_flagged: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance_map: Option<serde_json::Value>,
    pub statistics: serde_json::Value,
    pub processing_time_ms: u128,
    pub status: String,
}

pub struct ConsolidateContext<'a> {
    pub documents: &'a dyn DocumentRepository,
    pub sections: &'a dyn SectionRepository,
    pub claims: &'a dyn ClaimRepository,
    pub conflicts: &'a dyn ConflictRepository,
    pub consolidations: &'a dyn ConsolidationRepository,
    pub provenance: &'a dyn ProvenanceRepository,
    pub tags: &'a dyn TagRepository,
    pub embeddings: Option<&'a dyn EmbeddingService>,
    pub llm: &'a dyn LLMService,
}

fn parse_mode(strategy: &str) -> Result<MergeMode> {
    match strategy {
        "smart" => Ok(MergeMode::Smart),
        "newest_wins" => Ok(MergeMode::NewestWins),
        "authority_wins" => Ok(MergeMode::AuthorityWins),
        "flag_all" => Ok(MergeMode::FlagAll),
        other => Err(ToolError::validation(format!("unknown strategy: {other}"))),
    }
}

fn parse_output_format(format: &str) -> Result<MergeFormat> {
    match format {
        "markdown" => Ok(MergeFormat::Markdown),
        "json" => Ok(MergeFormat::Json),
        "yaml" => Ok(MergeFormat::Yaml),
        other => Err(ToolError::validation(format!("unknown output_format: {other}"))),
    }
}

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

async fn expand_selector(ctx: &ConsolidateContext<'_>, args: &ConsolidateArgs) -> Result<Vec<Uuid>> {
    let provided = [
        args.document_ids.is_some(),
        args.scope.is_some(),
        args.cluster_id.is_some(),
    ]
    .iter()
    .filter(|p| **p)
    .count();
    if provided != 1 {
        return Err(ToolError::validation(
            "exactly one of document_ids, scope, or cluster_id must be provided",
        ));
    }

    if let Some(ids) = &args.document_ids {
        return Ok(ids.clone());
    }

    if let Some(patterns) = &args.scope {
        let all = ctx.documents.list().await?;
        return Ok(all
            .into_iter()
            .filter(|d| patterns.iter().any(|p| glob_match(p, &d.source_identifier)))
            .map(|d| d.id)
            .collect());
    }

    let cluster_id = args.cluster_id.as_ref().expect("checked above");
    let all = ctx.documents.list().await?;
    let mut matched = Vec::new();
    for doc in all {
        let tags = ctx.tags.list_tags(doc.id).await?;
        if tags.iter().any(|t| t == cluster_id) {
            matched.push(doc.id);
        }
    }
    Ok(matched)
}

fn merge_format_label(format: MergeFormat) -> &'static str {
    match format {
        MergeFormat::Markdown => "markdown",
        MergeFormat::Json => "json",
        MergeFormat::Yaml => "yaml",
    }
}

fn document_format_for(format: MergeFormat) -> DocumentFormat {
    match format {
        MergeFormat::Markdown => DocumentFormat::Markdown,
        MergeFormat::Json => DocumentFormat::Json,
        MergeFormat::Yaml => DocumentFormat::Yaml,
    }
}

/// Runs the full consolidate pipeline: selector expansion, C5 conflict
/// detection over the claim union, C6 merge, and (unless `dry_run`)
/// persistence of the merged document plus its `Consolidation` record.
pub async fn consolidate(ctx: &ConsolidateContext<'_>, args: ConsolidateArgs) -> Result<ConsolidateResult> {
    let started = Instant::now();

    let ids = expand_selector(ctx, &args).await?;
    if ids.len() < 2 {
        return Err(ToolError::validation("At least 2 documents required"));
    }

    let mut documents = Vec::with_capacity(ids.len());
    for id in &ids {
        match ctx.documents.get(*id).await? {
            Some(doc) => documents.push(doc),
            None => return Err(ToolError::not_found(format!("document not found: {id}"))),
        }
    }

    let mut sections = Vec::new();
    for id in &ids {
        sections.extend(ctx.sections.list_by_document(*id).await?);
    }

    let claims = ctx.claims.list_by_documents(&ids).await?;

    let mode = parse_mode(&args.strategy)?;
    let output_format = parse_output_format(&args.output_format)?;

    let detected = detect_conflicts(&claims, ctx.embeddings, ctx.llm).await?;

    let strategy = MergeStrategy {
        mode,
        authority_order: args.authority_order.clone(),
        conflict_threshold: args.conflict_threshold,
    };

    let merged: MergedDocument = merge(
        &documents,
        &sections,
        &claims,
        &detected,
        &strategy,
        ctx.llm,
        output_format,
        args.include_provenance,
    )
    .await?;

    let consolidation_id = Uuid::new_v4();
    let status = if args.dry_run { "dry_run" } else { "consolidated" };

    let output_document_id = if args.dry_run {
        merged.id
    } else {
        let output_document = Document {
            id: merged.id,
            source_identifier: format!("consolidation:{consolidation_id}"),
            content_hash: corpus_storage::hash::content_hash(&merged.content),
            format: document_format_for(output_format),
            document_type: DocumentType::Report,
            title: Some(merged.title.clone()),
            authority_level: Document::clamp_authority(
                documents.iter().map(|d| d.authority_level).max().unwrap_or(5),
            ),
            raw_content: merged.content.clone(),
            frontmatter: Default::default(),
            created_at: Utc::now(),
            embedding: None,
        };
        ctx.documents.insert(output_document).await?;

        ctx.conflicts.insert_many(detected.clone()).await?;

        for record in &merged.conflicts_resolved {
            let resolution = match record.resolution.as_str() {
                "chose_a" => ConflictResolution::ChoseA,
                "chose_b" => ConflictResolution::ChoseB,
                _ => ConflictResolution::Merged {
                    merged_text: record.merged_text.clone().unwrap_or_default(),
                },
            };
            ctx.conflicts.update_resolution(record.conflict_id, resolution).await?;
        }

        let consolidation = Consolidation {
            id: consolidation_id,
            source_document_ids: ids.clone(),
            result_document_id: Some(merged.id),
            strategy_name: args.strategy.clone(),
            conflicts_auto_resolved: merged.conflicts_resolved.len() as u32,
            conflicts_pending: merged.conflicts_flagged.len() as u32,
            created_at: Utc::now(),
            cluster_key: args.cluster_id.clone(),
        };
        ctx.consolidations.insert(consolidation).await?;

        if args.include_provenance {
            let records = merged
                .sections
                .iter()
                .flat_map(|s| s.bullets.iter())
                .flat_map(|b| b.provenance.iter().cloned())
                .collect();
            ctx.provenance.insert_many(consolidation_id, records).await?;
        }

        merged.id
    };

    let provenance_map = if args.include_provenance {
        Some(serde_json::json!(merged
            .sections
            .iter()
            .map(|s| serde_json::json!({
                "section": s.header,
                "provenance": s.bullets.iter().flat_map(|b| b.provenance.iter()).collect::<Vec<_>>(),
            }))
            .collect::<Vec<_>>()))
    } else {
        None
    };

    let statistics = serde_json::json!({
        "documents_merged": merged.statistics.documents_merged,
        "sections_merged": merged.statistics.sections_merged,
        "redundancy_eliminated_percent": merged.statistics.redundancy_eliminated_percent,
        "conflicts_auto_resolved": merged.statistics.conflicts_auto_resolved,
        "conflicts_flagged": merged.statistics.conflicts_flagged,
    });

    let conflicts_resolved = merged
        .conflicts_resolved
        .iter()
        .map(|r| {
            serde_json::json!({
                "conflict_id": r.conflict_id,
                "resolution": r.resolution,
                "reasoning": r.reasoning,
            })
        })
        .collect();
    let conflicts_flagged = merged
        .conflicts_flagged
        .iter()
        .map(|f| {
            serde_json::json!({
                "conflict_id": f.conflict_id,
                "reason": f.reason,
            })
        })
        .collect();

    Ok(ConsolidateResult {
        consolidation_id,
        source_documents: ids,
        output_document: Some(OutputDocumentSummary {
            id: output_document_id,
            format: merge_format_label(output_format).to_string(),
            content: merged.content,
        }),
        conflicts_resolved,
        conflicts_flagged,
        provenance_map,
        statistics,
        processing_time_ms: started.elapsed().as_millis(),
        status: status.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use corpus_core::types::{AtomicClaim, SourceSpan};
    use corpus_providers::llm::MockLLMService;
    use corpus_storage::memory::InMemoryStore;

    use super::*;

    fn make_document(source_identifier: &str) -> Document {
        Document {
            id: Uuid::new_v4(),
            source_identifier: source_identifier.into(),
            content_hash: Uuid::new_v4().to_string(),
            format: DocumentFormat::Markdown,
            document_type: DocumentType::Guide,
            title: Some("Guide".into()),
            authority_level: 5,
            raw_content: String::new(),
            frontmatter: Default::default(),
            created_at: Utc::now(),
            embedding: None,
        }
    }

    #[tokio::test]
    async fn fewer_than_two_documents_is_a_validation_error() {
        let store = InMemoryStore::new();
        let llm = MockLLMService::fixed("{}");
        let ctx = ConsolidateContext {
            documents: &store,
            sections: &store,
            claims: &store,
            conflicts: &store,
            consolidations: &store,
            provenance: &store,
            tags: &store,
            embeddings: None,
            llm: &llm,
        };
        let args = ConsolidateArgs {
            document_ids: Some(vec![Uuid::new_v4()]),
            scope: None,
            cluster_id: None,
            strategy: default_strategy(),
            authority_order: vec![],
            conflict_threshold: default_conflict_threshold(),
            auto_resolve_below: default_auto_resolve_below(),
            require_human_above: default_require_human_above(),
            output_format: default_output_format(),
            include_provenance: true,
            dry_run: false,
        };
        let result = consolidate(&ctx, args).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn dry_run_does_not_persist_output_document() {
        let store = InMemoryStore::new();
        let doc_a = make_document("/a.md");
        let doc_b = make_document("/b.md");
        corpus_storage::repo::DocumentRepository::insert(&store, doc_a.clone())
            .await
            .unwrap();
        corpus_storage::repo::DocumentRepository::insert(&store, doc_b.clone())
            .await
            .unwrap();

        let claim_a = AtomicClaim {
            id: Uuid::new_v4(),
            section_id: Uuid::new_v4(),
            document_id: doc_a.id,
            original_text: "Server uses port 3000.".into(),
            subject: "server".into(),
            predicate: "uses".into(),
            object: "port 3000".into(),
            qualifier: None,
            confidence: 0.9,
            source_span: SourceSpan { start: 0, end: 10 },
            deprecated: false,
        };
        ClaimRepository::insert_many(&store, vec![claim_a]).await.unwrap();

        let llm = MockLLMService::fixed("unused");
        let ctx = ConsolidateContext {
            documents: &store,
            sections: &store,
            claims: &store,
            conflicts: &store,
            consolidations: &store,
            provenance: &store,
            tags: &store,
            embeddings: None,
            llm: &llm,
        };
        let args = ConsolidateArgs {
            document_ids: Some(vec![doc_a.id, doc_b.id]),
            scope: None,
            cluster_id: None,
            strategy: default_strategy(),
            authority_order: vec![],
            conflict_threshold: default_conflict_threshold(),
            auto_resolve_below: default_auto_resolve_below(),
            require_human_above: default_require_human_above(),
            output_format: default_output_format(),
            include_provenance: true,
            dry_run: true,
        };

        let result = consolidate(&ctx, args).await.unwrap();
        assert_eq!(result.status, "dry_run");
        let documents_after = store.list().await.unwrap();
        assert_eq!(documents_after.len(), 2);
    }
}

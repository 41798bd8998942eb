use std::collections::{BTreeMap, HashSet};

use chrono::Utc;
use corpus_consolidation::extract::{deduplicate, extract_batch, SectionToExtract};
use corpus_core::traits::{EmbeddingService, LLMService};
use corpus_core::types::{Document, DocumentFormat, DocumentType, Section, Supersession};
use corpus_graph::resolve::{resolve_mentions, Mention};
use corpus_graph::storage::KnowledgeGraph;
use corpus_storage::hash::content_hash;
use corpus_storage::repo::{
    ClaimRepository, DocumentRepository, SectionRepository, SupersessionRepository, TagRepository,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, ToolError};

fn default_authority_level() -> u8 {
    5
}

fn default_true() -> bool {
    true
}

/// Arguments for the `ingest_document` tool, matching the external
/// interface's documented defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestArgs {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub document_type: DocumentType,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_authority_level")]
    pub authority_level: u8,
    #[serde(default)]
    pub supersedes: Vec<Uuid>,
    #[serde(default = "default_true")]
    pub extract_claims: bool,
    #[serde(default = "default_true")]
    pub generate_embeddings: bool,
    #[serde(default = "default_true")]
    pub build_entity_graph: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub document_id: Uuid,
    pub sections_extracted: usize,
    pub embeddings_generated: usize,
    pub claims_extracted: usize,
    pub status: String,
}

/// Dependencies the ingest orchestrator needs, bundled by reference so the
/// caller keeps ownership of the concrete backends.
pub struct IngestContext<'a> {
    pub documents: &'a dyn DocumentRepository,
    pub sections: &'a dyn SectionRepository,
    pub tags: &'a dyn TagRepository,
    pub supersessions: &'a dyn SupersessionRepository,
    pub claims: &'a dyn ClaimRepository,
    pub graph: &'a dyn KnowledgeGraph,
    pub embeddings: Option<&'a dyn EmbeddingService>,
    pub llm: &'a dyn LLMService,
    pub extract_concurrency: Option<usize>,
}

struct SectionDraft {
    header: String,
    heading_level: u8,
    order: u32,
    body: String,
    source_line_start: u32,
    source_line_end: u32,
}

fn heading_level(line: &str) -> Option<u8> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with('#') {
        return None;
    }
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if rest.is_empty() || rest.starts_with(' ') {
        Some(hashes as u8)
    } else {
        None
    }
}

/// Splits raw content into sections. Markdown content is split on ATX
/// headings (`#`..`######`); any other format is treated as one section
/// spanning the whole document, matching the "section order in input =
/// section order persisted" ordering guarantee trivially.
fn split_sections(raw: &str, format: DocumentFormat) -> Vec<SectionDraft> {
    if format != DocumentFormat::Markdown {
        let line_count = raw.lines().count().max(1) as u32;
        return vec![SectionDraft {
            header: String::new(),
            heading_level: 0,
            order: 0,
            body: raw.to_string(),
            source_line_start: 0,
            source_line_end: line_count,
        }];
    }

    let lines: Vec<&str> = raw.lines().collect();
    let mut blocks: Vec<(String, u8, u32, u32, Vec<&str>)> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let i = i as u32;
        if let Some(level) = heading_level(line) {
            let header_text = line.trim_start().trim_start_matches('#').trim().to_string();
            blocks.push((header_text, level, i, i, Vec::new()));
        } else if let Some(last) = blocks.last_mut() {
            last.3 = i;
            last.4.push(*line);
        } else if !line.trim().is_empty() {
            blocks.push((String::new(), 0, i, i, vec![*line]));
        }
    }

    blocks
        .into_iter()
        .enumerate()
        .map(|(order, (header, heading_level, start, end, body_lines))| SectionDraft {
            header,
            heading_level,
            order: order as u32,
            body: body_lines.join("\n"),
            source_line_start: start,
            source_line_end: end + 1,
        })
        .collect()
}

fn infer_format(file_path: Option<&str>) -> DocumentFormat {
    let Some(path) = file_path else {
        return DocumentFormat::Markdown;
    };
    match path.rsplit_once('.').map(|(_, ext)| ext.to_lowercase()) {
        Some(ext) if ext == "md" || ext == "markdown" => DocumentFormat::Markdown,
        Some(ext) if ext == "txt" => DocumentFormat::Text,
        Some(ext) if ext == "json" => DocumentFormat::Json,
        Some(ext) if ext == "yaml" || ext == "yml" => DocumentFormat::Yaml,
        _ => DocumentFormat::Markdown,
    }
}

fn extract_title(raw: &str, format: DocumentFormat) -> Option<String> {
    if format != DocumentFormat::Markdown {
        return None;
    }
    raw.lines().find_map(|line| {
        let trimmed = line.trim_start();
        trimmed
            .strip_prefix("# ")
            .map(|rest| rest.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

async fn load_raw_content(args: &IngestArgs) -> Result<String> {
    let provided = [args.content.is_some(), args.file_path.is_some(), args.url.is_some()]
        .iter()
        .filter(|p| **p)
        .count();
    if provided != 1 {
        return Err(ToolError::validation(
            "exactly one of content, file_path, or url must be provided",
        ));
    }

    if let Some(content) = &args.content {
        return Ok(content.clone());
    }
    if let Some(path) = &args.file_path {
        return tokio::fs::read_to_string(path).await.map_err(Into::into);
    }
    if let Some(url) = &args.url {
        let text = reqwest::get(url).await?.text().await?;
        return Ok(text);
    }
    unreachable!("exactly-one check above guarantees one branch taken")
}

/// Runs the full ingest pipeline: content-hash short-circuit, persistence,
/// tagging, supersession recording, embedding generation, claim
/// extraction, and entity-graph linking.
pub async fn ingest(ctx: &IngestContext<'_>, args: IngestArgs, source_identifier: String) -> Result<IngestResult> {
    let raw_content = load_raw_content(&args).await?;
    let hash = content_hash(&raw_content);

    if let Some(existing) = ctx.documents.find_by_content_hash(&hash).await? {
        info!(document_id = %existing.id, "ingest short-circuited on matching content hash");
        return Ok(IngestResult {
            document_id: existing.id,
            sections_extracted: 0,
            embeddings_generated: 0,
            claims_extracted: 0,
            status: "duplicate".to_string(),
        });
    }

    let format = infer_format(args.file_path.as_deref());
    let title = extract_title(&raw_content, format);
    let drafts = split_sections(&raw_content, format);

    let mut embeddings_generated = 0usize;
    let mut document_embedding = None;
    let mut section_embeddings: Vec<Option<Vec<f32>>> = vec![None; drafts.len()];

    if args.generate_embeddings {
        if let Some(service) = ctx.embeddings {
            let mut texts = vec![raw_content.clone()];
            texts.extend(drafts.iter().map(|d| d.body.clone()));
            let vectors = service.embed(&texts).await?;
            let mut vectors = vectors.into_iter();
            document_embedding = vectors.next();
            for slot in section_embeddings.iter_mut() {
                *slot = vectors.next();
            }
            embeddings_generated = 1 + drafts.len();
        }
    }

    let document_id = Uuid::new_v4();
    let document = Document {
        id: document_id,
        source_identifier,
        content_hash: hash,
        format,
        document_type: args.document_type,
        title,
        authority_level: Document::clamp_authority(args.authority_level),
        raw_content: raw_content.clone(),
        frontmatter: BTreeMap::new(),
        created_at: Utc::now(),
        embedding: document_embedding,
    };

    let sections: Vec<Section> = drafts
        .into_iter()
        .zip(section_embeddings.into_iter())
        .map(|(draft, embedding)| Section {
            id: Uuid::new_v4(),
            document_id,
            header: draft.header,
            body: draft.body,
            heading_level: draft.heading_level,
            order: draft.order,
            source_line_start: draft.source_line_start,
            source_line_end: draft.source_line_end,
            embedding,
        })
        .collect();

    ctx.documents.insert(document).await?;
    ctx.sections.insert_many(sections.clone()).await?;

    for tag in &args.tags {
        ctx.tags.add_tag(document_id, tag).await?;
    }

    for old_id in &args.supersedes {
        ctx.supersessions
            .insert(Supersession {
                id: Uuid::new_v4(),
                old_document_id: *old_id,
                new_document_id: document_id,
                reason: None,
                created_at: Utc::now(),
            })
            .await?;
    }

    let mut claims_extracted = 0usize;
    if args.extract_claims {
        let to_extract = sections
            .iter()
            .map(|s| SectionToExtract {
                section_id: s.id,
                document_id,
                content: s.body.clone(),
            })
            .collect();
        let by_section = extract_batch(ctx.llm, to_extract, ctx.extract_concurrency).await;
        let all_claims: Vec<_> = by_section.into_values().flatten().collect();
        let deduped = deduplicate(all_claims, 1.0);
        claims_extracted = deduped.len();

        if !deduped.is_empty() {
            ctx.claims.insert_many(deduped.clone()).await?;

            if args.build_entity_graph {
                let mut mention_texts: HashSet<String> = HashSet::new();
                for claim in &deduped {
                    mention_texts.insert(claim.subject.clone());
                    mention_texts.insert(claim.object.clone());
                }
                let mentions: Vec<Mention> = mention_texts.into_iter().map(Mention::new).collect();
                let resolved = resolve_mentions(ctx.graph, ctx.embeddings, &mentions).await?;

                for claim in &deduped {
                    if let Some(entity) = resolved.get(&claim.subject) {
                        ctx.graph
                            .link_claim_to_entity(claim.id, entity.id, document_id)
                            .await?;
                    }
                    if let Some(entity) = resolved.get(&claim.object) {
                        ctx.graph
                            .link_claim_to_entity(claim.id, entity.id, document_id)
                            .await?;
                    }
                }
            }
        }
    }

    Ok(IngestResult {
        document_id,
        sections_extracted: sections.len(),
        embeddings_generated,
        claims_extracted,
        status: "ingested".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use corpus_graph::storage::InMemoryGraph;
    use corpus_providers::embedding::MockEmbeddingService;
    use corpus_providers::llm::MockLLMService;
    use corpus_storage::memory::InMemoryStore;

    use super::*;

    #[tokio::test]
    async fn splits_markdown_headings_into_ordered_sections() {
        let raw = "# Title\n\nIntro text.\n\n## Server\n\nUses port 3000.\n";
        let drafts = split_sections(raw, DocumentFormat::Markdown);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].header, "Title");
        assert_eq!(drafts[1].header, "Server");
        assert_eq!(drafts[0].order, 0);
        assert_eq!(drafts[1].order, 1);
    }

    #[tokio::test]
    async fn second_ingest_of_identical_content_is_a_duplicate() {
        let store = InMemoryStore::new();
        let graph = InMemoryGraph::new();
        let llm = MockLLMService::fixed("{\"claims\":[]}");
        let ctx = IngestContext {
            documents: &store,
            sections: &store,
            tags: &store,
            supersessions: &store,
            claims: &store,
            graph: &graph,
            embeddings: None,
            llm: &llm,
            extract_concurrency: None,
        };

        let args = IngestArgs {
            content: Some("# Doc\n\nSome content.\n".to_string()),
            file_path: None,
            url: None,
            document_type: DocumentType::Guide,
            tags: vec![],
            authority_level: 5,
            supersedes: vec![],
            extract_claims: false,
            generate_embeddings: false,
            build_entity_graph: false,
        };

        let first = ingest(&ctx, args.clone(), "doc-1".to_string()).await.unwrap();
        assert_eq!(first.status, "ingested");

        let second = ingest(&ctx, args, "doc-1-again".to_string()).await.unwrap();
        assert_eq!(second.status, "duplicate");
        assert_eq!(second.document_id, first.document_id);
    }

    #[tokio::test]
    async fn generates_embeddings_for_document_and_each_section() {
        let store = InMemoryStore::new();
        let graph = InMemoryGraph::new();
        let embeddings = MockEmbeddingService::default();
        let llm = MockLLMService::fixed("{\"claims\":[]}");
        let ctx = IngestContext {
            documents: &store,
            sections: &store,
            tags: &store,
            supersessions: &store,
            claims: &store,
            graph: &graph,
            embeddings: Some(&embeddings),
            llm: &llm,
            extract_concurrency: None,
        };

        let args = IngestArgs {
            content: Some("# Doc\n\n## A\n\nBody A.\n\n## B\n\nBody B.\n".to_string()),
            file_path: None,
            url: None,
            document_type: DocumentType::Guide,
            tags: vec![],
            authority_level: 5,
            supersedes: vec![],
            extract_claims: false,
            generate_embeddings: true,
            build_entity_graph: false,
        };

        let result = ingest(&ctx, args, "doc-2".to_string()).await.unwrap();
        assert_eq!(result.embeddings_generated, 1 + result.sections_extracted);
    }
}

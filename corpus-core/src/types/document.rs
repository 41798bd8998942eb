use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Closed set of document formats the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Markdown,
    Text,
    Json,
    Yaml,
}

/// Closed set of document types, used by authority heuristics and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Spec,
    Guide,
    Handoff,
    Prompt,
    Report,
    Reference,
    Decision,
    Archive,
}

/// A uniquely identified ingested artifact.
///
/// A document owns an ordered sequence of [`crate::types::Section`] values
/// but does not store them inline; repositories join sections by
/// `document_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub source_identifier: String,
    pub content_hash: String,
    pub format: DocumentFormat,
    pub document_type: DocumentType,
    pub title: Option<String>,
    pub authority_level: u8,
    pub raw_content: String,
    pub frontmatter: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    /// Clamp to the documented 1–10 range; values outside are not rejected,
    /// only brought into range, since the tool boundary validates inputs
    /// before a `Document` is ever constructed.
    pub fn clamp_authority(level: u8) -> u8 {
        level.clamp(1, 10)
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A contiguous, immutable region of a document.
///
/// Sections are never mutated once written; re-ingesting a document creates
/// a new document id and an entirely new set of sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: Uuid,
    pub document_id: Uuid,
    pub header: String,
    pub body: String,
    pub heading_level: u8,
    /// 0-based order within the owning document.
    pub order: u32,
    pub source_line_start: u32,
    pub source_line_end: u32,
    pub embedding: Option<Vec<f32>>,
}

impl Section {
    pub fn is_blank(&self) -> bool {
        self.body.trim().is_empty()
    }
}

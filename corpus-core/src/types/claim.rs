use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A minimal factual assertion lifted from exactly one section.
///
/// Atomicity is an invariant enforced by the extractor/validator, not by the
/// type: `subject`/`predicate`/`object` are plain, non-empty strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomicClaim {
    pub id: Uuid,
    pub section_id: Uuid,
    pub document_id: Uuid,
    pub original_text: String,
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub qualifier: Option<String>,
    pub confidence: f32,
    pub source_span: SourceSpan,
    pub deprecated: bool,
}

/// Half-open character span `[start, end)` within the owning section's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start: u32,
    pub end: u32,
}

impl AtomicClaim {
    pub fn topic_key(&self) -> String {
        self.subject.to_lowercase()
    }

    pub fn group_key(&self) -> (String, String) {
        (self.subject.to_lowercase(), self.predicate.to_lowercase())
    }

    pub fn normalized_object(&self) -> String {
        self.object.trim().to_lowercase()
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which pipeline stage produced a candidate conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictChannel {
    ValueExtraction,
    Semantic,
    Llm,
}

/// The kind of disagreement between two claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    ValueConflict,
    TemporalConflict,
    ScopeConflict,
    NotAConflict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolutionStatus {
    Pending,
    Resolved,
}

/// The outcome recorded when a conflict transitions to `Resolved`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictResolution {
    ChoseA,
    ChoseB,
    Merged { merged_text: String },
}

/// A detected disagreement between two claims, identified by an ordered
/// pair `(claim_a, claim_b)`. The unordered `{id_a, id_b}` pair is unique
/// within the consolidation that generated it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub id: Uuid,
    pub claim_a_id: Uuid,
    pub claim_a_document_id: Uuid,
    pub claim_a_text: String,
    pub claim_b_id: Uuid,
    pub claim_b_document_id: Uuid,
    pub claim_b_text: String,
    pub conflict_type: ConflictType,
    pub strength: f32,
    pub channel: ConflictChannel,
    pub resolution_hints: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub status: ConflictResolutionStatus,
    pub resolution: Option<ConflictResolution>,
}

impl Conflict {
    /// Unordered pair key used for Stage D dedup and the uniqueness
    /// invariant.
    pub fn pair_key(&self) -> (Uuid, Uuid) {
        if self.claim_a_id <= self.claim_b_id {
            (self.claim_a_id, self.claim_b_id)
        } else {
            (self.claim_b_id, self.claim_a_id)
        }
    }

    pub fn involves_document(&self, document_id: Uuid) -> bool {
        self.claim_a_document_id == document_id || self.claim_b_document_id == document_id
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed or attempted merge. Append-only: once written, a
/// `Consolidation` record is never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consolidation {
    pub id: Uuid,
    pub source_document_ids: Vec<Uuid>,
    pub result_document_id: Option<Uuid>,
    pub strategy_name: String,
    pub conflicts_auto_resolved: u32,
    pub conflicts_pending: u32,
    pub created_at: DateTime<Utc>,
    pub cluster_key: Option<String>,
}

/// The triple recorded per merged bullet, letting every claim surfaced in a
/// merged section be traced back to its source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub document_id: Uuid,
    pub section_id: Uuid,
    pub claim_id: Uuid,
}

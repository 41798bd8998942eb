use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A directed `old -> new` document replacement edge, recorded only when
/// explicitly asserted at ingestion via `supersedes[]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supersession {
    pub id: Uuid,
    pub old_document_id: Uuid,
    pub new_document_id: Uuid,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

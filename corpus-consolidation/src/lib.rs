pub mod conflict;
pub mod error;
pub mod extract;
pub mod merge;

pub mod prelude {
    pub use crate::conflict::{conflicts_for_document, detect_conflicts};
    pub use crate::error::{ConsolidationError, Result};
    pub use crate::extract::{
        deduplicate, extract, extract_batch, validate_claims, ClaimIssue, SectionToExtract,
    };
    pub use crate::merge::{
        merge, title_case, Bullet, FlaggedConflictRecord, MergeMode, MergeStatistics,
        MergeStrategy, MergedDocument, OutputFormat, OutputSection, ResolvedConflictRecord,
    };
}

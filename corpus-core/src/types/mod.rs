mod claim;
mod conflict;
mod consolidation;
mod document;
mod entity;
mod section;
mod supersession;

pub use claim::{AtomicClaim, SourceSpan};
pub use conflict::{
    Conflict, ConflictChannel, ConflictResolution, ConflictResolutionStatus, ConflictType,
};
pub use consolidation::{Consolidation, ProvenanceRecord};
pub use document::{Document, DocumentFormat, DocumentType};
pub use entity::{Entity, EntityType};
pub use section::Section;
pub use supersession::Supersession;

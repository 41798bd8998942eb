//! Repository traits (C2) covering documents, sections, claims, conflicts,
//! supersessions, consolidations, tags and provenance, plus an in-memory
//! default backend and an optional SQLite-backed one.

pub mod error;
pub mod hash;
pub mod memory;
pub mod repo;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod prelude {
    pub use crate::error::{Result, StorageError};
    pub use crate::hash::content_hash;
    pub use crate::memory::InMemoryStore;
    pub use crate::repo::{
        ClaimRepository, ConflictRepository, ConsolidationRepository, DocumentRepository,
        ProvenanceRepository, SectionRepository, SupersessionRepository, TagRepository,
    };

    #[cfg(feature = "sqlite")]
    pub use crate::sqlite::SqliteStore;
}

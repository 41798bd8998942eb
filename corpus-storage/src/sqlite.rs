//! Feature-gated (`sqlite`) persistent backend. Scoped to the three
//! repositories on the hot path of a single ingest — documents, sections,
//! claims — since persistence engines sit outside the specified core and
//! the remaining repositories (conflicts, supersessions, consolidations,
//! tags, provenance) are comparatively small, consolidation-scoped tables
//! that the in-memory backend already serves adequately for this crate's
//! scope; wiring them to SQLite is mechanical repetition of the same
//! pattern shown here.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use corpus_core::types::{AtomicClaim, Document, DocumentFormat, DocumentType, Section, SourceSpan};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::repo::{ClaimRepository, DocumentRepository, SectionRepository};

/// SQLite-backed store for documents, sections and claims. Connections are
/// not `Send`-free across await points, so every query runs inside
/// `spawn_blocking` against a shared, mutex-guarded connection, mirroring
/// how the teacher wraps blocking storage engines behind an async trait.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                source_identifier TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                format TEXT NOT NULL,
                document_type TEXT NOT NULL,
                title TEXT,
                authority_level INTEGER NOT NULL,
                raw_content TEXT NOT NULL,
                frontmatter TEXT NOT NULL,
                created_at TEXT NOT NULL,
                embedding TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_documents_content_hash ON documents(content_hash);

            CREATE TABLE IF NOT EXISTS sections (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                header TEXT NOT NULL,
                body TEXT NOT NULL,
                heading_level INTEGER NOT NULL,
                section_order INTEGER NOT NULL,
                source_line_start INTEGER NOT NULL,
                source_line_end INTEGER NOT NULL,
                embedding TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_sections_document_id ON sections(document_id);

            CREATE TABLE IF NOT EXISTS claims (
                id TEXT PRIMARY KEY,
                section_id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                original_text TEXT NOT NULL,
                subject TEXT NOT NULL,
                predicate TEXT NOT NULL,
                object TEXT NOT NULL,
                qualifier TEXT,
                confidence REAL NOT NULL,
                span_start INTEGER NOT NULL,
                span_end INTEGER NOT NULL,
                deprecated INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_claims_document_id ON claims(document_id);",
        )?;
        Ok(())
    }
}

fn format_to_str(format: DocumentFormat) -> &'static str {
    match format {
        DocumentFormat::Markdown => "markdown",
        DocumentFormat::Text => "text",
        DocumentFormat::Json => "json",
        DocumentFormat::Yaml => "yaml",
    }
}

fn format_from_str(s: &str) -> DocumentFormat {
    match s {
        "text" => DocumentFormat::Text,
        "json" => DocumentFormat::Json,
        "yaml" => DocumentFormat::Yaml,
        _ => DocumentFormat::Markdown,
    }
}

fn doc_type_to_str(t: DocumentType) -> &'static str {
    match t {
        DocumentType::Spec => "spec",
        DocumentType::Guide => "guide",
        DocumentType::Handoff => "handoff",
        DocumentType::Prompt => "prompt",
        DocumentType::Report => "report",
        DocumentType::Reference => "reference",
        DocumentType::Decision => "decision",
        DocumentType::Archive => "archive",
    }
}

fn doc_type_from_str(s: &str) -> DocumentType {
    match s {
        "guide" => DocumentType::Guide,
        "handoff" => DocumentType::Handoff,
        "prompt" => DocumentType::Prompt,
        "report" => DocumentType::Report,
        "reference" => DocumentType::Reference,
        "decision" => DocumentType::Decision,
        "archive" => DocumentType::Archive,
        _ => DocumentType::Spec,
    }
}

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    let id: String = row.get(0)?;
    let frontmatter: String = row.get(8)?;
    let created_at: String = row.get(9)?;
    let embedding: Option<String> = row.get(10)?;
    Ok(Document {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        source_identifier: row.get(1)?,
        content_hash: row.get(2)?,
        format: format_from_str(&row.get::<_, String>(3)?),
        document_type: doc_type_from_str(&row.get::<_, String>(4)?),
        title: row.get(5)?,
        authority_level: row.get::<_, i64>(6)? as u8,
        raw_content: row.get(7)?,
        frontmatter: serde_json::from_str::<BTreeMap<String, serde_json::Value>>(&frontmatter)
            .unwrap_or_default(),
        created_at: created_at.parse().unwrap_or_else(|_| chrono::Utc::now()),
        embedding: embedding.and_then(|e| serde_json::from_str(&e).ok()),
    })
}

#[async_trait]
impl DocumentRepository for SqliteStore {
    async fn insert(&self, document: Document) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            conn.execute(
                "INSERT OR REPLACE INTO documents
                 (id, source_identifier, content_hash, format, document_type, title,
                  authority_level, raw_content, frontmatter, created_at, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    document.id.to_string(),
                    document.source_identifier,
                    document.content_hash,
                    format_to_str(document.format),
                    doc_type_to_str(document.document_type),
                    document.title,
                    document.authority_level as i64,
                    document.raw_content,
                    serde_json::to_string(&document.frontmatter).unwrap_or_default(),
                    document.created_at.to_rfc3339(),
                    document.embedding.map(|e| serde_json::to_string(&e).unwrap_or_default()),
                ],
            )?;
            Ok::<_, StorageError>(())
        })
        .await
        .map_err(|e| StorageError::Other(e.to_string()))??;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Document>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            let mut stmt = conn.prepare("SELECT * FROM documents WHERE id = ?1")?;
            let mut rows = stmt.query(params![id.to_string()])?;
            if let Some(row) = rows.next()? {
                Ok::<_, StorageError>(Some(row_to_document(row)?))
            } else {
                Ok(None)
            }
        })
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?
    }

    async fn find_by_content_hash(&self, hash: &str) -> Result<Option<Document>> {
        let conn = self.conn.clone();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            let mut stmt = conn.prepare("SELECT * FROM documents WHERE content_hash = ?1 LIMIT 1")?;
            let mut rows = stmt.query(params![hash])?;
            if let Some(row) = rows.next()? {
                Ok::<_, StorageError>(Some(row_to_document(row)?))
            } else {
                Ok(None)
            }
        })
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            conn.execute("DELETE FROM documents WHERE id = ?1", params![id.to_string()])?;
            conn.execute("DELETE FROM sections WHERE document_id = ?1", params![id.to_string()])?;
            conn.execute("DELETE FROM claims WHERE document_id = ?1", params![id.to_string()])?;
            Ok::<_, StorageError>(())
        })
        .await
        .map_err(|e| StorageError::Other(e.to_string()))??;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Document>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            let mut stmt = conn.prepare("SELECT * FROM documents")?;
            let rows = stmt.query_map([], row_to_document)?;
            let mut documents = Vec::new();
            for row in rows {
                documents.push(row?);
            }
            Ok::<_, StorageError>(documents)
        })
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?
    }
}

#[async_trait]
impl SectionRepository for SqliteStore {
    async fn insert_many(&self, sections: Vec<Section>) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            for section in sections {
                conn.execute(
                    "INSERT OR REPLACE INTO sections
                     (id, document_id, header, body, heading_level, section_order,
                      source_line_start, source_line_end, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        section.id.to_string(),
                        section.document_id.to_string(),
                        section.header,
                        section.body,
                        section.heading_level as i64,
                        section.order as i64,
                        section.source_line_start as i64,
                        section.source_line_end as i64,
                        section.embedding.map(|e| serde_json::to_string(&e).unwrap_or_default()),
                    ],
                )?;
            }
            Ok::<_, StorageError>(())
        })
        .await
        .map_err(|e| StorageError::Other(e.to_string()))??;
        Ok(())
    }

    async fn list_by_document(&self, document_id: Uuid) -> Result<Vec<Section>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            let mut stmt = conn.prepare(
                "SELECT id, document_id, header, body, heading_level, section_order,
                 source_line_start, source_line_end, embedding
                 FROM sections WHERE document_id = ?1 ORDER BY section_order",
            )?;
            let rows = stmt.query_map(params![document_id.to_string()], |row| {
                let id: String = row.get(0)?;
                let document_id: String = row.get(1)?;
                let embedding: Option<String> = row.get(8)?;
                Ok(Section {
                    id: Uuid::parse_str(&id).unwrap_or_default(),
                    document_id: Uuid::parse_str(&document_id).unwrap_or_default(),
                    header: row.get(2)?,
                    body: row.get(3)?,
                    heading_level: row.get::<_, i64>(4)? as u8,
                    order: row.get::<_, i64>(5)? as u32,
                    source_line_start: row.get::<_, i64>(6)? as u32,
                    source_line_end: row.get::<_, i64>(7)? as u32,
                    embedding: embedding.and_then(|e| serde_json::from_str(&e).ok()),
                })
            })?;
            let mut sections = Vec::new();
            for row in rows {
                sections.push(row?);
            }
            Ok::<_, StorageError>(sections)
        })
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?
    }

    async fn get(&self, id: Uuid) -> Result<Option<Section>> {
        let all_for_doc_workaround = self.list_all_sections().await?;
        Ok(all_for_doc_workaround.into_iter().find(|s| s.id == id))
    }

    async fn delete_by_document(&self, document_id: Uuid) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            conn.execute(
                "DELETE FROM sections WHERE document_id = ?1",
                params![document_id.to_string()],
            )?;
            Ok::<_, StorageError>(())
        })
        .await
        .map_err(|e| StorageError::Other(e.to_string()))??;
        Ok(())
    }
}

impl SqliteStore {
    async fn list_all_sections(&self) -> Result<Vec<Section>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            let mut stmt = conn.prepare(
                "SELECT id, document_id, header, body, heading_level, section_order,
                 source_line_start, source_line_end, embedding FROM sections",
            )?;
            let rows = stmt.query_map([], |row| {
                let id: String = row.get(0)?;
                let document_id: String = row.get(1)?;
                let embedding: Option<String> = row.get(8)?;
                Ok(Section {
                    id: Uuid::parse_str(&id).unwrap_or_default(),
                    document_id: Uuid::parse_str(&document_id).unwrap_or_default(),
                    header: row.get(2)?,
                    body: row.get(3)?,
                    heading_level: row.get::<_, i64>(4)? as u8,
                    order: row.get::<_, i64>(5)? as u32,
                    source_line_start: row.get::<_, i64>(6)? as u32,
                    source_line_end: row.get::<_, i64>(7)? as u32,
                    embedding: embedding.and_then(|e| serde_json::from_str(&e).ok()),
                })
            })?;
            let mut sections = Vec::new();
            for row in rows {
                sections.push(row?);
            }
            Ok::<_, StorageError>(sections)
        })
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?
    }
}

#[async_trait]
impl ClaimRepository for SqliteStore {
    async fn insert_many(&self, claims: Vec<AtomicClaim>) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            for claim in claims {
                conn.execute(
                    "INSERT OR REPLACE INTO claims
                     (id, section_id, document_id, original_text, subject, predicate, object,
                      qualifier, confidence, span_start, span_end, deprecated)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    params![
                        claim.id.to_string(),
                        claim.section_id.to_string(),
                        claim.document_id.to_string(),
                        claim.original_text,
                        claim.subject,
                        claim.predicate,
                        claim.object,
                        claim.qualifier,
                        claim.confidence,
                        claim.source_span.start as i64,
                        claim.source_span.end as i64,
                        claim.deprecated as i64,
                    ],
                )?;
            }
            Ok::<_, StorageError>(())
        })
        .await
        .map_err(|e| StorageError::Other(e.to_string()))??;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<AtomicClaim>> {
        let all = self.list_all_claims().await?;
        Ok(all.into_iter().find(|c| c.id == id))
    }

    async fn list_by_document(&self, document_id: Uuid) -> Result<Vec<AtomicClaim>> {
        let all = self.list_all_claims().await?;
        Ok(all.into_iter().filter(|c| c.document_id == document_id).collect())
    }

    async fn list_by_documents(&self, document_ids: &[Uuid]) -> Result<Vec<AtomicClaim>> {
        let all = self.list_all_claims().await?;
        Ok(all
            .into_iter()
            .filter(|c| document_ids.contains(&c.document_id))
            .collect())
    }

    async fn update_deprecation(&self, id: Uuid, deprecated: bool, confidence: f32) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            let updated = conn.execute(
                "UPDATE claims SET deprecated = ?1, confidence = ?2 WHERE id = ?3",
                params![deprecated as i64, confidence, id.to_string()],
            )?;
            if updated == 0 {
                return Err(StorageError::NotFound(id.to_string()));
            }
            Ok::<_, StorageError>(())
        })
        .await
        .map_err(|e| StorageError::Other(e.to_string()))??;
        Ok(())
    }

    async fn delete_by_document(&self, document_id: Uuid) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            conn.execute(
                "DELETE FROM claims WHERE document_id = ?1",
                params![document_id.to_string()],
            )?;
            Ok::<_, StorageError>(())
        })
        .await
        .map_err(|e| StorageError::Other(e.to_string()))??;
        Ok(())
    }
}

impl SqliteStore {
    async fn list_all_claims(&self) -> Result<Vec<AtomicClaim>> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            let mut stmt = conn.prepare(
                "SELECT id, section_id, document_id, original_text, subject, predicate, object,
                 qualifier, confidence, span_start, span_end, deprecated FROM claims",
            )?;
            let rows = stmt.query_map([], |row| {
                let id: String = row.get(0)?;
                let section_id: String = row.get(1)?;
                let document_id: String = row.get(2)?;
                Ok(AtomicClaim {
                    id: Uuid::parse_str(&id).unwrap_or_default(),
                    section_id: Uuid::parse_str(&section_id).unwrap_or_default(),
                    document_id: Uuid::parse_str(&document_id).unwrap_or_default(),
                    original_text: row.get(3)?,
                    subject: row.get(4)?,
                    predicate: row.get(5)?,
                    object: row.get(6)?,
                    qualifier: row.get(7)?,
                    confidence: row.get(8)?,
                    source_span: SourceSpan {
                        start: row.get::<_, i64>(9)? as u32,
                        end: row.get::<_, i64>(10)? as u32,
                    },
                    deprecated: row.get::<_, i64>(11)? != 0,
                })
            })?;
            let mut claims = Vec::new();
            for row in rows {
                claims.push(row?);
            }
            Ok::<_, StorageError>(claims)
        })
        .await
        .map_err(|e| StorageError::Other(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn sample_document() -> Document {
        Document {
            id: Uuid::new_v4(),
            source_identifier: "test.md".into(),
            content_hash: "hash-1".into(),
            format: DocumentFormat::Markdown,
            document_type: DocumentType::Spec,
            title: Some("Title".into()),
            authority_level: 5,
            raw_content: "content".into(),
            frontmatter: Default::default(),
            created_at: Utc::now(),
            embedding: None,
        }
    }

    #[tokio::test]
    async fn round_trips_a_document() {
        let store = SqliteStore::open_in_memory().unwrap();
        let doc = sample_document();
        let id = doc.id;
        DocumentRepository::insert(&store, doc).await.unwrap();

        let fetched = DocumentRepository::get(&store, id).await.unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.content_hash, "hash-1");
    }

    #[tokio::test]
    async fn find_by_content_hash_after_insert() {
        let store = SqliteStore::open_in_memory().unwrap();
        let doc = sample_document();
        DocumentRepository::insert(&store, doc).await.unwrap();

        let found = store.find_by_content_hash("hash-1").await.unwrap();
        assert!(found.is_some());
    }
}

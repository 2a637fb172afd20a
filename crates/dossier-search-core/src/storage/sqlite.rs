//! SQLite search store
//!
//! Bilingual documents, an FTS5 index of analyzed terms, and embeddings
//! stored as little-endian f32 blobs.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{Connection, InterruptHandle, OptionalExtension, params};
use uuid::Uuid;

use super::{
    DocumentQuery, PrefixQuery, Result, SearchStore, StemClause, StoreError, StoreStats,
    VectorHit, VectorQuery,
};
use crate::embeddings::{cosine_similarity, from_bytes, to_bytes};
use crate::model::{Document, EntityType, compare_ranked};
use crate::search::{forms, stems};

const DOCUMENT_COLUMNS: &str = "d.id, d.entity_type, d.title_en, d.title_ar, d.body_en, d.body_ar, \
     d.updated_at, d.is_archived, d.classification_level";

// ============================================================================
// STORE
// ============================================================================

struct Connections {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    /// Stops the statement running on `reader` from another thread
    reader_interrupt: InterruptHandle,
}

/// Lifecycle of one blocking read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Queued,
    Running,
    Done,
    Abandoned,
}

/// Interrupts its read if the awaiting future is dropped first.
///
/// The state lock is held while the read leaves `Running` and while the
/// interrupt is issued, so an interrupt can only reach the read it belongs to.
struct ReadGuard {
    state: Arc<Mutex<ReadState>>,
    inner: Arc<Connections>,
}

impl Drop for ReadGuard {
    fn drop(&mut self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        match *state {
            ReadState::Queued => *state = ReadState::Abandoned,
            ReadState::Running => {
                tracing::debug!("Interrupting abandoned store read");
                self.inner.reader_interrupt.interrupt();
                *state = ReadState::Abandoned;
            }
            ReadState::Done | ReadState::Abandoned => {}
        }
    }
}

fn set_state(state: &Mutex<ReadState>, from: ReadState, to: ReadState) -> bool {
    match state.lock() {
        Ok(mut current) if *current == from => {
            *current = to;
            true
        }
        _ => false,
    }
}

/// SQLite-backed searchable store
///
/// Uses separate reader/writer connections. All methods take `&self`, and
/// the connections live behind an `Arc` so reads can move onto the blocking
/// pool.
#[derive(Clone)]
pub struct SqliteStore {
    inner: Arc<Connections>,
}

impl SqliteStore {
    /// Apply PRAGMAs to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA mmap_size = 268435456;",
        )?;
        Ok(())
    }

    /// Default database location in the platform data directory
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "dossier", "search").ok_or_else(|| {
            StoreError::Init("Could not determine project directories".to_string())
        })?;
        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(data_dir.join("search.db"))
    }

    /// Open (or create) a store. `None` uses [`SqliteStore::default_path`].
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => Self::default_path()?,
        };

        let writer_conn = Connection::open(&path)?;
        Self::configure_connection(&writer_conn)?;
        // Migrations run on the writer only
        super::migrations::migrate(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;
        let reader_interrupt = reader_conn.get_interrupt_handle();

        tracing::debug!(path = %path.display(), "Opened search store");

        Ok(Self {
            inner: Arc::new(Connections {
                writer: Mutex::new(writer_conn),
                reader: Mutex::new(reader_conn),
                reader_interrupt,
            }),
        })
    }

    fn with_writer<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut writer = self
            .inner
            .writer
            .lock()
            .map_err(|_| StoreError::Init("Writer lock poisoned".into()))?;
        f(&mut writer)
    }

    fn with_reader<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        read_with(&self.inner, f)
    }

    /// Run a read on the blocking pool.
    ///
    /// Dropping the returned future (for example on timeout) interrupts the
    /// statement, so the reader connection is released for the next caller.
    async fn read_blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::new(Mutex::new(ReadState::Queued));
        let _guard = ReadGuard {
            state: Arc::clone(&state),
            inner: Arc::clone(&self.inner),
        };

        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            read_with(&inner, |conn| {
                if !set_state(&state, ReadState::Queued, ReadState::Running) {
                    return Err(StoreError::Unavailable("Read abandoned before start".into()));
                }
                let result = f(conn);
                set_state(&state, ReadState::Running, ReadState::Done);
                result
            })
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("Blocking task failed: {}", e)))?
    }

    // ========================================================================
    // WRITE API
    // ========================================================================

    /// Insert or replace a document and refresh its index terms
    pub fn upsert_document(&self, doc: &Document) -> Result<()> {
        let title_text = format!("{} {}", doc.title_en, doc.title_ar);
        let title_terms = forms(&title_text).join(" ");
        let stem_terms = [&doc.title_en, &doc.title_ar, &doc.body_en, &doc.body_ar]
            .iter()
            .flat_map(|field| stems(field))
            .collect::<Vec<_>>()
            .join(" ");

        self.with_writer(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO documents (id, entity_type, title_en, title_ar, body_en, body_ar,
                                        updated_at, is_archived, classification_level)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                    entity_type = excluded.entity_type,
                    title_en = excluded.title_en,
                    title_ar = excluded.title_ar,
                    body_en = excluded.body_en,
                    body_ar = excluded.body_ar,
                    updated_at = excluded.updated_at,
                    is_archived = excluded.is_archived,
                    classification_level = excluded.classification_level",
                params![
                    doc.id.to_string(),
                    doc.entity_type.as_str(),
                    doc.title_en,
                    doc.title_ar,
                    doc.body_en,
                    doc.body_ar,
                    doc.updated_at.to_rfc3339(),
                    doc.is_archived,
                    doc.classification_level,
                ],
            )?;

            let rowid: i64 = tx.query_row(
                "SELECT rowid FROM documents WHERE id = ?1",
                params![doc.id.to_string()],
                |row| row.get(0),
            )?;
            tx.execute("DELETE FROM documents_fts WHERE rowid = ?1", params![rowid])?;
            tx.execute(
                "INSERT INTO documents_fts (rowid, title_terms, stem_terms) VALUES (?1, ?2, ?3)",
                params![rowid, title_terms, stem_terms],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Store (or replace) a document's embedding
    pub fn upsert_embedding(&self, id: Uuid, embedding: &[f32], model: &str) -> Result<()> {
        self.with_writer(|conn| {
            conn.execute(
                "INSERT INTO document_embeddings (document_id, embedding, dimensions, model, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(document_id) DO UPDATE SET
                    embedding = excluded.embedding,
                    dimensions = excluded.dimensions,
                    model = excluded.model,
                    created_at = excluded.created_at",
                params![
                    id.to_string(),
                    to_bytes(embedding),
                    embedding.len() as i64,
                    model,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    /// Remove a document, its index terms and its embedding
    pub fn delete_document(&self, id: Uuid) -> Result<bool> {
        self.with_writer(|conn| {
            let tx = conn.transaction()?;
            let rowid: Option<i64> = tx
                .query_row(
                    "SELECT rowid FROM documents WHERE id = ?1",
                    params![id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(rowid) = rowid else {
                return Ok(false);
            };
            tx.execute("DELETE FROM documents_fts WHERE rowid = ?1", params![rowid])?;
            tx.execute(
                "DELETE FROM document_embeddings WHERE document_id = ?1",
                params![id.to_string()],
            )?;
            tx.execute("DELETE FROM documents WHERE rowid = ?1", params![rowid])?;
            tx.commit()?;
            Ok(true)
        })
    }

    /// Fetch a single document
    pub fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        self.with_reader(|conn| {
            let sql = format!("SELECT {} FROM documents d WHERE d.id = ?1", DOCUMENT_COLUMNS);
            Ok(conn
                .query_row(&sql, params![id.to_string()], row_to_document)
                .optional()?)
        })
    }

    /// Document and embedding counts
    pub fn stats(&self) -> Result<StoreStats> {
        self.with_reader(|conn| {
            let mut by_type = BTreeMap::new();
            let mut stmt = conn.prepare(
                "SELECT entity_type, COUNT(*) FROM documents GROUP BY entity_type",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (name, count) = row?;
                let entity_type = name
                    .parse::<EntityType>()
                    .map_err(StoreError::Serialization)?;
                by_type.insert(entity_type, count as usize);
            }

            let documents: i64 =
                conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
            let archived: i64 = conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE is_archived = 1",
                [],
                |row| row.get(0),
            )?;
            let embeddings: i64 =
                conn.query_row("SELECT COUNT(*) FROM document_embeddings", [], |row| row.get(0))?;

            Ok(StoreStats {
                documents: documents as usize,
                archived: archived as usize,
                embeddings: embeddings as usize,
                by_type,
            })
        })
    }
}

fn read_with<T>(inner: &Connections, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    let reader = inner
        .reader
        .lock()
        .map_err(|_| StoreError::Init("Reader lock poisoned".into()))?;
    f(&reader)
}

// ============================================================================
// QUERY HELPERS
// ============================================================================

/// `'dossier', 'person'` for an IN clause. Names come from the enum, never input.
fn type_list(entity_types: &[EntityType]) -> String {
    entity_types
        .iter()
        .map(|t| format!("'{}'", t.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Quote a term for an FTS5 MATCH expression
fn fts_quote(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}

fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(format!("Invalid {} timestamp '{}': {}", field_name, value, e)))
}

fn conversion_error(message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

/// Convert a row selected with [`DOCUMENT_COLUMNS`] to a Document
fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    let id: String = row.get("id")?;
    let entity_type: String = row.get("entity_type")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Document {
        id: Uuid::parse_str(&id).map_err(|e| conversion_error(format!("Invalid id '{}': {}", id, e)))?,
        entity_type: entity_type.parse().map_err(conversion_error)?,
        title_en: row.get("title_en")?,
        title_ar: row.get("title_ar")?,
        body_en: row.get("body_en")?,
        body_ar: row.get("body_ar")?,
        updated_at: parse_timestamp(&updated_at, "updated_at")?,
        is_archived: row.get("is_archived")?,
        classification_level: row.get("classification_level")?,
    })
}

/// Compile a stem clause to an FTS5 expression. `None` when it constrains nothing.
fn match_clause(clause: &StemClause) -> Option<String> {
    match clause {
        StemClause::All(stems) if stems.is_empty() => None,
        StemClause::All(stems) => Some(format!(
            "({})",
            stems.iter().map(|s| fts_quote(s)).collect::<Vec<_>>().join(" AND ")
        )),
        StemClause::And(l, r) => match (match_clause(l), match_clause(r)) {
            (Some(l), Some(r)) => Some(format!("({} AND {})", l, r)),
            (Some(one), None) | (None, Some(one)) => Some(one),
            (None, None) => None,
        },
        StemClause::Or(l, r) => match (match_clause(l), match_clause(r)) {
            (Some(l), Some(r)) => Some(format!("({} OR {})", l, r)),
            _ => None,
        },
    }
}

fn query_candidates(conn: &Connection, query: &DocumentQuery) -> Result<Vec<Document>> {
    if query.entity_types.is_empty() || query.limit == 0 {
        return Ok(Vec::new());
    }

    let archived_clause = if query.include_archived {
        ""
    } else {
        " AND d.is_archived = 0"
    };

    let Some(expr) = query.clause.as_ref().and_then(match_clause) else {
        let sql = format!(
            "SELECT {} FROM documents d
             WHERE d.entity_type IN ({}){}
             ORDER BY d.updated_at DESC, d.id ASC
             LIMIT ?1 OFFSET ?2",
            DOCUMENT_COLUMNS,
            type_list(&query.entity_types),
            archived_clause
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(
            params![query.limit as i64, query.offset as i64],
            row_to_document,
        )?;
        return Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?);
    };

    let match_expr = format!("stem_terms : {}", expr);
    let sql = format!(
        "SELECT {} FROM documents_fts
         JOIN documents d ON d.rowid = documents_fts.rowid
         WHERE documents_fts MATCH ?3
           AND d.entity_type IN ({}){}
         ORDER BY bm25(documents_fts), d.updated_at DESC, d.id ASC
         LIMIT ?1 OFFSET ?2",
        DOCUMENT_COLUMNS,
        type_list(&query.entity_types),
        archived_clause
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(
        params![query.limit as i64, query.offset as i64, match_expr],
        row_to_document,
    )?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn query_prefix(conn: &Connection, query: &PrefixQuery) -> Result<Vec<Document>> {
    if query.entity_types.is_empty() || query.limit == 0 || query.prefix.is_empty() {
        return Ok(Vec::new());
    }

    let mut parts: Vec<String> = query.words.iter().map(|w| fts_quote(w)).collect();
    parts.push(format!("{}*", fts_quote(&query.prefix)));
    let match_expr = format!("title_terms : ({})", parts.join(" AND "));

    let sql = format!(
        "SELECT {} FROM documents d
         WHERE d.rowid IN (SELECT rowid FROM documents_fts WHERE documents_fts MATCH ?1)
           AND d.entity_type IN ({})
           AND d.is_archived = 0
         ORDER BY d.updated_at DESC, d.id ASC
         LIMIT ?2",
        DOCUMENT_COLUMNS,
        type_list(&query.entity_types)
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![match_expr, query.limit as i64], row_to_document)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn query_nearest(conn: &Connection, query: &VectorQuery) -> Result<Vec<VectorHit>> {
    if query.entity_types.is_empty() || query.limit == 0 {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {}, e.embedding FROM document_embeddings e
         JOIN documents d ON d.id = e.document_id
         WHERE d.entity_type IN ({}) AND d.is_archived = 0",
        DOCUMENT_COLUMNS,
        type_list(&query.entity_types)
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map([], |row| {
        let document = row_to_document(row)?;
        let bytes: Vec<u8> = row.get("embedding")?;
        Ok((document, bytes))
    })?;

    let mut hits = Vec::new();
    for row in rows {
        let (document, bytes) = row?;
        let Some(vector) = from_bytes(&bytes) else {
            tracing::warn!(id = %document.id, "Skipping undecodable embedding");
            continue;
        };
        let similarity = cosine_similarity(&query.embedding, &vector);
        if similarity >= query.threshold {
            hits.push(VectorHit {
                document,
                similarity: similarity.clamp(0.0, 1.0),
            });
        }
    }

    hits.sort_by(|a, b| {
        compare_ranked(
            (a.similarity, a.document.updated_at, a.document.id),
            (b.similarity, b.document.updated_at, b.document.id),
        )
    });
    hits.truncate(query.limit);
    Ok(hits)
}

// ============================================================================
// SEARCH STORE
// ============================================================================

#[async_trait]
impl SearchStore for SqliteStore {
    async fn candidates(&self, query: &DocumentQuery) -> Result<Vec<Document>> {
        let query = query.clone();
        self.read_blocking(move |conn| query_candidates(conn, &query)).await
    }

    async fn prefix_lookup(&self, query: &PrefixQuery) -> Result<Vec<Document>> {
        let query = query.clone();
        self.read_blocking(move |conn| query_prefix(conn, &query)).await
    }

    async fn nearest(&self, query: &VectorQuery) -> Result<Vec<VectorHit>> {
        let query = query.clone();
        self.read_blocking(move |conn| query_nearest(conn, &query)).await
    }

    async fn ping(&self) -> Result<()> {
        self.read_blocking(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }
}

// ============================================================================
// TESTS
// ============================================================================

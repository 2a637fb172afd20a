//! Schema migrations for the searchable store
//!
//! Each step is a SQL batch that records its own version in
//! `schema_version`. Steps newer than the recorded version run in order.

/// Ordered schema steps
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Documents and FTS5 term index",
        sql: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Document embeddings",
        sql: MIGRATION_V2_UP,
    },
];

/// One schema step
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// V1: Documents and term index
///
/// The FTS table holds analyzed terms rather than raw text. Analysis runs in
/// the application so query terms and stored terms share one stemmer:
/// - `title_terms`: unstemmed title forms, for typeahead prefix lookups
/// - `stem_terms`: stems of every title and body field, for candidate retrieval
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    entity_type TEXT NOT NULL,
    title_en TEXT NOT NULL DEFAULT '',
    title_ar TEXT NOT NULL DEFAULT '',
    body_en TEXT NOT NULL DEFAULT '',
    body_ar TEXT NOT NULL DEFAULT '',
    updated_at TEXT NOT NULL,
    is_archived INTEGER NOT NULL DEFAULT 0,
    classification_level INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_documents_type_updated
    ON documents(entity_type, updated_at DESC);

CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
    title_terms,
    stem_terms,
    tokenize='unicode61 remove_diacritics 2',
    prefix='2 3 4'
);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: Embeddings for semantic search
const MIGRATION_V2_UP: &str = r#"
CREATE TABLE IF NOT EXISTS document_embeddings (
    document_id TEXT PRIMARY KEY REFERENCES documents(id) ON DELETE CASCADE,
    embedding BLOB NOT NULL,
    dimensions INTEGER NOT NULL,
    model TEXT NOT NULL,
    created_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (2, datetime('now'));
"#;

/// Highest applied schema version, 0 for a fresh database
pub fn schema_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let version = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<u32>>(0)
        })
        .unwrap_or(None);
    Ok(version.unwrap_or(0))
}

/// Run every step newer than the recorded version; returns how many ran
pub fn migrate(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let from = schema_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > from).collect();

    for step in &pending {
        tracing::info!(version = step.version, description = step.description, "Migrating schema");
        conn.execute_batch(step.sql)?;
    }

    Ok(pending.len() as u32)
}

//! Dossier Search Server
//!
//! HTTP surface and operator tooling for the bilingual search engine:
//! - [`api`]: axum router for full search, typeahead, semantic search and health
//! - [`import`]: JSONL document import into the SQLite store

pub mod api;
pub mod import;

pub use api::{AppState, ServerOptions, build_router, serve, shutdown_signal};
pub use import::{ImportError, ImportSummary, Importer};

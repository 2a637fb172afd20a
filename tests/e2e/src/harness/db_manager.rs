//! Test Environment Manager
//!
//! Provides isolated search environments for testing:
//! - Temporary SQLite stores that are automatically cleaned up
//! - Stores pre-seeded with the bilingual corpus
//! - Engines and routers wired with test-friendly timeouts

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use dossier_search_core::engine::SearchEngineBuilder;
use dossier_search_core::{
    ClearanceAuthorizer, HashEmbedder, SearchConfig, SearchEngine, SqliteStore,
};
use dossier_search_server::{AppState, ServerOptions, build_router};
use tempfile::TempDir;

use crate::mocks::fixtures::{SeededCorpus, TestDataFactory};

/// Manager for a test search environment
///
/// Each environment owns its own database file, deleted on drop.
///
/// # Example
///
/// ```rust,ignore
/// let env = TestSearchEnv::seeded();
/// let engine = env.engine();
/// let response = engine.search(&Caller::anonymous(0), &SearchParams::new("climate")).await?;
/// ```
pub struct TestSearchEnv {
    pub store: SqliteStore,
    pub corpus: SeededCorpus,
    /// Kept alive to prevent premature deletion
    _temp_dir: TempDir,
    db_path: PathBuf,
}

impl TestSearchEnv {
    /// Empty store in a temporary directory
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_search.db");
        let store = SqliteStore::new(Some(db_path.clone())).expect("Failed to create test store");

        Self {
            store,
            corpus: SeededCorpus::default(),
            _temp_dir: temp_dir,
            db_path,
        }
    }

    /// Store seeded with the bilingual corpus
    pub fn seeded() -> Self {
        let mut env = Self::new_temp();
        env.corpus = TestDataFactory::seed_corpus(&env.store);
        env
    }

    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Defaults with per-call timeouts relaxed for slow CI machines.
    /// The suggest deadline stays at its production value.
    pub fn config() -> SearchConfig {
        SearchConfig {
            store_timeout_ms: 5_000,
            embedding_timeout_ms: 5_000,
            ..Default::default()
        }
    }

    /// Builder with hash embeddings and clearance-based authorization
    pub fn engine_builder(&self) -> SearchEngineBuilder {
        SearchEngine::builder(Arc::new(self.store.clone()))
            .config(Self::config())
            .embedder(Arc::new(HashEmbedder::default()))
            .authorizer(Arc::new(ClearanceAuthorizer))
    }

    pub fn engine(&self) -> SearchEngine {
        self.engine_builder()
            .build()
            .expect("Failed to build test engine")
    }

    /// Router over `engine` with anonymous callers at clearance 0
    pub fn router_for(engine: SearchEngine) -> Router {
        build_router(
            AppState::new(Arc::new(engine), 0),
            &ServerOptions::default(),
        )
    }

    pub fn router(&self) -> Router {
        Self::router_for(self.engine())
    }
}

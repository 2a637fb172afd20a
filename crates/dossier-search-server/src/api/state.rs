//! Shared handler state

use std::sync::Arc;

use dossier_search_core::SearchEngine;

/// Shared application state for the search API
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    /// Clearance for requests without an `x-clearance-level` header
    pub default_clearance: u8,
}

impl AppState {
    pub fn new(engine: Arc<SearchEngine>, default_clearance: u8) -> Self {
        Self {
            engine,
            default_clearance,
        }
    }
}

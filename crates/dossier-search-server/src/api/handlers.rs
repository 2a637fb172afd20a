//! Search API endpoint handlers

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use dossier_search_core::{
    Caller, EntityType, HealthReport, LangPreference, SearchError, SearchParams, SearchResponse,
    SemanticParams, SemanticResponse, SuggestParams, SuggestResponse,
};
use dossier_search_core::engine::parse_entity_types;
use serde::Deserialize;

use super::error::ApiError;
use super::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const CLEARANCE_HEADER: &str = "x-clearance-level";

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Comma-separated entity types
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub include_archived: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub lang: Option<String>,
}

/// Full Boolean keyword search
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(query) = query?;
    let caller = caller_from_headers(&headers, state.default_clearance)?;

    let params = SearchParams {
        q: query.q.unwrap_or_default(),
        limit: query.limit,
        offset: query.offset,
        entity_types: entity_types(query.entity_type.as_deref())?,
        include_archived: query.include_archived.unwrap_or(false),
    };

    let response = state.engine.search(&caller, &params).await?;
    Ok(Json(response))
}

/// Typeahead suggestions
pub async fn suggest(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<SuggestQuery>, QueryRejection>,
) -> Result<Json<SuggestResponse>, ApiError> {
    let Query(query) = query?;
    let caller = caller_from_headers(&headers, state.default_clearance)?;

    let lang = match query.lang.as_deref() {
        Some(raw) => raw.parse::<LangPreference>()?,
        None => LangPreference::Auto,
    };
    let params = SuggestParams {
        q: query.q.unwrap_or_default(),
        limit: query.limit,
        entity_types: entity_types(query.entity_type.as_deref())?,
        lang,
    };

    let response = state.engine.suggest(&caller, &params).await?;
    Ok(Json(response))
}

/// Semantic or hybrid search
pub async fn semantic_search(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SemanticParams>, JsonRejection>,
) -> Result<Json<SemanticResponse>, ApiError> {
    let Json(params) = body?;
    let caller = caller_from_headers(&headers, state.default_clearance)?;

    let response = state.engine.semantic_search(&caller, &params).await?;
    Ok(Json(response))
}

/// Store reachability, cache counters and version
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.engine.health().await;
    let status = if report.store.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

// ============================================================================
// REQUEST HELPERS
// ============================================================================

/// The caller a request runs as, from the identity headers
pub fn caller_from_headers(headers: &HeaderMap, default_clearance: u8) -> Result<Caller, SearchError> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let clearance_level = match headers.get(CLEARANCE_HEADER) {
        None => default_clearance,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<u8>().ok())
            .ok_or_else(|| {
                SearchError::validation(
                    format!("{} must be an integer between 0 and 255", CLEARANCE_HEADER),
                    format!("يجب أن تكون قيمة {} عدداً صحيحاً بين 0 و 255", CLEARANCE_HEADER),
                )
            })?,
    };

    Ok(Caller {
        user_id,
        clearance_level,
    })
}

fn entity_types(raw: Option<&str>) -> Result<Option<Vec<EntityType>>, SearchError> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_entity_types(raw).map(Some),
    }
}

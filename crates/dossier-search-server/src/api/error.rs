//! Error responses
//!
//! Every failure renders as
//! `{"error": {"code", "message", "message_ar", "details": {...}}}`
//! with the status the engine assigns (400 or 503).

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dossier_search_core::SearchError;
use serde_json::{Value, json};

/// A failed request
#[derive(Debug)]
pub struct ApiError(pub SearchError);

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        ApiError(e)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(SearchError::validation(
            format!("Invalid query parameters: {}", rejection.body_text()),
            format!("معلمات الاستعلام غير صالحة: {}", rejection.body_text()),
        ))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(SearchError::validation(
            format!("Invalid request body: {}", rejection.body_text()),
            format!("نص الطلب غير صالح: {}", rejection.body_text()),
        ))
    }
}

impl ApiError {
    fn body(&self) -> Value {
        let err = &self.0;
        let mut details = json!({
            "message": err.message(),
            "message_ar": err.message_ar(),
        });
        match err {
            SearchError::Validation {
                position: Some(position),
                ..
            } => details["position"] = json!(position),
            SearchError::Unavailable { source_kind, .. } => {
                details["source"] = json!(source_kind.as_str())
            }
            _ => {}
        }

        json!({
            "error": {
                "code": err.code(),
                "message": err.message(),
                "message_ar": err.message_ar(),
                "details": details,
            }
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body())).into_response()
    }
}

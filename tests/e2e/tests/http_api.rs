//! Wire format through the axum router

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use dossier_search_core::SearchEngine;
use dossier_search_e2e_tests::TestSearchEnv;
use dossier_search_e2e_tests::mocks::{DownEmbedder, DownStore, RESTRICTED_LEVEL};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn assert_bilingual_error(body: &Value) {
    let error = &body["error"];
    assert!(error["code"].is_string());
    assert!(error["message"].is_string());
    assert!(error["message_ar"].is_string());
    assert!(error["details"]["message"].is_string());
    assert!(error["details"]["message_ar"].is_string());
}

#[tokio::test]
async fn search_response_shape() {
    let env = TestSearchEnv::seeded();
    let router = env.router();

    let (status, body) = send(&router, get("/search?q=climate&limit=2")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    for field in ["total", "dossiers", "people", "engagements", "positions", "mous", "documents", "restricted"] {
        assert!(body["counts"][field].is_u64(), "counts.{}", field);
    }
    assert_eq!(body["query"]["original"], "climate");
    assert_eq!(body["query"]["normalized"], "climate");
    assert_eq!(body["query"]["language_detected"], "en");
    assert!(body["took_ms"].is_u64());
    assert_eq!(body["metadata"]["has_more"], true);
    assert_eq!(body["metadata"]["next_offset"], 2);

    let first = &body["results"][0];
    assert!(first["id"].is_string());
    assert!(first["rank_score"].is_f64());
    assert!(first.get("classification_level").is_none());
}

#[tokio::test]
async fn empty_query_error_body() {
    let env = TestSearchEnv::seeded();
    let router = env.router();

    let (status, body) = send(&router, get("/search?q=")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_bilingual_error(&body);

    let (status, body) = send(&router, get("/search")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_bilingual_error(&body);
}

#[tokio::test]
async fn syntax_error_reports_position() {
    let env = TestSearchEnv::seeded();
    let router = env.router();

    let (status, body) = send(&router, get("/search?q=climate%20AND%20(policy")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_bilingual_error(&body);
    assert!(body["error"]["details"]["position"].is_u64());
}

#[tokio::test]
async fn arabic_query_over_http() {
    let env = TestSearchEnv::seeded();
    let router = env.router();

    // مناخ, percent-encoded
    let (status, body) = send(&router, get("/search?q=%D9%85%D9%86%D8%A7%D8%AE")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"]["language_detected"], "ar");
    let marked = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["snippet_ar"].as_str())
        .any(|s| s.contains("<mark>"));
    assert!(marked);
}

#[tokio::test]
async fn suggest_over_http() {
    let env = TestSearchEnv::seeded();
    let router = env.router();

    let (status, body) = send(&router, get("/search/suggest?q=wat&limit=5&type=documents")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cache_hit"], false);
    let suggestions = body["suggestions"].as_array().unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0]["entity_type"], "document");
    assert!(body["took_ms"].as_u64().unwrap() < 200);

    let (_, again) = send(&router, get("/search/suggest?q=wat&limit=5&type=documents")).await;
    assert_eq!(again["cache_hit"], true);
    assert!(again.get("typo_corrections").is_none());

    let (status, body) = send(&router, get("/search/suggest?q=water%20secrity")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["typo_corrections"][0]["corrected"], "water security");
    assert_eq!(body["suggestions"][0]["typo_correction"]["original"], "water secrity");

    let (status, body) = send(&router, get(&format!("/search/suggest?q={}", "x".repeat(101)))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_bilingual_error(&body);
}

#[tokio::test]
async fn semantic_over_http() {
    let env = TestSearchEnv::seeded();
    let router = env.router();

    let (status, body) = send(
        &router,
        post_json(
            "/search/semantic",
            json!({
                "query": "climate finance framework",
                "entity_types": ["positions", "briefs"],
                "similarity_threshold": 0.1,
                "limit": 5,
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("exact_matches").is_none());
    assert_eq!(body["query"]["embedding_dimensions"], 1536);
    assert!(body["performance"]["embedding_generation_ms"].is_u64());
    assert!(body["performance"]["vector_search_ms"].is_u64());
    assert!(body["performance"].get("keyword_search_ms").is_none());
    for result in body["results"].as_array().unwrap() {
        assert!(["position", "brief"].contains(&result["entity_type"].as_str().unwrap()));
        assert_eq!(result["match_type"], "semantic");
    }
}

#[tokio::test]
async fn semantic_validation_over_http() {
    let env = TestSearchEnv::seeded();
    let router = env.router();

    let cases = [
        json!({"query": "ab"}),
        json!({"query": "x".repeat(501)}),
        json!({"query": "climate", "entity_types": ["dossiers"]}),
        json!({"query": "climate", "similarity_threshold": 1.5}),
        json!({"query": "climate", "similarity_threshold": -0.5}),
    ];
    for case in cases {
        let (status, body) = send(&router, post_json("/search/semantic", case.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", case);
        assert_bilingual_error(&body);
    }
}

#[tokio::test]
async fn embedding_outage_is_503_over_http() {
    let env = TestSearchEnv::seeded();
    let engine = env
        .engine_builder()
        .embedder(Arc::new(DownEmbedder::default()))
        .build()
        .unwrap();
    let router = TestSearchEnv::router_for(engine);

    let (status, body) = send(
        &router,
        post_json("/search/semantic", json!({"query": "climate finance"})),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_bilingual_error(&body);
    assert_eq!(body["error"]["code"], "EMBEDDING_UNAVAILABLE");
}

#[tokio::test]
async fn clearance_header_over_http() {
    let env = TestSearchEnv::seeded();
    let router = env.router();

    let (_, public) = send(&router, get("/search?q=negotiation")).await;
    assert_eq!(public["counts"]["restricted"], 1);
    assert!(public["metadata"]["restricted_message"].is_string());

    let request = Request::builder()
        .uri("/search?q=negotiation")
        .header("x-user-id", "analyst")
        .header("x-clearance-level", RESTRICTED_LEVEL.to_string())
        .body(Body::empty())
        .unwrap();
    let (_, cleared) = send(&router, request).await;
    assert_eq!(cleared["counts"]["restricted"], 0);
    assert!(cleared["metadata"].get("restricted_message").is_none());
}

#[tokio::test]
async fn health_reflects_store() {
    let env = TestSearchEnv::seeded();

    let (status, body) = send(&env.router(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["cache"]["backend"], "memory");

    let down = SearchEngine::builder(Arc::new(DownStore))
        .config(TestSearchEnv::config())
        .build()
        .unwrap();
    let (status, body) = send(&TestSearchEnv::router_for(down), get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert!(body["store"]["error"].is_string());
}

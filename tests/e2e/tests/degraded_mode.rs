//! Cache, embedding and store outages

use std::sync::Arc;
use std::sync::atomic::Ordering;

use dossier_search_core::{
    Caller, SearchEngine, SearchError, SearchParams, SemanticParams, SourceKind, SuggestParams,
};
use dossier_search_e2e_tests::TestSearchEnv;
use dossier_search_e2e_tests::mocks::{DownCache, DownEmbedder, DownStore};

fn anonymous() -> Caller {
    Caller::anonymous(0)
}

#[tokio::test]
async fn cache_outage_is_absorbed() {
    let env = TestSearchEnv::seeded();
    let cache = Arc::new(DownCache::default());
    let engine = env
        .engine_builder()
        .cache_backend(cache.clone())
        .build()
        .unwrap();
    let reference = env.engine();

    let degraded = engine
        .suggest(&anonymous(), &SuggestParams::new("wat"))
        .await
        .unwrap();
    let healthy = reference
        .suggest(&anonymous(), &SuggestParams::new("wat"))
        .await
        .unwrap();

    assert!(!degraded.cache_hit);
    assert_eq!(degraded.suggestions, healthy.suggestions);
    assert!(cache.calls.load(Ordering::SeqCst) >= 1);

    // Still never a hit while the cache stays down
    let again = engine
        .suggest(&anonymous(), &SuggestParams::new("wat"))
        .await
        .unwrap();
    assert!(!again.cache_hit);

    let stats = engine.cache_stats();
    assert!(stats.degraded >= 2);
    assert_eq!(stats.hits, 0);
}

#[tokio::test]
async fn embedding_outage_fails_semantic_only() {
    let env = TestSearchEnv::seeded();
    let engine = env
        .engine_builder()
        .embedder(Arc::new(DownEmbedder::default()))
        .build()
        .unwrap();

    let err = engine
        .semantic_search(&anonymous(), &SemanticParams::new("climate finance"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 503);
    assert_eq!(err.code(), "EMBEDDING_UNAVAILABLE");
    assert!(matches!(
        err,
        SearchError::Unavailable {
            source_kind: SourceKind::Embedding,
            ..
        }
    ));

    // Hybrid mode does not fall back to keyword-only results
    let mut hybrid = SemanticParams::new("climate finance");
    hybrid.include_keyword_results = true;
    assert!(engine.semantic_search(&anonymous(), &hybrid).await.is_err());

    // Keyword search and typeahead are unaffected
    let response = engine
        .search(&anonymous(), &SearchParams::new("climate"))
        .await
        .unwrap();
    assert!(!response.results.is_empty());
    assert!(
        engine
            .suggest(&anonymous(), &SuggestParams::new("clim"))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn validation_precedes_backend_calls() {
    let env = TestSearchEnv::seeded();
    let engine = env
        .engine_builder()
        .embedder(Arc::new(DownEmbedder::default()))
        .build()
        .unwrap();

    // Invalid input is a 400 even though the embedder is down
    let mut params = SemanticParams::new("climate");
    params.similarity_threshold = Some(1.5);
    let err = engine.semantic_search(&anonymous(), &params).await.unwrap_err();
    assert_eq!(err.status_code(), 400);

    let err = engine
        .semantic_search(&anonymous(), &SemanticParams::new("ab"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn store_outage_is_503_everywhere() {
    let engine = SearchEngine::builder(Arc::new(DownStore))
        .config(TestSearchEnv::config())
        .build()
        .unwrap();

    let err = engine
        .search(&anonymous(), &SearchParams::new("climate"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "SEARCH_UNAVAILABLE");
    assert_eq!(err.status_code(), 503);

    let err = engine
        .suggest(&anonymous(), &SuggestParams::new("clim"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 503);

    let err = engine
        .semantic_search(&anonymous(), &SemanticParams::new("climate"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VECTOR_SEARCH_UNAVAILABLE");

    // Parse errors still win over unavailability
    let err = engine
        .search(&anonymous(), &SearchParams::new("climate AND"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);

    let health = engine.health().await;
    assert_eq!(health.status, "degraded");
    assert!(!health.store.healthy);
}

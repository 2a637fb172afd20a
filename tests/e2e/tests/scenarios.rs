//! Acceptance scenarios over the seeded bilingual corpus

use dossier_search_core::{
    Caller, EntityType, Language, SearchError, SearchParams, SemanticParams, SuggestParams,
};
use dossier_search_e2e_tests::mocks::RESTRICTED_LEVEL;
use dossier_search_e2e_tests::{TestDataFactory, TestSearchEnv};

fn anonymous() -> Caller {
    Caller::anonymous(0)
}

// ============================================================================
// SCENARIO A: English keyword search
// ============================================================================

#[tokio::test]
async fn english_keyword_search_finds_climate_policy() {
    let env = TestSearchEnv::seeded();
    let engine = env.engine();

    let response = engine
        .search(&anonymous(), &SearchParams::new("climate").with_limit(20))
        .await
        .unwrap();

    assert!(response.counts.total > 0);
    assert_eq!(response.query.language_detected, Language::En);
    assert!(response.results.iter().any(|r| {
        r.title_en.to_lowercase().contains("climate")
            || r.snippet_en
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains("climate"))
    }));
    assert!(
        response
            .results
            .iter()
            .any(|r| r.id == env.corpus.id("climate-dossier"))
    );
}

// ============================================================================
// SCENARIO B: Arabic keyword search
// ============================================================================

#[tokio::test]
async fn arabic_keyword_search_highlights_arabic_snippet() {
    let env = TestSearchEnv::seeded();
    let engine = env.engine();

    let response = engine
        .search(&anonymous(), &SearchParams::new("مناخ"))
        .await
        .unwrap();

    assert_eq!(response.query.language_detected, Language::Ar);
    assert!(!response.results.is_empty());
    assert!(
        response
            .results
            .iter()
            .filter_map(|r| r.snippet_ar.as_deref())
            .any(|s| s.contains("<mark>"))
    );
}

// ============================================================================
// SCENARIO C: Empty query
// ============================================================================

#[tokio::test]
async fn empty_query_is_bilingual_validation_error() {
    let env = TestSearchEnv::seeded();
    let engine = env.engine();

    for q in ["", "   "] {
        let err = engine
            .search(&anonymous(), &SearchParams::new(q))
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Validation { .. }));
        assert_eq!(err.status_code(), 400);
        assert!(!err.message().is_empty());
        assert!(!err.message_ar().is_empty());
    }

    let err = engine
        .suggest(&anonymous(), &SuggestParams::new(""))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
}

// ============================================================================
// SCENARIO D: Similarity threshold
// ============================================================================

#[tokio::test]
async fn semantic_results_respect_threshold() {
    let env = TestSearchEnv::seeded();
    let engine = env.engine();

    // Same text the fixture embedding was computed from
    let (_, position) = TestDataFactory::corpus()
        .into_iter()
        .find(|(slug, _)| *slug == "climate-position")
        .unwrap();
    let text = format!(
        "{} {} {} {}",
        position.title_en, position.title_ar, position.body_en, position.body_ar
    );

    let mut params = SemanticParams::new(text);
    params.similarity_threshold = Some(0.8);
    let response = engine.semantic_search(&anonymous(), &params).await.unwrap();

    assert!(!response.results.is_empty());
    assert_eq!(response.results[0].id, env.corpus.id("climate-position"));
    for result in &response.results {
        assert!(result.similarity_score >= 0.8, "{}", result.similarity_score);
    }
    assert_eq!(response.query.similarity_threshold, 0.8);
}

// ============================================================================
// SCENARIO E: Semantic entity types
// ============================================================================

#[tokio::test]
async fn semantic_rejects_full_search_entity_types() {
    let env = TestSearchEnv::seeded();
    let engine = env.engine();

    let mut params = SemanticParams::new("climate finance");
    params.entity_types = Some(vec!["dossiers".to_string()]);
    let err = engine.semantic_search(&anonymous(), &params).await.unwrap_err();

    assert_eq!(err.status_code(), 400);
    assert!(err.message().contains("positions, documents, briefs"));
    assert!(err.message_ar().contains("positions, documents, briefs"));
}

// ============================================================================
// FILTERING
// ============================================================================

#[tokio::test]
async fn archived_documents_need_opt_in() {
    let env = TestSearchEnv::seeded();
    let engine = env.engine();
    let archived = env.corpus.id("archived-position");

    let default = engine
        .search(&anonymous(), &SearchParams::new("superseded"))
        .await
        .unwrap();
    assert!(default.results.iter().all(|r| r.id != archived));

    let mut params = SearchParams::new("superseded");
    params.include_archived = true;
    let opted_in = engine.search(&anonymous(), &params).await.unwrap();
    assert!(opted_in.results.iter().any(|r| r.id == archived && r.is_archived));
}

#[tokio::test]
async fn restricted_documents_counted_not_shown() {
    let env = TestSearchEnv::seeded();
    let engine = env.engine();
    let restricted = env.corpus.id("restricted-document");
    let params = SearchParams::new("negotiation");

    let public = engine.search(&anonymous(), &params).await.unwrap();
    assert!(public.results.iter().all(|r| r.id != restricted));
    assert_eq!(public.counts.restricted, 1);
    let metadata = public.metadata.unwrap();
    assert!(metadata.restricted_message.is_some());

    let cleared = engine
        .search(&Caller::new("analyst", RESTRICTED_LEVEL), &params)
        .await
        .unwrap();
    assert!(cleared.results.iter().any(|r| r.id == restricted));
    assert_eq!(cleared.counts.restricted, 0);
}

#[tokio::test]
async fn type_filter_limits_results_and_counts() {
    let env = TestSearchEnv::seeded();
    let engine = env.engine();

    let response = engine
        .search(
            &anonymous(),
            &SearchParams::new("climate").with_types(vec![EntityType::Position]),
        )
        .await
        .unwrap();

    assert!(!response.results.is_empty());
    assert!(response.results.iter().all(|r| r.entity_type == EntityType::Position));
    assert_eq!(response.counts.dossiers, 0);
    assert_eq!(response.counts.positions, response.counts.total);
}

#[tokio::test]
async fn boolean_query_excludes_negated_terms() {
    let env = TestSearchEnv::seeded();
    let engine = env.engine();

    let response = engine
        .search(&anonymous(), &SearchParams::new("climate NOT finance"))
        .await
        .unwrap();

    assert!(response.query.has_boolean_operators);
    assert!(!response.results.is_empty());
    for result in &response.results {
        assert_ne!(result.id, env.corpus.id("climate-position"));
        assert_ne!(result.id, env.corpus.id("climate-dossier"));
    }
}

#[tokio::test]
async fn phrase_query_requires_adjacency() {
    let env = TestSearchEnv::seeded();
    let engine = env.engine();

    let response = engine
        .search(&anonymous(), &SearchParams::new("\"water security\""))
        .await
        .unwrap();

    let ids: Vec<_> = response.results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![env.corpus.id("water-document")]);
    let snippet = response.results[0].snippet_en.as_deref().unwrap();
    assert!(snippet.contains("<mark>water</mark> <mark>security</mark>") || snippet.contains("<mark>Water</mark> <mark>Security</mark>"));
}

// ============================================================================
// TYPEAHEAD
// ============================================================================

#[tokio::test]
async fn typeahead_matches_title_prefixes_in_both_languages() {
    let env = TestSearchEnv::seeded();
    let engine = env.engine();

    let english = engine
        .suggest(&anonymous(), &SuggestParams::new("clim"))
        .await
        .unwrap();
    assert!(!english.suggestions.is_empty());
    assert!(
        english
            .suggestions
            .iter()
            .all(|s| s.title_en.to_lowercase().contains("clim"))
    );
    // Archived documents never suggested
    assert!(
        english
            .suggestions
            .iter()
            .all(|s| s.id != env.corpus.id("archived-position"))
    );

    let arabic = engine
        .suggest(&anonymous(), &SuggestParams::new("وزي"))
        .await
        .unwrap();
    assert_eq!(arabic.query.language_detected, Language::Ar);
    assert!(
        arabic
            .suggestions
            .iter()
            .any(|s| s.id == env.corpus.id("minister-person"))
    );
}

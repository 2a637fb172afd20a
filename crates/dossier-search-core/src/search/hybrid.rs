//! Hybrid Merge (Exact + Semantic)
//!
//! Combines keyword ("exact") hits with semantic hits for the semantic
//! endpoint. Lexical rank and cosine similarity live on different scales, so
//! each list is rescaled into its own band above the similarity threshold `t`:
//!
//! ```text
//! t ........ split - gap | split | split + gap ........ 1
//!   semantic band                  exact band
//! ```
//!
//! with `split = t + (1 - t) / 2` and `gap = (1 - t) / 100`. The bands never
//! overlap, so any exact match outranks every semantic match.

use std::collections::HashSet;

use uuid::Uuid;

use crate::model::{MatchType, SearchResult, SemanticResult, compare_ranked};

/// Below this band width the bands are treated as collapsed (`t` = 1)
const COLLAPSED_WIDTH: f32 = 1e-6;

/// Fraction of the band width kept empty on each side of the split
const GAP_FRACTION: f32 = 0.01;

// ============================================================================
// SCORE BANDS
// ============================================================================

fn split_point(threshold: f32) -> (f32, f32) {
    let t = threshold.clamp(0.0, 1.0);
    let width = 1.0 - t;
    (t + width / 2.0, width * GAP_FRACTION)
}

/// Map a similarity in `[t, 1]` into the semantic band `[t, split - gap]`
pub fn semantic_band(similarity: f32, threshold: f32) -> f32 {
    let t = threshold.clamp(0.0, 1.0);
    let width = 1.0 - t;
    if width < COLLAPSED_WIDTH {
        return t;
    }
    let (split, gap) = split_point(t);
    let fraction = ((similarity - t) / width).clamp(0.0, 1.0);
    t + fraction * (split - gap - t)
}

/// Map a lexical rank in `[0, 1]` into the exact band `[split + gap, 1]`
pub fn exact_band(rank_score: f32, threshold: f32) -> f32 {
    let t = threshold.clamp(0.0, 1.0);
    if 1.0 - t < COLLAPSED_WIDTH {
        return 1.0;
    }
    let (split, gap) = split_point(t);
    let low = split + gap;
    low + rank_score.clamp(0.0, 1.0) * (1.0 - low)
}

// ============================================================================
// MERGE
// ============================================================================

/// Output of a hybrid merge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HybridMerge {
    /// Keyword hits, rescaled into the exact band
    pub exact_matches: Vec<SemanticResult>,
    /// Semantic hits not already present in `exact_matches`
    pub results: Vec<SemanticResult>,
}

/// Merge keyword hits and semantic hits.
///
/// - An id present in `exact_matches` never appears in `results`.
/// - Exact hits the vector search also returned are marked [`MatchType::Hybrid`].
/// - Both lists are sorted by score, then `updated_at` descending, then id,
///   and cut to `limit`.
pub fn merge(
    exact: &[SearchResult],
    semantic: &[SemanticResult],
    threshold: f32,
    limit: usize,
) -> HybridMerge {
    let semantic_ids: HashSet<Uuid> = semantic.iter().map(|r| r.id).collect();
    let exact_ids: HashSet<Uuid> = exact.iter().map(|r| r.id).collect();

    let mut exact_matches: Vec<SemanticResult> = exact
        .iter()
        .map(|hit| {
            let mut result = SemanticResult::exact_from(hit, exact_band(hit.rank_score, threshold));
            if semantic_ids.contains(&hit.id) {
                result.match_type = MatchType::Hybrid;
            }
            result
        })
        .collect();

    let collapsed = 1.0 - threshold.clamp(0.0, 1.0) < COLLAPSED_WIDTH;
    let mut results: Vec<SemanticResult> = if collapsed && !exact_matches.is_empty() {
        // No room below the exact band
        Vec::new()
    } else {
        semantic
            .iter()
            .filter(|r| !exact_ids.contains(&r.id))
            .map(|r| {
                let mut result = r.clone();
                result.similarity_score = semantic_band(r.similarity_score, threshold);
                result.match_type = MatchType::Semantic;
                result
            })
            .collect()
    };

    sort_by_score(&mut exact_matches);
    sort_by_score(&mut results);
    exact_matches.truncate(limit);
    results.truncate(limit);

    tracing::debug!(
        exact = exact_matches.len(),
        semantic = results.len(),
        dropped_duplicates = semantic.len().saturating_sub(results.len()),
        "Hybrid merge complete"
    );

    HybridMerge {
        exact_matches,
        results,
    }
}

fn sort_by_score(results: &mut [SemanticResult]) {
    results.sort_by(|a, b| {
        compare_ranked(
            (a.similarity_score, a.updated_at, a.id),
            (b.similarity_score, b.updated_at, b.id),
        )
    });
}

// ============================================================================
// TESTS
// ============================================================================

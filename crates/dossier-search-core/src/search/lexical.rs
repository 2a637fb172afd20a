//! Lexical (keyword) search
//!
//! Candidate documents come from the store's term index. Boolean evaluation,
//! scoring and snippet extraction happen here, on analyzed fields, so that
//! phrases, negation and stemming behave the same for every backend.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::model::{
    Document, EntityType, Language, ResultCounts, SearchResult, Suggestion, TypoCorrection,
    compare_ranked,
};
use crate::query::{BooleanExpr, Query};
use crate::storage::{
    DocumentQuery, PrefixQuery, SearchStore, StemClause, StoreError, with_timeout,
};

use super::snippet::{AnalyzedField, build_snippet, preview};
use super::stem::{analyze, forms, stems};
use super::typo::closest_word;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for lexical search
#[derive(Debug, Clone)]
pub struct LexicalConfig {
    /// Weight of a title occurrence
    pub title_weight: f32,
    /// Weight of a body occurrence
    pub body_weight: f32,
    /// Raw score at which `rank_score` reaches 0.5
    pub saturation: f32,
    /// Snippet window in characters
    pub snippet_window: usize,
    /// Suggestion preview length in characters
    pub preview_chars: usize,
    /// Maximum matches considered per query; also the store page size
    pub raw_result_cap: usize,
    /// Per-call store timeout
    pub store_timeout: Duration,
    /// Shortest typed word that gets typo-tolerant suggestions
    pub typo_min_chars: usize,
    /// Minimum edit-distance similarity of a typo correction
    pub typo_min_similarity: f32,
    /// Row cap of the typo-tolerant lookup
    pub typo_row_cap: usize,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            title_weight: 3.0,
            body_weight: 1.0,
            saturation: 2.0,
            snippet_window: 160,
            preview_chars: 100,
            raw_result_cap: 1000,
            store_timeout: Duration::from_millis(150),
            typo_min_chars: 4,
            typo_min_similarity: 0.75,
            typo_row_cap: 100,
        }
    }
}

/// One page of keyword results
#[derive(Debug, Clone, Default)]
pub struct LexicalPage {
    pub results: Vec<SearchResult>,
    /// Matches per entity type across all pages
    pub counts: ResultCounts,
    /// Set when more matches exist than the raw result cap
    pub capped: bool,
}

// ============================================================================
// EXECUTOR
// ============================================================================

/// Keyword search over the searchable store
pub struct LexicalSearchExecutor {
    store: Arc<dyn SearchStore>,
    config: LexicalConfig,
}

impl LexicalSearchExecutor {
    pub fn new(store: Arc<dyn SearchStore>, config: LexicalConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LexicalConfig {
        &self.config
    }

    /// Evaluate `expr` against documents of `entity_types`.
    ///
    /// Results are ordered by `rank_score` descending, then `updated_at`
    /// descending, then id. `counts` covers every match, not just the page.
    pub async fn search(
        &self,
        expr: &BooleanExpr,
        entity_types: &[EntityType],
        limit: usize,
        offset: usize,
        include_archived: bool,
    ) -> Result<LexicalPage, StoreError> {
        let terms = TermSet::new(expr);
        let clause = match terms.prefilter(expr) {
            // Nothing indexable in the query, so nothing can match
            Prefilter::Nothing => return Ok(LexicalPage::default()),
            Prefilter::Everything => None,
            Prefilter::Clause(clause) => Some(clause),
        };

        let cap = self.config.raw_result_cap.max(1);
        let mut page_query = DocumentQuery {
            entity_types: entity_types.to_vec(),
            clause,
            include_archived,
            limit: cap,
            offset: 0,
        };

        // Page through candidates until the cap is reached on matches
        let scan = async {
            let mut matches: Vec<SearchResult> = Vec::new();
            let mut scanned = 0;
            loop {
                let page = self.store.candidates(&page_query).await?;
                let fetched = page.len();
                scanned += fetched;
                matches.extend(
                    page.iter()
                        .filter_map(|doc| self.score_document(doc, expr, &terms)),
                );
                if fetched < page_query.limit {
                    return Ok::<_, StoreError>((matches, scanned, false));
                }
                if matches.len() >= cap {
                    return Ok((matches, scanned, true));
                }
                page_query.offset += fetched;
            }
        };
        let (mut matches, scanned, more_pages) =
            with_timeout(self.config.store_timeout, scan).await?;
        let capped = matches.len() > cap || more_pages;
        matches.truncate(cap);

        let mut counts = ResultCounts::default();
        for result in &matches {
            counts.record(result.entity_type);
        }

        matches.sort_by(|a, b| {
            compare_ranked(
                (a.rank_score, a.updated_at, a.id),
                (b.rank_score, b.updated_at, b.id),
            )
        });

        tracing::debug!(
            scanned,
            matches = matches.len(),
            capped,
            "Lexical search evaluated"
        );

        let results = matches.into_iter().skip(offset).take(limit).collect();
        Ok(LexicalPage {
            results,
            counts,
            capped,
        })
    }

    /// Evaluate and score one document; `None` if it does not match
    fn score_document(
        &self,
        doc: &Document,
        expr: &BooleanExpr,
        terms: &TermSet,
    ) -> Option<SearchResult> {
        let fields = DocumentFields::new(doc);

        let matched = expr.evaluate(&|term: &str| {
            terms
                .stems_of(term)
                .is_some_and(|seq| fields.all().any(|f| !f.occurrences(seq).is_empty()))
        });
        if !matched {
            return None;
        }

        let mut raw = 0.0_f32;
        for seq in &terms.positive_sequences {
            let title_tf: usize = fields.titles().map(|f| f.occurrences(seq).len()).sum();
            let body_tf: usize = fields.bodies().map(|f| f.occurrences(seq).len()).sum();
            raw += self.config.title_weight * title_tf as f32
                + self.config.body_weight * body_tf as f32;
        }
        let rank_score = raw / (raw + self.config.saturation);

        let window = self.config.snippet_window;
        let snippet_for = |title: &AnalyzedField<'_>, body: &AnalyzedField<'_>| {
            let body_mask = body.highlight_mask(&terms.positive_sequences);
            build_snippet(body, &body_mask, window).or_else(|| {
                let title_mask = title.highlight_mask(&terms.positive_sequences);
                build_snippet(title, &title_mask, window)
            })
        };
        let snippet_en = snippet_for(&fields.title_en, &fields.body_en);
        let snippet_ar = snippet_for(&fields.title_ar, &fields.body_ar);

        Some(SearchResult::from_document(
            doc, rank_score, snippet_en, snippet_ar,
        ))
    }

    // ========================================================================
    // PREFIX MODE
    // ========================================================================

    /// Typeahead lookup: title prefix match with a hard row cap.
    ///
    /// The last word of the query is a prefix; earlier words must appear in
    /// full. `language` picks which title is checked first for the match
    /// position. When fewer than `row_cap` titles match, titles with a word
    /// close to the typed one are appended, each carrying its correction.
    pub async fn suggest(
        &self,
        query: &Query,
        entity_types: &[EntityType],
        language: Language,
        row_cap: usize,
        timeout: Duration,
    ) -> Result<Vec<Suggestion>, StoreError> {
        let deadline = Instant::now() + timeout;
        let mut words = forms(&query.normalized);
        let Some(prefix) = words.pop() else {
            return Ok(Vec::new());
        };

        let prefix_query = PrefixQuery {
            entity_types: entity_types.to_vec(),
            words,
            prefix,
            limit: row_cap,
        };
        let docs = with_timeout(timeout, self.store.prefix_lookup(&prefix_query)).await?;

        let mut ranked: Vec<(Suggestion, chrono::DateTime<chrono::Utc>)> = docs
            .iter()
            .map(|doc| {
                let suggestion = self.build_suggestion(doc, &prefix_query.prefix, language);
                (suggestion, doc.updated_at)
            })
            .collect();
        ranked.sort_by(|(a, a_updated), (b, b_updated)| {
            compare_ranked((a.score, *a_updated, a.id), (b.score, *b_updated, b.id))
        });
        let mut suggestions: Vec<Suggestion> = ranked.into_iter().map(|(s, _)| s).collect();
        suggestions.truncate(row_cap);

        if suggestions.len() < row_cap
            && prefix_query.prefix.chars().count() >= self.config.typo_min_chars
        {
            let budget = deadline.saturating_duration_since(Instant::now());
            let corrected = self
                .typo_suggestions(query, &prefix_query, language, &suggestions, budget)
                .await;
            suggestions.extend(corrected.into_iter().take(row_cap - suggestions.len()));
        }
        Ok(suggestions)
    }

    /// Titles whose words are within edit distance of the typed word.
    ///
    /// Candidates share the typed word's first two characters. Failures only
    /// cost the extra suggestions.
    async fn typo_suggestions(
        &self,
        query: &Query,
        exact: &PrefixQuery,
        language: Language,
        already: &[Suggestion],
        budget: Duration,
    ) -> Vec<Suggestion> {
        if budget.is_zero() {
            return Vec::new();
        }
        let anchor: String = exact.prefix.chars().take(2).collect();
        let lookup = PrefixQuery {
            prefix: anchor,
            limit: self.config.typo_row_cap,
            ..exact.clone()
        };
        let docs = match with_timeout(budget, self.store.prefix_lookup(&lookup)).await {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!(error = %e, "Typo-tolerant lookup failed, returning prefix matches only");
                return Vec::new();
            }
        };

        let seen: HashSet<_> = already.iter().map(|s| s.id).collect();
        let mut ranked: Vec<(Suggestion, chrono::DateTime<chrono::Utc>)> = docs
            .iter()
            .filter(|doc| !seen.contains(&doc.id))
            .filter_map(|doc| {
                let titles = if language == Language::Ar {
                    [&doc.title_ar, &doc.title_en]
                } else {
                    [&doc.title_en, &doc.title_ar]
                };
                let found = titles
                    .iter()
                    .filter_map(|title| {
                        closest_word(title, &exact.prefix, self.config.typo_min_similarity)
                    })
                    .reduce(|a, b| if b.similarity > a.similarity { b } else { a })?;

                let mut corrected_words = exact.words.clone();
                corrected_words.push(found.word);
                let mut suggestion = self.build_suggestion(doc, &exact.prefix, language);
                // Below every prefix match
                suggestion.score = 0.4 * found.similarity;
                suggestion.match_position = Some(found.position);
                suggestion.typo_correction = Some(TypoCorrection {
                    original: query.normalized.clone(),
                    corrected: corrected_words.join(" "),
                    similarity_score: found.similarity,
                });
                Some((suggestion, doc.updated_at))
            })
            .collect();
        ranked.sort_by(|(a, a_updated), (b, b_updated)| {
            compare_ranked((a.score, *a_updated, a.id), (b.score, *b_updated, b.id))
        });

        tracing::debug!(
            candidates = docs.len(),
            corrected = ranked.len(),
            "Typo-tolerant suggestions"
        );
        ranked.into_iter().map(|(s, _)| s).collect()
    }

    fn build_suggestion(&self, doc: &Document, prefix: &str, language: Language) -> Suggestion {
        let titles = if language == Language::Ar {
            [&doc.title_ar, &doc.title_en]
        } else {
            [&doc.title_en, &doc.title_ar]
        };

        let (score, match_position) = titles
            .iter()
            .find_map(|title| prefix_match(title, prefix))
            .map_or((0.0, None), |(score, position)| (score, Some(position)));

        Suggestion {
            id: doc.id,
            entity_type: doc.entity_type,
            title_en: doc.title_en.clone(),
            title_ar: doc.title_ar.clone(),
            score,
            preview_en: preview(&doc.body_en, self.config.preview_chars),
            preview_ar: preview(&doc.body_ar, self.config.preview_chars),
            match_position,
            typo_correction: None,
            classification_level: doc.classification_level,
        }
    }
}

/// Score a title against a prefix: `(score, char position of the matching word)`.
///
/// A match on the first word scores highest; completing more of the word
/// scores higher; later words lose a little per position.
fn prefix_match(title: &str, prefix: &str) -> Option<(f32, usize)> {
    let tokens = analyze(title);
    let (index, token) = tokens
        .iter()
        .enumerate()
        .find(|(_, t)| t.form.starts_with(prefix))?;

    let completion = prefix.chars().count() as f32 / token.form.chars().count().max(1) as f32;
    let score = if index == 0 {
        0.9 + 0.1 * completion
    } else {
        0.6 + 0.2 * completion - 0.02 * index.min(10) as f32
    };
    let position = title[..token.start].chars().count();
    Some((score.clamp(0.0, 1.0), position))
}

// ============================================================================
// ANALYSIS HELPERS
// ============================================================================

/// What the term index can rule out before evaluation
#[derive(Debug, PartialEq)]
enum Prefilter {
    Everything,
    Nothing,
    Clause(StemClause),
}

/// Query terms mapped to stem sequences
struct TermSet {
    sequences: HashMap<String, Vec<String>>,
    positive_sequences: Vec<Vec<String>>,
}

impl TermSet {
    fn new(expr: &BooleanExpr) -> Self {
        let sequences: HashMap<String, Vec<String>> = expr
            .terms()
            .into_iter()
            .map(|t| (t.to_string(), stems(t)))
            .collect();

        let mut positive_sequences: Vec<Vec<String>> = Vec::new();
        for term in expr.positive_terms() {
            if let Some(seq) = sequences.get(term) {
                if !seq.is_empty() && !positive_sequences.contains(seq) {
                    positive_sequences.push(seq.clone());
                }
            }
        }

        Self {
            sequences,
            positive_sequences,
        }
    }

    /// Stem condition implied by `expr`.
    ///
    /// Every document the expression matches satisfies the clause. Phrases
    /// only require their stems; adjacency is checked on evaluation.
    fn prefilter(&self, expr: &BooleanExpr) -> Prefilter {
        match expr {
            BooleanExpr::Term(term) => match self.stems_of(term) {
                Some(seq) => Prefilter::Clause(StemClause::All(seq.to_vec())),
                None => Prefilter::Nothing,
            },
            BooleanExpr::And(l, r) => match (self.prefilter(l), self.prefilter(r)) {
                (Prefilter::Nothing, _) | (_, Prefilter::Nothing) => Prefilter::Nothing,
                (Prefilter::Everything, other) | (other, Prefilter::Everything) => other,
                (Prefilter::Clause(a), Prefilter::Clause(b)) => {
                    Prefilter::Clause(StemClause::and(a, b))
                }
            },
            BooleanExpr::Or(l, r) => match (self.prefilter(l), self.prefilter(r)) {
                (Prefilter::Everything, _) | (_, Prefilter::Everything) => Prefilter::Everything,
                (Prefilter::Nothing, other) | (other, Prefilter::Nothing) => other,
                (Prefilter::Clause(a), Prefilter::Clause(b)) => {
                    Prefilter::Clause(StemClause::or(a, b))
                }
            },
            // Negation only excludes
            BooleanExpr::Not(_) => Prefilter::Everything,
        }
    }

    /// Stem sequence of a term, `None` if the term has no indexable tokens
    fn stems_of(&self, term: &str) -> Option<&[String]> {
        self.sequences
            .get(term)
            .filter(|seq| !seq.is_empty())
            .map(Vec::as_slice)
    }
}

/// The four searchable fields of a document, analyzed once
struct DocumentFields<'a> {
    title_en: AnalyzedField<'a>,
    title_ar: AnalyzedField<'a>,
    body_en: AnalyzedField<'a>,
    body_ar: AnalyzedField<'a>,
}

impl<'a> DocumentFields<'a> {
    fn new(doc: &'a Document) -> Self {
        Self {
            title_en: AnalyzedField::new(&doc.title_en),
            title_ar: AnalyzedField::new(&doc.title_ar),
            body_en: AnalyzedField::new(&doc.body_en),
            body_ar: AnalyzedField::new(&doc.body_ar),
        }
    }

    fn titles(&self) -> impl Iterator<Item = &AnalyzedField<'a>> {
        [&self.title_en, &self.title_ar].into_iter()
    }

    fn bodies(&self) -> impl Iterator<Item = &AnalyzedField<'a>> {
        [&self.body_en, &self.body_ar].into_iter()
    }

    fn all(&self) -> impl Iterator<Item = &AnalyzedField<'a>> {
        self.titles().chain(self.bodies())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_expression;
    use crate::storage::SqliteStore;
    use chrono::{Duration as ChronoDuration, Utc};
    use tempfile::tempdir;

    fn create_executor(docs: &[Document]) -> (LexicalSearchExecutor, tempfile::TempDir) {
        create_capped_executor(docs, LexicalConfig::default().raw_result_cap)
    }

    fn create_capped_executor(
        docs: &[Document],
        raw_result_cap: usize,
    ) -> (LexicalSearchExecutor, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(Some(dir.path().join("test.db"))).unwrap();
        for doc in docs {
            store.upsert_document(doc).unwrap();
        }
        let config = LexicalConfig {
            store_timeout: Duration::from_secs(5),
            raw_result_cap,
            ..Default::default()
        };
        (LexicalSearchExecutor::new(Arc::new(store), config), dir)
    }

    /// `count` documents newer than anything else, titled `title N`
    fn newer_docs(count: usize, title: &str, body: &str) -> Vec<Document> {
        let now = Utc::now();
        (0..count)
            .map(|i| {
                Document::new(EntityType::Document, format!("{} {}", title, i), body)
                    .updated(now - ChronoDuration::seconds(i as i64))
            })
            .collect()
    }

    async fn run(executor: &LexicalSearchExecutor, query: &str) -> LexicalPage {
        let expr = parse_expression(query).unwrap();
        executor
            .search(&expr, &EntityType::FULL_SEARCH, 20, 0, false)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_boolean_semantics() {
        let a = Document::new(EntityType::Position, "Climate policy", "");
        let b = Document::new(EntityType::Position, "Climate treaty", "");
        let c = Document::new(EntityType::Position, "Trade policy", "");
        let (executor, _dir) = create_executor(&[a.clone(), b.clone(), c.clone()]);

        let page = run(&executor, "climate AND (policy OR treaty)").await;
        let mut ids: Vec<_> = page.results.iter().map(|r| r.id).collect();
        ids.sort();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(ids, expected);

        let page = run(&executor, "policy NOT climate").await;
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].id, c.id);

        let page = run(&executor, "NOT climate").await;
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].id, c.id);
    }

    #[tokio::test]
    async fn test_title_outweighs_body() {
        let now = Utc::now();
        let in_body = Document::new(EntityType::Dossier, "Annual review", "climate").updated(now);
        let in_title = Document::new(EntityType::Dossier, "Climate", "review")
            .updated(now - ChronoDuration::days(30));
        let (executor, _dir) = create_executor(&[in_body.clone(), in_title.clone()]);

        let page = run(&executor, "climate").await;
        assert_eq!(page.results[0].id, in_title.id);
        assert!(page.results[0].rank_score > page.results[1].rank_score);
        for r in &page.results {
            assert!((0.0..=1.0).contains(&r.rank_score));
        }
    }

    #[tokio::test]
    async fn test_ties_break_on_updated_at() {
        let now = Utc::now();
        let older = Document::new(EntityType::Mou, "Water MoU", "").updated(now - ChronoDuration::days(1));
        let newer = Document::new(EntityType::Mou, "Energy MoU", "").updated(now);
        let (executor, _dir) = create_executor(&[older.clone(), newer.clone()]);

        let page = run(&executor, "mou").await;
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].rank_score, page.results[1].rank_score);
        assert_eq!(page.results[0].id, newer.id);
    }

    #[tokio::test]
    async fn test_phrase_requires_adjacency() {
        let adjacent = Document::new(EntityType::Document, "Climate policy brief", "");
        let apart = Document::new(EntityType::Document, "Policy on climate", "");
        let (executor, _dir) = create_executor(&[adjacent.clone(), apart]);

        let page = run(&executor, "\"climate policy\"").await;
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].id, adjacent.id);
    }

    #[tokio::test]
    async fn test_snippets_per_language() {
        let doc = Document::new(EntityType::Position, "Energy", "Our climate commitments")
            .with_arabic("الطاقة", "سياسة المناخ الوطنية");
        let (executor, _dir) = create_executor(&[doc]);

        let page = run(&executor, "climate").await;
        let result = &page.results[0];
        assert_eq!(
            result.snippet_en.as_deref(),
            Some("Our <mark>climate</mark> commitments")
        );
        assert!(result.snippet_ar.is_none());

        let page = run(&executor, "مناخ").await;
        assert!(page.results[0].snippet_ar.as_ref().unwrap().contains("<mark>"));
        assert!(page.results[0].snippet_en.is_none());
    }

    #[tokio::test]
    async fn test_counts_and_pagination() {
        let docs: Vec<Document> = (0..5)
            .map(|i| Document::new(EntityType::Engagement, format!("Summit {}", i), ""))
            .chain(std::iter::once(Document::new(EntityType::Person, "Summit host", "")))
            .collect();
        let (executor, _dir) = create_executor(&docs);

        let expr = parse_expression("summit").unwrap();
        let page = executor
            .search(&expr, &EntityType::FULL_SEARCH, 2, 2, false)
            .await
            .unwrap();
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.counts.total, 6);
        assert_eq!(page.counts.engagements, 5);
        assert_eq!(page.counts.people, 1);
        assert!(!page.capped);
    }

    #[tokio::test]
    async fn test_old_match_found_behind_many_partial_matches() {
        let old = Document::new(EntityType::Dossier, "Climate finance dossier", "")
            .updated(Utc::now() - ChronoDuration::days(30));
        let mut docs = newer_docs(60, "Climate note", "Climate only");
        docs.push(old.clone());
        let (executor, _dir) = create_capped_executor(&docs, 25);

        let page = run(&executor, "climate AND finance").await;
        assert_eq!(page.counts.total, 1);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].id, old.id);
        assert!(!page.capped);
    }

    #[tokio::test]
    async fn test_phrase_match_beyond_first_page() {
        let adjacent = Document::new(EntityType::Dossier, "Climate policy brief", "")
            .updated(Utc::now() - ChronoDuration::days(30));
        let mut docs = newer_docs(60, "Policy on climate", "");
        docs.push(adjacent.clone());
        let (executor, _dir) = create_capped_executor(&docs, 25);

        let page = run(&executor, "\"climate policy\"").await;
        assert_eq!(page.counts.total, 1);
        assert_eq!(page.results[0].id, adjacent.id);
    }

    #[tokio::test]
    async fn test_negation_sees_whole_corpus() {
        let trade = Document::new(EntityType::Dossier, "Trade agreement", "")
            .updated(Utc::now() - ChronoDuration::days(30));
        let mut docs = newer_docs(60, "Climate note", "");
        docs.push(trade.clone());
        let (executor, _dir) = create_capped_executor(&docs, 25);

        let page = run(&executor, "NOT climate").await;
        assert_eq!(page.counts.total, 1);
        assert_eq!(page.results[0].id, trade.id);
    }

    #[tokio::test]
    async fn test_cap_applies_to_matches() {
        let docs = newer_docs(40, "Summit", "");
        let (executor, _dir) = create_capped_executor(&docs, 25);

        let page = run(&executor, "summit").await;
        assert!(page.capped);
        assert_eq!(page.counts.total, 25);

        let (executor, _dir) = create_capped_executor(&docs, 100);
        let page = run(&executor, "summit").await;
        assert!(!page.capped);
        assert_eq!(page.counts.total, 40);
    }

    #[test]
    fn test_prefilter_shapes() {
        let prefilter = |query: &str| {
            let expr = parse_expression(query).unwrap();
            TermSet::new(&expr).prefilter(&expr)
        };
        let all = |stems: &[&str]| StemClause::All(stems.iter().map(|s| s.to_string()).collect());

        assert_eq!(
            prefilter("climate AND finance"),
            Prefilter::Clause(StemClause::and(all(&["climate"]), all(&["finance"])))
        );
        assert_eq!(
            prefilter("\"climate policy\""),
            Prefilter::Clause(all(&["climate", "policy"]))
        );
        assert_eq!(prefilter("climate NOT trade"), Prefilter::Clause(all(&["climate"])));
        assert_eq!(prefilter("NOT climate"), Prefilter::Everything);
        assert_eq!(prefilter("climate OR NOT trade"), Prefilter::Everything);
        assert_eq!(prefilter("???"), Prefilter::Nothing);
        assert_eq!(prefilter("??? OR climate"), Prefilter::Clause(all(&["climate"])));
    }

    #[tokio::test]
    async fn test_unindexable_query_matches_nothing() {
        let (executor, _dir) = create_executor(&[Document::new(EntityType::Dossier, "Climate", "")]);
        let page = run(&executor, "???").await;
        assert!(page.results.is_empty());
        assert_eq!(page.counts.total, 0);
    }

    #[tokio::test]
    async fn test_deterministic_ordering() {
        let now = Utc::now();
        let docs: Vec<Document> = (0..10)
            .map(|_| Document::new(EntityType::Document, "Climate report", "").updated(now))
            .collect();
        let (executor, _dir) = create_executor(&docs);

        let first = run(&executor, "climate").await;
        let second = run(&executor, "climate").await;
        let ids = |p: &LexicalPage| p.results.iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        // Equal score and time fall back to id order
        let sorted = {
            let mut v = ids(&first);
            v.sort();
            v
        };
        assert_eq!(ids(&first), sorted);
    }

    #[tokio::test]
    async fn test_suggest_prefix() {
        let climate = Document::new(EntityType::Dossier, "Climate Action", "A body of text");
        let later = Document::new(EntityType::Dossier, "National climate plan", "");
        let (executor, _dir) = create_executor(&[climate.clone(), later.clone()]);

        let query = Query::parse_prefix("cli", 100).unwrap();
        let suggestions = executor
            .suggest(&query, &EntityType::FULL_SEARCH, Language::En, 20, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].id, climate.id);
        assert_eq!(suggestions[0].match_position, Some(0));
        assert_eq!(suggestions[1].match_position, Some(9));
        assert!(suggestions[0].score > suggestions[1].score);
        assert_eq!(suggestions[0].preview_en.as_deref(), Some("A body of text"));
    }

    async fn suggest(executor: &LexicalSearchExecutor, typed: &str) -> Vec<Suggestion> {
        let query = Query::parse_prefix(typed, 100).unwrap();
        executor
            .suggest(&query, &EntityType::FULL_SEARCH, Language::En, 20, Duration::from_secs(5))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_suggest_corrects_typos() {
        let climate = Document::new(EntityType::Dossier, "Climate Action", "");
        let water = Document::new(EntityType::Document, "Water Security Strategy", "");
        let clean = Document::new(EntityType::Dossier, "Clean energy", "");
        let (executor, _dir) = create_executor(&[climate.clone(), water.clone(), clean]);

        let suggestions = suggest(&executor, "clmat").await;
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].id, climate.id);
        assert_eq!(suggestions[0].match_position, Some(0));
        let correction = suggestions[0].typo_correction.as_ref().unwrap();
        assert_eq!(correction.original, "clmat");
        assert_eq!(correction.corrected, "climate");
        assert!(correction.similarity_score >= 0.75 && correction.similarity_score < 1.0);

        // Completed words are kept in the correction
        let suggestions = suggest(&executor, "water secrity").await;
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].id, water.id);
        assert_eq!(
            suggestions[0].typo_correction.as_ref().unwrap().corrected,
            "water security"
        );
    }

    #[tokio::test]
    async fn test_typo_matches_follow_prefix_matches() {
        let climbing = Document::new(EntityType::Document, "Climbing report", "");
        let climate = Document::new(EntityType::Document, "Climate Action", "");
        let (executor, _dir) = create_executor(&[climbing.clone(), climate.clone()]);

        let suggestions = suggest(&executor, "climb").await;
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].id, climbing.id);
        assert!(suggestions[0].typo_correction.is_none());
        assert_eq!(suggestions[1].id, climate.id);
        assert!(suggestions[1].typo_correction.is_some());
        assert!(suggestions[0].score > suggestions[1].score);
    }

    #[tokio::test]
    async fn test_short_input_is_not_corrected() {
        let (executor, _dir) =
            create_executor(&[Document::new(EntityType::Document, "Warsaw summit", "")]);
        assert!(suggest(&executor, "wat").await.is_empty());
    }

    #[tokio::test]
    async fn test_suggest_arabic_prefix() {
        let doc = Document::new(EntityType::Position, "Climate", "").with_arabic("المناخ العالمي", "");
        let (executor, _dir) = create_executor(&[doc.clone()]);

        let query = Query::parse_prefix("المنا", 100).unwrap();
        let suggestions = executor
            .suggest(&query, &EntityType::FULL_SEARCH, Language::Ar, 20, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].match_position, Some(0));
    }
}

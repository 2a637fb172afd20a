//! Search Module
//!
//! The executors and the pieces they share:
//! - Bilingual analysis (tokenizing, index forms, light stemming)
//! - Lexical search with Boolean evaluation and highlighted snippets
//! - Typo-tolerant typeahead matching
//! - Semantic search over stored embeddings
//! - Hybrid merging of exact and semantic matches into disjoint score bands

mod hybrid;
mod lexical;
mod semantic;
mod snippet;
mod stem;
mod typo;

pub use stem::{AnalyzedToken, analyze, forms, stem, stems};

pub use snippet::{AnalyzedField, build_snippet, escape_html, preview};

pub use typo::{WordMatch, closest_word, edit_distance, similarity};

pub use lexical::{LexicalConfig, LexicalPage, LexicalSearchExecutor};

pub use semantic::{SemanticConfig, SemanticError, SemanticOutcome, SemanticSearchExecutor};

pub use hybrid::{HybridMerge, exact_band, merge, semantic_band};

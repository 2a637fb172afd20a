//! Query Module
//!
//! Turns raw query text into an immutable [`Query`]:
//! - NFKC normalization, control-character stripping, Latin case folding
//! - Script-based language detection (Arabic wins in mixed text)
//! - Boolean AND/OR/NOT grammar with parentheses and quoted phrases
//! - A plain prefix mode for typeahead

mod normalize;
mod parser;

pub use normalize::{detect_language, fold_case, is_arabic_char, normalize, normalize_folded};
pub use parser::{BooleanExpr, has_boolean_operators, parse_expression, parse_plain};

use serde::Serialize;

use crate::model::Language;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Query parsing error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum QueryError {
    /// Nothing left after trimming
    #[error("Query must not be empty")]
    EmptyQuery,
    /// Over the endpoint's length limit
    #[error("Query is {length} characters long; the maximum is {max}")]
    QueryTooLong { length: usize, max: usize },
    /// Malformed Boolean expression
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },
}

impl QueryError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        QueryError::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Arabic rendering of the error
    pub fn message_ar(&self) -> String {
        match self {
            QueryError::EmptyQuery => "يجب ألا يكون الاستعلام فارغاً".to_string(),
            QueryError::QueryTooLong { length, max } => format!(
                "الاستعلام طويل جداً ({} حرفاً)، الحد الأقصى هو {} حرفاً",
                length, max
            ),
            QueryError::Syntax { position, .. } => {
                format!("خطأ في صياغة الاستعلام عند الموضع {}", position)
            }
        }
    }
}

// ============================================================================
// QUERY
// ============================================================================

/// What to do with text over the length limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthPolicy {
    /// Reject with [`QueryError::QueryTooLong`]
    #[default]
    Reject,
    /// Cut to the limit and flag the query as truncated
    Truncate,
}

/// A parsed query. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Raw text as received (after trimming and any truncation)
    pub original: String,
    /// Normalized, case-folded text
    pub normalized: String,
    pub language: Language,
    pub expression: BooleanExpr,
    pub has_boolean_operators: bool,
    /// Set when the text was cut to the length limit
    pub truncated: bool,
}

/// Wire form of a parsed query, echoed back in responses
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryInfo {
    pub original: String,
    pub normalized: String,
    pub language_detected: Language,
    pub has_boolean_operators: bool,
}

impl From<&Query> for QueryInfo {
    fn from(query: &Query) -> Self {
        Self {
            original: query.original.clone(),
            normalized: query.normalized.clone(),
            language_detected: query.language,
            has_boolean_operators: query.has_boolean_operators,
        }
    }
}

impl Query {
    /// Parse with the Boolean grammar, rejecting over-length input
    pub fn parse(raw: &str, max_len: usize) -> Result<Self, QueryError> {
        Self::parse_with_policy(raw, max_len, LengthPolicy::Reject)
    }

    /// Parse with the Boolean grammar and an explicit over-length policy
    pub fn parse_with_policy(
        raw: &str,
        max_len: usize,
        policy: LengthPolicy,
    ) -> Result<Self, QueryError> {
        let (original, truncated) = check_length(raw, max_len, policy)?;
        let text = normalize(&original);
        if text.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let expression = parse_expression(&text)?;

        Ok(Self {
            has_boolean_operators: has_boolean_operators(&text),
            language: detect_language(&text),
            normalized: fold_case(&text),
            original,
            expression,
            truncated,
        })
    }

    /// Parse for typeahead: no operators or grouping, over-length rejected
    pub fn parse_prefix(raw: &str, max_len: usize) -> Result<Self, QueryError> {
        let (original, truncated) = check_length(raw, max_len, LengthPolicy::Reject)?;
        let text = normalize(&original);
        let expression = parse_plain(&text)?;

        Ok(Self {
            has_boolean_operators: false,
            language: detect_language(&text),
            normalized: fold_case(&text),
            original,
            expression,
            truncated,
        })
    }

    pub fn info(&self) -> QueryInfo {
        QueryInfo::from(self)
    }
}

/// Trim and apply the length limit (in characters)
fn check_length(
    raw: &str,
    max_len: usize,
    policy: LengthPolicy,
) -> Result<(String, bool), QueryError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(QueryError::EmptyQuery);
    }

    let length = trimmed.chars().count();
    if length <= max_len {
        return Ok((trimmed.to_string(), false));
    }

    match policy {
        LengthPolicy::Reject => Err(QueryError::QueryTooLong {
            length,
            max: max_len,
        }),
        LengthPolicy::Truncate => {
            let cut: String = trimmed.chars().take(max_len).collect();
            tracing::warn!(length, max_len, "Query truncated to length limit");
            Ok((cut.trim_end().to_string(), true))
        }
    }
}

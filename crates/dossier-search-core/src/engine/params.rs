//! Request parameters and their validation

use serde::Deserialize;

use crate::model::{EntityType, Language};

use super::SearchError;

/// Full search request
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SearchParams {
    pub q: String,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Restrict to these types; all full-search types when absent
    pub entity_types: Option<Vec<EntityType>>,
    #[serde(default)]
    pub include_archived: bool,
}

impl SearchParams {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_types(mut self, entity_types: Vec<EntityType>) -> Self {
        self.entity_types = Some(entity_types);
        self
    }
}

/// Which title language typeahead matches prefer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LangPreference {
    /// Use the detected query language
    #[default]
    Auto,
    En,
    Ar,
}

impl LangPreference {
    /// Concrete language for a query detected as `detected`
    pub fn resolve(&self, detected: Language) -> Language {
        match self {
            LangPreference::En => Language::En,
            LangPreference::Ar => Language::Ar,
            LangPreference::Auto if detected == Language::Ar => Language::Ar,
            LangPreference::Auto => Language::En,
        }
    }
}

impl std::str::FromStr for LangPreference {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "auto" => Ok(LangPreference::Auto),
            "en" => Ok(LangPreference::En),
            "ar" => Ok(LangPreference::Ar),
            other => Err(SearchError::validation(
                format!("Invalid lang '{}'. Allowed: en, ar, auto", other),
                format!("قيمة اللغة '{}' غير صالحة. القيم المسموح بها: en, ar, auto", other),
            )),
        }
    }
}

/// Typeahead request
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SuggestParams {
    pub q: String,
    pub limit: Option<usize>,
    pub entity_types: Option<Vec<EntityType>>,
    #[serde(default)]
    pub lang: LangPreference,
}

impl SuggestParams {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Default::default()
        }
    }
}

/// Semantic / hybrid request, as posted by clients
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SemanticParams {
    pub query: String,
    /// Plural or singular type names; validated against the semantic set
    pub entity_types: Option<Vec<String>>,
    pub similarity_threshold: Option<f32>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub include_keyword_results: bool,
}

impl SemanticParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Parse a comma-separated `type` parameter
pub fn parse_entity_types(raw: &str) -> Result<Vec<EntityType>, SearchError> {
    let mut types = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let entity_type = name
            .parse::<EntityType>()
            .map_err(|_| invalid_type(name, &EntityType::FULL_SEARCH))?;
        if !types.contains(&entity_type) {
            types.push(entity_type);
        }
    }
    Ok(types)
}

/// Entity types for full search and suggest. `None` or empty means all.
pub(crate) fn full_search_types(
    requested: Option<&[EntityType]>,
) -> Result<Vec<EntityType>, SearchError> {
    match requested {
        None | Some([]) => Ok(EntityType::FULL_SEARCH.to_vec()),
        Some(types) => {
            if let Some(bad) = types.iter().find(|t| !t.is_full_search()) {
                return Err(invalid_type(bad.plural(), &EntityType::FULL_SEARCH));
            }
            let mut out: Vec<EntityType> = Vec::with_capacity(types.len());
            for t in types {
                if !out.contains(t) {
                    out.push(*t);
                }
            }
            Ok(out)
        }
    }
}

/// Entity types for the semantic endpoint. `None` or empty means all three.
pub(crate) fn semantic_types(requested: Option<&[String]>) -> Result<Vec<EntityType>, SearchError> {
    let names = match requested {
        None | Some([]) => return Ok(EntityType::SEMANTIC.to_vec()),
        Some(names) => names,
    };

    let mut types = Vec::new();
    for name in names {
        let entity_type = name
            .parse::<EntityType>()
            .ok()
            .filter(EntityType::is_semantic)
            .ok_or_else(|| invalid_type(name, &EntityType::SEMANTIC))?;
        if !types.contains(&entity_type) {
            types.push(entity_type);
        }
    }
    Ok(types)
}

fn invalid_type(name: &str, allowed: &[EntityType]) -> SearchError {
    let allowed = allowed
        .iter()
        .map(|t| t.plural())
        .collect::<Vec<_>>()
        .join(", ");
    SearchError::validation(
        format!("Invalid entity type '{}'. Allowed: {}", name, allowed),
        format!("نوع الكيان '{}' غير صالح. الأنواع المسموح بها: {}", name, allowed),
    )
}

/// Requested limit, defaulted and clamped to `1..=max`
pub(crate) fn clamp_limit(requested: Option<usize>, default: usize, max: usize) -> usize {
    requested.unwrap_or(default).clamp(1, max.max(1))
}

/// Semantic query text, trimmed and length-checked in characters
pub(crate) fn semantic_query(raw: &str, min: usize, max: usize) -> Result<String, SearchError> {
    let trimmed = raw.trim();
    let length = trimmed.chars().count();
    if length < min || length > max {
        return Err(SearchError::validation(
            format!(
                "Query must be between {} and {} characters (got {})",
                min, max, length
            ),
            format!(
                "يجب أن يكون طول الاستعلام بين {} و {} حرفاً (الطول الحالي {})",
                min, max, length
            ),
        ));
    }
    Ok(trimmed.to_string())
}

/// Similarity threshold, defaulted and checked to lie in `[0, 1]`
pub(crate) fn similarity_threshold(requested: Option<f32>, default: f32) -> Result<f32, SearchError> {
    let threshold = requested.unwrap_or(default);
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Err(SearchError::validation(
            format!("similarity_threshold must be between 0 and 1 (got {})", threshold),
            format!("يجب أن تكون قيمة similarity_threshold بين 0 و 1 (القيمة الحالية {})", threshold),
        ));
    }
    Ok(threshold)
}

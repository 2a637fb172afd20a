//! Stored document - the unit held by the searchable store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityType;

/// A searchable entity as held by the store
///
/// Bilingual title and body fields; either language may be empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub entity_type: EntityType,
    #[serde(default)]
    pub title_en: String,
    #[serde(default)]
    pub title_ar: String,
    #[serde(default)]
    pub body_en: String,
    #[serde(default)]
    pub body_ar: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_archived: bool,
    /// Classification level (0 = unclassified)
    #[serde(default)]
    pub classification_level: u8,
}

impl Document {
    /// Create an unclassified, non-archived document with English fields only
    pub fn new(entity_type: EntityType, title_en: impl Into<String>, body_en: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_type,
            title_en: title_en.into(),
            title_ar: String::new(),
            body_en: body_en.into(),
            body_ar: String::new(),
            updated_at: Utc::now(),
            is_archived: false,
            classification_level: 0,
        }
    }

    /// Builder: Arabic title and body
    pub fn with_arabic(mut self, title_ar: impl Into<String>, body_ar: impl Into<String>) -> Self {
        self.title_ar = title_ar.into();
        self.body_ar = body_ar.into();
        self
    }

    /// Builder: last-updated timestamp
    pub fn updated(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Builder: archived flag
    pub fn archived(mut self, is_archived: bool) -> Self {
        self.is_archived = is_archived;
        self
    }

    /// Builder: classification level
    pub fn classified(mut self, level: u8) -> Self {
        self.classification_level = level;
        self
    }

    /// Title text for a language, falling back to the other language when empty
    pub fn title_or_fallback(&self, arabic: bool) -> &str {
        let (primary, secondary) = if arabic {
            (&self.title_ar, &self.title_en)
        } else {
            (&self.title_en, &self.title_ar)
        };
        if primary.is_empty() { secondary } else { primary }
    }
}

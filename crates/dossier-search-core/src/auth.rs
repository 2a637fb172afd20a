//! Result authorization
//!
//! Visibility is decided by a [`ResultAuthorizer`] injected into the engine.
//! Hidden results are dropped and counted; the engine never inspects the
//! policy itself.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{EntityType, SearchResult, SemanticResult, Suggestion};

/// The identity a request runs as
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: Option<String>,
    /// Highest classification level the caller may see
    pub clearance_level: u8,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, clearance_level: u8) -> Self {
        Self {
            user_id: Some(user_id.into()),
            clearance_level,
        }
    }

    pub fn anonymous(clearance_level: u8) -> Self {
        Self {
            user_id: None,
            clearance_level,
        }
    }
}

/// Anything an authorizer can rule on
pub trait Classified {
    fn id(&self) -> Uuid;
    fn entity_type(&self) -> EntityType;
    fn classification_level(&self) -> u8;
}

macro_rules! impl_classified {
    ($($ty:ty),*) => {
        $(
            impl Classified for $ty {
                fn id(&self) -> Uuid {
                    self.id
                }

                fn entity_type(&self) -> EntityType {
                    self.entity_type
                }

                fn classification_level(&self) -> u8 {
                    self.classification_level
                }
            }
        )*
    };
}

impl_classified!(SearchResult, SemanticResult, Suggestion);

/// Row-level visibility policy
pub trait ResultAuthorizer: Send + Sync {
    fn is_visible(&self, caller: &Caller, result: &dyn Classified) -> bool;

    /// Message shown when results were hidden from `caller`
    fn describe_restriction(&self, caller: &Caller) -> Option<String>;
}

/// Split `results` into the visible ones and the number hidden
pub fn filter_visible<T: Classified>(
    authorizer: &dyn ResultAuthorizer,
    caller: &Caller,
    results: Vec<T>,
) -> (Vec<T>, usize) {
    let before = results.len();
    let visible: Vec<T> = results
        .into_iter()
        .filter(|r| authorizer.is_visible(caller, r))
        .collect();
    let hidden = before - visible.len();
    (visible, hidden)
}

/// Every result is visible
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ResultAuthorizer for AllowAll {
    fn is_visible(&self, _caller: &Caller, _result: &dyn Classified) -> bool {
        true
    }

    fn describe_restriction(&self, _caller: &Caller) -> Option<String> {
        None
    }
}

/// Visible iff the classification level is within the caller's clearance
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearanceAuthorizer;

impl ResultAuthorizer for ClearanceAuthorizer {
    fn is_visible(&self, caller: &Caller, result: &dyn Classified) -> bool {
        result.classification_level() <= caller.clearance_level
    }

    fn describe_restriction(&self, caller: &Caller) -> Option<String> {
        Some(format!(
            "Some results require clearance above level {}. / بعض النتائج تتطلب تصريحاً أعلى من المستوى {}.",
            caller.clearance_level, caller.clearance_level
        ))
    }
}

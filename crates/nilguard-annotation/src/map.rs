//! Nilability facts and the annotation map consulted by triggers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::sites::SiteKey;

/// Solved nilability of one position at a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nilability {
    /// The position may hold nil.
    Nilable,
    /// The position is proven non-nil.
    Nonnil,
}

impl Nilability {
    pub fn is_nilable(self) -> bool {
        matches!(self, Nilability::Nilable)
    }
}

/// Solved fact for a single annotation site.
///
/// `shallow` describes the site's own value; `deep` describes the element
/// one indirection away (map value, slice element, channel element,
/// pointer target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteFact {
    pub shallow: Nilability,
    pub deep: Nilability,
}

impl SiteFact {
    pub fn new(shallow: Nilability, deep: Nilability) -> Self {
        Self { shallow, deep }
    }

    /// Nilable at both levels.
    pub fn nilable() -> Self {
        Self::new(Nilability::Nilable, Nilability::Nilable)
    }

    /// Non-nil at both levels.
    pub fn nonnil() -> Self {
        Self::new(Nilability::Nonnil, Nilability::Nonnil)
    }
}

/// Classification the solver uses to bucket triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerKind {
    /// Fires against every map.
    Always,
    /// Fires against no map.
    Never,
    /// Fires iff the underlying site's shallow nilability says so.
    Conditional,
    /// Fires iff the underlying site's deep nilability says so.
    DeepConditional,
}

/// Map from site key to its solved nilability fact.
///
/// Built by the solver; the core only reads it. A key absent from the
/// map never makes a trigger fire.
#[derive(Debug, Clone, Default)]
pub struct AnnotationMap {
    facts: HashMap<SiteKey, SiteFact>,
}

impl AnnotationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: SiteKey, fact: SiteFact) {
        self.facts.insert(key, fact);
    }

    pub fn lookup(&self, key: &SiteKey) -> Option<SiteFact> {
        self.facts.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

impl FromIterator<(SiteKey, SiteFact)> for AnnotationMap {
    fn from_iter<I: IntoIterator<Item = (SiteKey, SiteFact)>>(iter: I) -> Self {
        Self {
            facts: iter.into_iter().collect(),
        }
    }
}

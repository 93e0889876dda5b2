//! Deferred rendering of trigger descriptions.

use serde::{Deserialize, Serialize};

/// A short sentence fragment describing a trigger in a diagnostic.
///
/// Prestrings keep the persisted form of a trigger small: a trigger on
/// the wire is its variant tag plus field values, and the fragment is
/// expanded only when a diagnostic is actually printed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Prestring(String);

impl Prestring {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Prestring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Prestring {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_returns_text_verbatim() {
        let rendering = Prestring::new("index of a map of type `Cache`");
        assert_eq!(rendering.to_string(), "index of a map of type `Cache`");
        assert_eq!(rendering.as_str(), "index of a map of type `Cache`");
    }
}

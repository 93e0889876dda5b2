//! Source positions.

use serde::{Deserialize, Serialize};

/// Source location span.
///
/// Lines and columns are 1-based (matching Go's `token.Position`).
/// Consumers that need 0-based positions (e.g., LSP) must subtract 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub file: String,
    /// Line number (1-based).
    pub start_line: u32,
    /// Column offset (1-based).
    pub start_col: u32,
    /// End line number (1-based).
    #[serde(default)]
    pub end_line: u32,
    /// End column offset (1-based).
    #[serde(default)]
    pub end_col: u32,
}

impl Span {
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        Self {
            file: file.into(),
            start_line: line,
            start_col: col,
            end_line: line,
            end_col: col,
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start_line, self.start_col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_display() {
        let span = Span::new("handler.go", 18, 5);
        assert_eq!(span.to_string(), "handler.go:18:5");
    }

    #[test]
    fn test_span_new_collapses_end() {
        let span = Span::new("a.go", 3, 7);
        assert_eq!(span.end_line, 3);
        assert_eq!(span.end_col, 7);
    }

    #[test]
    fn test_span_json_roundtrip() {
        let span = Span::new("main.go", 42, 10);
        let json = serde_json::to_string(&span).unwrap();
        let parsed: Span = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, span);
    }
}

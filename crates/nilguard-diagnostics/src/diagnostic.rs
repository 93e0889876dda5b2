//! Core diagnostic types for NilGuard.
//!
//! The nilability core produces `Diagnostic` values; formatters and
//! editor integrations consume them.

use serde::{Deserialize, Serialize};

/// A diagnostic produced by the nilability analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Unique ID: RULE_CODE-file:line (e.g., "NG001-handler.go:18").
    pub id: String,
    /// Rule code (e.g., "NG001").
    pub rule: String,
    /// Severity level.
    pub severity: Severity,
    /// Analysis confidence (0.0 to 1.0). Below 0.7 may be false positive.
    pub confidence: f64,
    /// One-line summary.
    pub title: String,
    /// Detailed explanation of why this is a bug.
    pub explanation: String,
    /// Where the issue manifests.
    pub location: Location,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location, self.explanation)
    }
}

/// Severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational finding.
    Info,
    /// Potential issue that should be addressed.
    Warning,
    /// Definite bug or serious issue.
    Error,
    /// Critical safety issue (guaranteed nil dereference).
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl Severity {
    /// Check if this severity is at or above a threshold.
    pub fn is_at_least(&self, threshold: Severity) -> bool {
        *self >= threshold
    }
}

/// Source code location.
///
/// Lines and columns are 1-based (matching Go's `token.Position`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    /// Line number (1-based).
    pub line: u32,
    /// Column offset (1-based).
    pub column: u32,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Builder for creating diagnostics conveniently.
pub struct DiagnosticBuilder {
    rule: String,
    severity: Severity,
    title: String,
    file: String,
    line: u32,
    column: u32,
    confidence: f64,
    explanation: String,
}

impl DiagnosticBuilder {
    /// Create a new diagnostic builder.
    pub fn new(rule: impl Into<String>, severity: Severity, title: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            severity,
            title: title.into(),
            file: String::new(),
            line: 0,
            column: 0,
            confidence: 0.9,
            explanation: String::new(),
        }
    }

    /// Set the location.
    pub fn location(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.file = file.into();
        self.line = line;
        self.column = column;
        self
    }

    /// Set the confidence level.
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the explanation.
    pub fn explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    /// Build the diagnostic.
    pub fn build(self) -> Diagnostic {
        let id = format!("{}-{}:{}", self.rule, self.file, self.line);
        Diagnostic {
            id,
            rule: self.rule,
            severity: self.severity,
            confidence: self.confidence,
            title: self.title,
            explanation: self.explanation,
            location: Location {
                file: self.file,
                line: self.line,
                column: self.column,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_builder() {
        let diag = DiagnosticBuilder::new("NG001", Severity::Error, "potential nil flow")
            .location("handler.go", 18, 5)
            .confidence(0.95)
            .explanation("result 0 of `Find()` → dereferenced")
            .build();

        assert_eq!(diag.id, "NG001-handler.go:18");
        assert_eq!(diag.rule, "NG001");
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.confidence, 0.95);
        assert_eq!(diag.location.file, "handler.go");
        assert_eq!(diag.location.line, 18);
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = DiagnosticBuilder::new("NG001", Severity::Error, "potential nil flow")
            .location("handler.go", 18, 5)
            .explanation("literal `nil` → dereferenced")
            .build();
        assert_eq!(diag.to_string(), "handler.go:18:5: literal `nil` → dereferenced");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_severity_threshold() {
        assert!(Severity::Critical.is_at_least(Severity::Warning));
        assert!(Severity::Warning.is_at_least(Severity::Warning));
        assert!(!Severity::Info.is_at_least(Severity::Warning));
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Critical.to_string(), "critical");
        assert_eq!(Severity::Warning.to_string(), "warning");
    }

    #[test]
    fn test_location_display() {
        let loc = Location {
            file: "handler.go".into(),
            line: 18,
            column: 5,
        };
        assert_eq!(loc.to_string(), "handler.go:18:5");
    }

    #[test]
    fn test_diagnostic_json_roundtrip() {
        let diag = DiagnosticBuilder::new("NG001", Severity::Error, "potential nil flow")
            .location("main.go", 42, 10)
            .explanation("unassigned variable `p` → dereferenced")
            .build();

        let json = serde_json::to_string_pretty(&diag).unwrap();
        let parsed: Diagnostic = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.rule, "NG001");
        assert_eq!(parsed.severity, Severity::Error);
        assert_eq!(parsed.location.line, 42);
    }
}

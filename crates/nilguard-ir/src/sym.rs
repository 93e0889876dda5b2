//! Declaration handles exchanged between the frontend and the core.
//!
//! These mirror the objects a Go type checker resolves for us: function
//! and method declarations, variables, struct fields, and named types.
//! The core compares them structurally and renders their names in
//! diagnostics; it never inspects bodies or underlying types.

use serde::{Deserialize, Serialize};

use crate::span::Span;

/// A function or method declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FuncDecl {
    /// Fully qualified name (e.g., "example.com/store.NewStore").
    pub name: String,
    /// Unqualified name used in most renderings (e.g., "NewStore").
    pub short_name: String,
    /// Declared parameter names, in order. Unnamed parameters are empty
    /// strings so positions stay aligned with the signature.
    #[serde(default)]
    pub param_names: Vec<String>,
    /// Declared result names, in order; empty strings for unnamed results.
    /// The length is always the arity of the result tuple.
    #[serde(default)]
    pub result_names: Vec<String>,
    /// Receiver name for methods (`s` in `func (s *Store) Get()`).
    #[serde(default)]
    pub recv_name: Option<String>,
}

impl FuncDecl {
    pub fn new(name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_name: short_name.into(),
            param_names: Vec::new(),
            result_names: Vec::new(),
            recv_name: None,
        }
    }

    /// Declared name of parameter `index`, if it is named.
    pub fn param_name(&self, index: u32) -> Option<&str> {
        self.param_names
            .get(index as usize)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Declared name of result `index`, if it is named.
    pub fn result_name(&self, index: u32) -> Option<&str> {
        self.result_names
            .get(index as usize)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Arity of the result tuple.
    pub fn num_results(&self) -> usize {
        self.result_names.len()
    }
}

/// A variable declaration (local, global, receiver, or blank).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
}

impl VarDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A struct field declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A declared named type (map, slice, array, channel, or pointer types
/// carry the deep nilability annotations).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The object a selector expression resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    Var(std::sync::Arc<VarDecl>),
    Func(std::sync::Arc<FuncDecl>),
    Type(std::sync::Arc<TypeDecl>),
}

/// Handle to one tracked expression in a function body.
///
/// Identity comes from the builder-assigned `id`; two handles with the
/// same id always refer to the same syntax node. The span is kept for
/// report positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExprRef {
    pub id: u32,
    pub span: Span,
}

impl ExprRef {
    pub fn new(id: u32, span: Span) -> Self {
        Self { id, span }
    }

    pub fn pos(&self) -> &Span {
        &self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_func() -> FuncDecl {
        FuncDecl {
            name: "example.com/store.Lookup".into(),
            short_name: "Lookup".into(),
            param_names: vec!["key".into(), String::new()],
            result_names: vec![String::new(), "err".into()],
            recv_name: None,
        }
    }

    #[test]
    fn test_param_name_lookup() {
        let func = make_func();
        assert_eq!(func.param_name(0), Some("key"));
        assert_eq!(func.param_name(1), None, "unnamed parameter has no name");
        assert_eq!(func.param_name(7), None, "out of range has no name");
    }

    #[test]
    fn test_result_name_lookup() {
        let func = make_func();
        assert_eq!(func.result_name(0), None);
        assert_eq!(func.result_name(1), Some("err"));
        assert_eq!(func.num_results(), 2);
    }

    #[test]
    fn test_expr_ref_identity() {
        let a = ExprRef::new(3, Span::new("a.go", 10, 2));
        let b = ExprRef::new(3, Span::new("a.go", 10, 2));
        let c = ExprRef::new(4, Span::new("a.go", 10, 2));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_func_decl_json_roundtrip() {
        let func = make_func();
        let json = serde_json::to_string(&func).unwrap();
        let parsed: FuncDecl = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, func);
    }
}

//! NilGuard IR — symbol and position handles for the nilability core.
//!
//! The assertion builder walks typed syntax trees in the frontend and
//! hands the core pre-resolved handles: spans, declaration references,
//! and tracked-expression ids. This crate defines those handle types;
//! it carries no syntax trees and no type checker of its own.

pub mod span;
pub mod sym;

pub use span::Span;
pub use sym::{ExprRef, FieldDecl, FuncDecl, Symbol, TypeDecl, VarDecl};

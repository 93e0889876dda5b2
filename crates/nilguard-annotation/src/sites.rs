//! Annotation site keys.
//!
//! A site key names one program position whose nilability the solver
//! tracks: a parameter, a result, a receiver, a field, a global, or a
//! declared deep type. Call-site variants specialize a declaration site
//! to one call location for context sensitivity; they never compare
//! equal to their declaration-site parents.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use nilguard_ir::span::Span;
use nilguard_ir::sym::{FieldDecl, FuncDecl, TypeDecl, VarDecl};

use crate::map::{AnnotationMap, SiteFact};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiteKey {
    /// Parameter `index` of `func` at its declaration.
    Param { func: Arc<FuncDecl>, index: u32 },
    /// Parameter `index` of `func` specialized to one call location.
    CallSiteParam {
        func: Arc<FuncDecl>,
        index: u32,
        location: Span,
    },
    /// Result `index` of `func` at its declaration.
    Ret { func: Arc<FuncDecl>, index: u32 },
    /// Result `index` of `func` specialized to one call location.
    CallSiteRet {
        func: Arc<FuncDecl>,
        index: u32,
        location: Span,
    },
    /// Method receiver of `func`.
    Recv { func: Arc<FuncDecl> },
    /// A struct field.
    Field { field: Arc<FieldDecl> },
    /// A struct field observed escaping the analysis scope.
    EscapeField { field: Arc<FieldDecl> },
    /// Field of a parameter of `func`. `index` of `None` names the
    /// method receiver rather than a positional parameter.
    ParamField {
        func: Arc<FuncDecl>,
        index: Option<u32>,
        field: Arc<FieldDecl>,
    },
    /// Field of result `index` of `func`.
    RetField {
        func: Arc<FuncDecl>,
        index: u32,
        field: Arc<FieldDecl>,
    },
    /// A global variable.
    GlobalVar { var: Arc<VarDecl> },
    /// A declared map/slice/array/channel/pointer type; carries the deep
    /// annotations for reads through values of that type.
    TypeName { ty: Arc<TypeDecl> },
}

impl SiteKey {
    /// The solved fact for this site, if the solver recorded one.
    pub fn lookup(&self, map: &AnnotationMap) -> Option<SiteFact> {
        map.lookup(self)
    }

    /// Bare parameter name for renderings ("xs"), or the position for
    /// unnamed parameters ("1"). Only meaningful on parameter keys.
    pub(crate) fn param_name_string(&self) -> String {
        match self {
            SiteKey::Param { func, index } | SiteKey::CallSiteParam { func, index, .. } => {
                match func.param_name(*index) {
                    Some(name) => name.to_string(),
                    None => index.to_string(),
                }
            }
            other => panic!("expected Param or CallSiteParam key but got: {other:?}"),
        }
    }

    /// Short parameter description: "parameter `xs`" when named,
    /// "parameter 1" otherwise.
    pub(crate) fn minimal_string(&self) -> String {
        match self {
            SiteKey::Param { func, index } | SiteKey::CallSiteParam { func, index, .. } => {
                match func.param_name(*index) {
                    Some(name) => format!("parameter `{name}`"),
                    None => format!("parameter {index}"),
                }
            }
            other => panic!("expected Param or CallSiteParam key but got: {other:?}"),
        }
    }

    /// The declared type named by a `TypeName` key.
    pub(crate) fn expect_type(&self, trigger: &str) -> &TypeDecl {
        match self {
            SiteKey::TypeName { ty } => ty,
            other => panic!("expected TypeName key in {trigger} but got: {other:?}"),
        }
    }

    /// The field named by a `Field` or `EscapeField` key.
    pub(crate) fn expect_field(&self, trigger: &str) -> &FieldDecl {
        match self {
            SiteKey::Field { field } | SiteKey::EscapeField { field } => field,
            other => panic!("expected Field or EscapeField key in {trigger} but got: {other:?}"),
        }
    }

    /// The function and result index of a `Ret` or `CallSiteRet` key.
    pub(crate) fn expect_ret(&self, trigger: &str) -> (&FuncDecl, u32) {
        match self {
            SiteKey::Ret { func, index } | SiteKey::CallSiteRet { func, index, .. } => {
                (func, *index)
            }
            other => panic!("expected Ret or CallSiteRet key in {trigger} but got: {other:?}"),
        }
    }

    /// The variable named by a `GlobalVar` key.
    pub(crate) fn expect_global(&self, trigger: &str) -> &VarDecl {
        match self {
            SiteKey::GlobalVar { var } => var,
            other => panic!("expected GlobalVar key in {trigger} but got: {other:?}"),
        }
    }
}

/// An interface method paired with one implementing method; identifies
/// the inheritance edge that carried a value between the two.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AffiliationPair {
    pub interface_method: Arc<FuncDecl>,
    pub implementing_method: Arc<FuncDecl>,
}

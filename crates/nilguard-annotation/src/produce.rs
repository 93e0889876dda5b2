//! Producing annotation triggers.
//!
//! A producer is a possible reason a nil value is produced. Every variant
//! reduces to one of four behavioral bases — always fires, never fires,
//! fires iff a site is shallowly nilable, fires iff a site is deeply
//! nilable — and declares whether its permissive semantics are contingent
//! on being paired with a guard-matched consumer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use nilguard_ir::span::Span;
use nilguard_ir::sym::{ExprRef, VarDecl};

use crate::map::{AnnotationMap, TriggerKind};
use crate::render::Prestring;
use crate::sites::{AffiliationPair, SiteKey};

/// A possible reason a nil value is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Producer {
    /// A literal `nil` expression.
    ConstNil,
    /// A struct field never assigned at initialization.
    UnassignedField,
    /// A local variable read before any assignment.
    NoVarAssign { var: Arc<VarDecl> },
    /// A blank identifier (`_`) used as a return value.
    BlankReturn,
    /// A value established nil by a conditional check.
    PositiveNilCheck,
    /// A value established non-nil by a conditional check.
    NegativeNilCheck,
    /// An artifact (map, channel, cast operand) proven non-nil by the
    /// positive branch of an `_, ok :=` form: nil maps hold no keys.
    OkReadCheck,
    /// The receiver of a range loop, non-nil inside the body.
    RangeOver,
    /// The boolean second result of a two-result form.
    ExprOk,
    /// The integer index of a range loop.
    RangeIndex,
    /// A value a trusted predicate established as nilable.
    TrustedFuncNilable,
    /// A value a trusted predicate established as non-nil.
    TrustedFuncNonnil,
    /// A read of a function parameter. The key is the declaration-site
    /// `Param` or, for contract-bearing callees, a `CallSiteParam`.
    FuncParam { key: SiteKey },
    /// A read of a method receiver.
    MethodRecv { var: Arc<VarDecl>, key: SiteKey },
    /// A deep read through a method receiver.
    MethodRecvDeep { var: Arc<VarDecl>, key: SiteKey },
    /// The variadic slice itself, which the caller may omit entirely.
    VariadicParam { var: Arc<VarDecl> },
    /// An element of a variadic parameter. Each element mirrors the
    /// declared element type, so this consults the *shallow* annotation
    /// of the parameter despite being a deep read. Guarded iff the
    /// element type is a map or channel.
    VariadicParamDeep { key: SiteKey, needs_guard: bool },
    /// A read of a struct field.
    FieldRead { key: SiteKey },
    /// A field of a struct parameter consumed inside the function body.
    ParamFieldRead { key: SiteKey },
    /// A field of a struct returned from a function.
    FieldOfReturn { key: SiteKey },
    /// A function call result. `guarded` is true when this is the
    /// non-error return of an error-returning function.
    FuncReturn { key: SiteKey, guarded: bool },
    /// A method call result.
    MethodReturn { key: SiteKey },
    /// A method result flowing into an interface result via implementation.
    InterfaceReturnFromImpl {
        key: SiteKey,
        affiliation: AffiliationPair,
    },
    /// An interface method parameter flowing into an implementing method.
    InterfaceParamToImpl {
        key: SiteKey,
        affiliation: AffiliationPair,
    },
    /// A read of a global variable.
    GlobalRead { key: SiteKey },
    /// A map index expression. Always built guard-needing: without the
    /// `v, ok := m[k]` form the read can yield the zero value.
    MapRead { key: SiteKey, needs_guard: bool },
    /// An array index expression.
    ArrayRead { key: SiteKey },
    /// A slice index expression.
    SliceRead { key: SiteKey },
    /// A pointer dereference read.
    PtrRead { key: SiteKey },
    /// A channel receive; guarded iff it is in the `v, ok := <-ch` form.
    ChanRecv { key: SiteKey, needs_guard: bool },
    /// A deep read through a function parameter. Guarded iff the
    /// parameter's element type is a map or channel.
    FuncParamDeep { key: SiteKey, needs_guard: bool },
    /// A deep read through a function call result.
    FuncReturnDeep { key: SiteKey, needs_guard: bool },
    /// A deep read through a struct field, e.g. `x.f[0]`.
    FieldReadDeep { key: SiteKey, needs_guard: bool },
    /// A deep read through a local variable. Locals are safe when
    /// properly guarded, but carry guard semantics for maps and channels.
    LocalVarReadDeep { var: Arc<VarDecl>, needs_guard: bool },
    /// A deep read through a global variable.
    GlobalReadDeep { key: SiteKey, needs_guard: bool },
    /// Synthetic producer substituted at report time for a guard-needing
    /// producer whose consumer never matched the guard. Never built by
    /// the assertion builder. Keeps the replaced producer for rendering.
    GuardMissing { inner: Box<Producer> },
}

/// The four behavioral bases a producer reduces to.
enum ProduceBase<'a> {
    Always,
    Never,
    IfShallowNilable(&'a SiteKey),
    IfDeepNilable(&'a SiteKey),
}

impl Producer {
    fn base(&self) -> ProduceBase<'_> {
        match self {
            Producer::ConstNil
            | Producer::UnassignedField
            | Producer::NoVarAssign { .. }
            | Producer::BlankReturn
            | Producer::PositiveNilCheck
            | Producer::TrustedFuncNilable
            | Producer::GuardMissing { .. } => ProduceBase::Always,

            Producer::NegativeNilCheck
            | Producer::OkReadCheck
            | Producer::RangeOver
            | Producer::ExprOk
            | Producer::RangeIndex
            | Producer::TrustedFuncNonnil
            | Producer::LocalVarReadDeep { .. } => ProduceBase::Never,

            Producer::FuncParam { key }
            | Producer::MethodRecv { key, .. }
            | Producer::VariadicParamDeep { key, .. }
            | Producer::FieldRead { key }
            | Producer::ParamFieldRead { key }
            | Producer::FieldOfReturn { key }
            | Producer::FuncReturn { key, .. }
            | Producer::MethodReturn { key }
            | Producer::InterfaceReturnFromImpl { key, .. }
            | Producer::InterfaceParamToImpl { key, .. }
            | Producer::GlobalRead { key } => ProduceBase::IfShallowNilable(key),

            Producer::MethodRecvDeep { key, .. }
            | Producer::MapRead { key, .. }
            | Producer::ArrayRead { key }
            | Producer::SliceRead { key }
            | Producer::PtrRead { key }
            | Producer::ChanRecv { key, .. }
            | Producer::FuncParamDeep { key, .. }
            | Producer::FuncReturnDeep { key, .. }
            | Producer::FieldReadDeep { key, .. }
            | Producer::GlobalReadDeep { key, .. } => ProduceBase::IfDeepNilable(key),

            // The variadic slice itself is always nilable: callers may
            // pass no arguments at all.
            Producer::VariadicParam { .. } => ProduceBase::Always,
        }
    }

    /// True when this producer can yield nil under `map`.
    pub fn fires(&self, map: &AnnotationMap) -> bool {
        match self.base() {
            ProduceBase::Always => true,
            ProduceBase::Never => false,
            ProduceBase::IfShallowNilable(key) => {
                key.lookup(map).is_some_and(|fact| fact.shallow.is_nilable())
            }
            ProduceBase::IfDeepNilable(key) => {
                key.lookup(map).is_some_and(|fact| fact.deep.is_nilable())
            }
        }
    }

    /// Classification used by the solver to bucket triggers.
    pub fn kind(&self) -> TriggerKind {
        match self.base() {
            ProduceBase::Always => TriggerKind::Always,
            ProduceBase::Never => TriggerKind::Never,
            ProduceBase::IfShallowNilable(_) => TriggerKind::Conditional,
            ProduceBase::IfDeepNilable(_) => TriggerKind::DeepConditional,
        }
    }

    /// The site this producer's nilability depends on; `None` for
    /// producers that always or never fire.
    pub fn underlying_site(&self) -> Option<&SiteKey> {
        match self.base() {
            ProduceBase::Always | ProduceBase::Never => None,
            ProduceBase::IfShallowNilable(key) | ProduceBase::IfDeepNilable(key) => Some(key),
        }
    }

    /// Whether this production is contingent on being paired with a
    /// guard-matched consumer. An unmatched guard-needing producer is
    /// replaced with `GuardMissing` at report time.
    pub fn needs_guard(&self) -> bool {
        match self {
            Producer::FuncReturn { guarded, .. } => *guarded,
            Producer::VariadicParamDeep { needs_guard, .. }
            | Producer::MapRead { needs_guard, .. }
            | Producer::ChanRecv { needs_guard, .. }
            | Producer::FuncParamDeep { needs_guard, .. }
            | Producer::FuncReturnDeep { needs_guard, .. }
            | Producer::FieldReadDeep { needs_guard, .. }
            | Producer::LocalVarReadDeep { needs_guard, .. }
            | Producer::GlobalReadDeep { needs_guard, .. } => *needs_guard,
            _ => false,
        }
    }

    /// Returns this producer with its guard-neediness set. Identity for
    /// variants without guard semantics. Use sparingly.
    #[must_use]
    pub fn with_guard(self, needs: bool) -> Producer {
        match self {
            Producer::FuncReturn { key, .. } => Producer::FuncReturn { key, guarded: needs },
            Producer::VariadicParamDeep { key, .. } => Producer::VariadicParamDeep {
                key,
                needs_guard: needs,
            },
            Producer::MapRead { key, .. } => Producer::MapRead {
                key,
                needs_guard: needs,
            },
            Producer::ChanRecv { key, .. } => Producer::ChanRecv {
                key,
                needs_guard: needs,
            },
            Producer::FuncParamDeep { key, .. } => Producer::FuncParamDeep {
                key,
                needs_guard: needs,
            },
            Producer::FuncReturnDeep { key, .. } => Producer::FuncReturnDeep {
                key,
                needs_guard: needs,
            },
            Producer::FieldReadDeep { key, .. } => Producer::FieldReadDeep {
                key,
                needs_guard: needs,
            },
            Producer::LocalVarReadDeep { var, .. } => Producer::LocalVarReadDeep {
                var,
                needs_guard: needs,
            },
            Producer::GlobalReadDeep { key, .. } => Producer::GlobalReadDeep {
                key,
                needs_guard: needs,
            },
            other => other,
        }
    }

    /// A map read; the guard requirement is on by default and lifted only
    /// when the surrounding `v, ok := m[k]` check is recognized.
    pub fn map_read(key: SiteKey) -> Producer {
        Producer::MapRead {
            key,
            needs_guard: true,
        }
    }

    /// How this producer renders in a diagnostic.
    pub fn prestring(&self) -> Prestring {
        match self {
            Producer::ConstNil => Prestring::from("literal `nil`"),
            Producer::UnassignedField => Prestring::from("uninitialized"),
            Producer::NoVarAssign { var } => {
                Prestring::new(format!("unassigned variable `{}`", var.name))
            }
            Producer::BlankReturn => Prestring::from("return via a blank variable `_`"),
            Producer::PositiveNilCheck => Prestring::from("determined nil via conditional check"),
            Producer::NegativeNilCheck => {
                Prestring::from("determined nonnil via conditional check")
            }
            Producer::OkReadCheck
            | Producer::RangeOver
            | Producer::ExprOk
            | Producer::RangeIndex => Prestring::from("is not nilable"),
            Producer::TrustedFuncNilable => {
                Prestring::from("determined to be nilable by a trusted function")
            }
            Producer::TrustedFuncNonnil => {
                Prestring::from("determined to be nonnil by a trusted function")
            }
            Producer::FuncParam { key } => match key {
                SiteKey::Param { .. } => Prestring::new(format!(
                    "function parameter `{}`",
                    key.param_name_string()
                )),
                SiteKey::CallSiteParam { location, .. } => Prestring::new(format!(
                    "function parameter `{}` at {location}",
                    key.param_name_string()
                )),
                other => panic!("expected Param or CallSiteParam key in FuncParam but got: {other:?}"),
            },
            Producer::MethodRecv { var, .. } => {
                Prestring::new(format!("read by method receiver `{}`", var.name))
            }
            Producer::MethodRecvDeep { var, .. } => {
                Prestring::new(format!("deep read by method receiver `{}`", var.name))
            }
            Producer::VariadicParam { var } => Prestring::new(format!(
                "read directly from variadic parameter `{}`",
                var.name
            )),
            Producer::VariadicParamDeep { key, .. } => Prestring::new(format!(
                "index of variadic parameter `{}`",
                key.param_name_string()
            )),
            Producer::FieldRead { key } => Prestring::new(format!(
                "field `{}`",
                key.expect_field("FieldRead").name
            )),
            Producer::ParamFieldRead { key } => match key {
                SiteKey::ParamField { field, .. } => {
                    Prestring::new(format!("field `{}`", field.name))
                }
                other => panic!("expected ParamField key in ParamFieldRead but got: {other:?}"),
            },
            Producer::FieldOfReturn { key } => match key {
                SiteKey::RetField { func, index, field } => Prestring::new(format!(
                    "field `{}` of result {index} of `{}()`",
                    field.name, func.short_name
                )),
                other => panic!("expected RetField key in FieldOfReturn but got: {other:?}"),
            },
            Producer::FuncReturn { key, .. } => match key {
                SiteKey::Ret { func, index } => {
                    Prestring::new(format!("result {index} of `{}()`", func.short_name))
                }
                SiteKey::CallSiteRet {
                    func,
                    index,
                    location,
                } => Prestring::new(format!(
                    "result {index} of `{}()` at {location}",
                    func.short_name
                )),
                other => panic!("expected Ret or CallSiteRet key in FuncReturn but got: {other:?}"),
            },
            Producer::MethodReturn { key } => {
                let (func, index) = key.expect_ret("MethodReturn");
                Prestring::new(format!("result {index} of `{}()`", func.short_name))
            }
            // Inheritance-driven flows carry no wording of their own; the
            // paired consumer explains the flow.
            Producer::InterfaceReturnFromImpl { .. } | Producer::InterfaceParamToImpl { .. } => {
                Prestring::from("")
            }
            Producer::GlobalRead { key } => Prestring::new(format!(
                "global variable `{}`",
                key.expect_global("GlobalRead").name
            )),
            Producer::MapRead { key, .. } => Prestring::new(format!(
                "index of a map of type `{}`",
                key.expect_type("MapRead").name
            )),
            Producer::ArrayRead { key } => Prestring::new(format!(
                "index of an array of type `{}`",
                key.expect_type("ArrayRead").name
            )),
            Producer::SliceRead { key } => Prestring::new(format!(
                "index of a slice of type `{}`",
                key.expect_type("SliceRead").name
            )),
            Producer::PtrRead { key } => Prestring::new(format!(
                "value of a pointer of type `{}`",
                key.expect_type("PtrRead").name
            )),
            Producer::ChanRecv { key, .. } => Prestring::new(format!(
                "received from a channel of type `{}`",
                key.expect_type("ChanRecv").name
            )),
            Producer::FuncParamDeep { key, .. } => Prestring::new(format!(
                "deep read from parameter `{}`",
                key.param_name_string()
            )),
            Producer::FuncReturnDeep { key, .. } => {
                let (func, index) = key.expect_ret("FuncReturnDeep");
                Prestring::new(format!(
                    "deep read from result {index} of `{}()`",
                    func.short_name
                ))
            }
            Producer::FieldReadDeep { key, .. } => Prestring::new(format!(
                "deep read from field `{}`",
                key.expect_field("FieldReadDeep").name
            )),
            Producer::LocalVarReadDeep { var, .. } => {
                Prestring::new(format!("deep read from variable `{}`", var.name))
            }
            Producer::GlobalReadDeep { key, .. } => Prestring::new(format!(
                "deep read from global variable `{}`",
                key.expect_global("GlobalReadDeep").name
            )),
            Producer::GuardMissing { inner } => {
                Prestring::new(format!("{} lacking guarding;", inner.prestring()))
            }
        }
    }
}

// Don't modify trigger objects after construction: references to them are
// shared across assertion nodes.

/// A point at which a possibly-nil value is produced. Always paired with
/// a consume trigger. The producer is all that matters semantically; the
/// expression is kept only for error messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProduceTrigger {
    pub producer: Producer,
    pub expr: ExprRef,
}

impl ProduceTrigger {
    pub fn new(producer: Producer, expr: ExprRef) -> Self {
        Self { producer, expr }
    }
}

/// Re-keys a `FuncParam` producer from its declaration-site `Param` key
/// to the matching `CallSiteParam` key at `location`, for context
/// sensitivity across contract-bearing callees.
///
/// Panics on any other producer variant or key.
pub fn duplicate_param_producer(trigger: &ProduceTrigger, location: Span) -> ProduceTrigger {
    let Producer::FuncParam { key } = &trigger.producer else {
        panic!(
            "expected FuncParam producer in duplicate_param_producer but got: {:?}",
            trigger.producer
        );
    };
    let SiteKey::Param { func, index } = key else {
        panic!("expected Param key in FuncParam but got: {key:?}");
    };
    ProduceTrigger {
        producer: Producer::FuncParam {
            key: SiteKey::CallSiteParam {
                func: Arc::clone(func),
                index: *index,
                location,
            },
        },
        expr: trigger.expr.clone(),
    }
}

#[cfg(test)]
mod tests {
    use nilguard_ir::sym::{FuncDecl, TypeDecl};

    use crate::map::{Nilability, SiteFact};

    use super::*;

    fn make_func(short: &str, params: &[&str]) -> Arc<FuncDecl> {
        let mut func = FuncDecl::new(format!("example.com/pkg.{short}"), short);
        func.param_names = params.iter().map(|s| s.to_string()).collect();
        func.result_names = vec![String::new()];
        Arc::new(func)
    }

    fn make_expr(id: u32) -> ExprRef {
        ExprRef::new(id, Span::new("test.go", id + 10, 1))
    }

    fn type_key(name: &str) -> SiteKey {
        SiteKey::TypeName {
            ty: Arc::new(TypeDecl::new(name)),
        }
    }

    #[test]
    fn test_always_and_never_producers() {
        let map = AnnotationMap::new();
        assert!(Producer::ConstNil.fires(&map));
        assert!(Producer::PositiveNilCheck.fires(&map));
        assert!(!Producer::NegativeNilCheck.fires(&map));
        assert!(!Producer::OkReadCheck.fires(&map));
        assert!(!Producer::RangeOver.fires(&map));

        assert_eq!(Producer::ConstNil.kind(), TriggerKind::Always);
        assert_eq!(Producer::NegativeNilCheck.kind(), TriggerKind::Never);
        assert!(Producer::ConstNil.underlying_site().is_none());
        assert!(Producer::NegativeNilCheck.underlying_site().is_none());
    }

    #[test]
    fn test_func_param_fires_on_shallow_nilability_only() {
        let key = SiteKey::Param {
            func: make_func("Handle", &["req"]),
            index: 0,
        };
        let producer = Producer::FuncParam { key: key.clone() };
        assert_eq!(producer.kind(), TriggerKind::Conditional);
        assert_eq!(producer.underlying_site(), Some(&key));

        let nilable: AnnotationMap = [(key.clone(), SiteFact::nilable())].into_iter().collect();
        let nonnil_shallow: AnnotationMap = [(
            key.clone(),
            SiteFact::new(Nilability::Nonnil, Nilability::Nilable),
        )]
        .into_iter()
        .collect();

        assert!(producer.fires(&nilable));
        assert!(
            !producer.fires(&nonnil_shallow),
            "deep nilability must not affect a shallow trigger"
        );
        assert!(!producer.fires(&AnnotationMap::new()), "absent key never fires");
    }

    #[test]
    fn test_map_read_fires_on_deep_nilability_only() {
        let key = type_key("Cache");
        let producer = Producer::map_read(key.clone());
        assert_eq!(producer.kind(), TriggerKind::DeepConditional);
        assert!(producer.needs_guard(), "map reads are guard-needing by default");

        let deep_nilable: AnnotationMap = [(
            key.clone(),
            SiteFact::new(Nilability::Nonnil, Nilability::Nilable),
        )]
        .into_iter()
        .collect();
        let deep_nonnil: AnnotationMap = [(
            key,
            SiteFact::new(Nilability::Nilable, Nilability::Nonnil),
        )]
        .into_iter()
        .collect();

        assert!(producer.fires(&deep_nilable));
        assert!(!producer.fires(&deep_nonnil));
    }

    #[test]
    fn test_variadic_deep_consults_shallow_annotation() {
        let key = SiteKey::Param {
            func: make_func("Join", &["parts"]),
            index: 0,
        };
        let producer = Producer::VariadicParamDeep {
            key: key.clone(),
            needs_guard: false,
        };
        // Deep-read semantics, shallow annotation: each element mirrors
        // the declared element type.
        assert_eq!(producer.kind(), TriggerKind::Conditional);

        let shallow_nilable: AnnotationMap = [(
            key,
            SiteFact::new(Nilability::Nilable, Nilability::Nonnil),
        )]
        .into_iter()
        .collect();
        assert!(producer.fires(&shallow_nilable));
    }

    #[test]
    fn test_with_guard_roundtrip() {
        let key = type_key("chan *int");
        let recv = Producer::ChanRecv {
            key,
            needs_guard: false,
        };
        assert!(!recv.needs_guard());
        let guarded = recv.with_guard(true);
        assert!(guarded.needs_guard());
        assert!(!guarded.with_guard(false).needs_guard());
    }

    #[test]
    fn test_with_guard_is_identity_without_guard_semantics() {
        assert_eq!(Producer::ConstNil.with_guard(true), Producer::ConstNil);
        assert!(!Producer::ConstNil.with_guard(true).needs_guard());

        let key = SiteKey::Param {
            func: make_func("Handle", &["req"]),
            index: 0,
        };
        let param = Producer::FuncParam { key };
        assert_eq!(param.clone().with_guard(true), param);
    }

    #[test]
    fn test_func_return_guarded_field_drives_needs_guard() {
        let key = SiteKey::Ret {
            func: make_func("NewS", &[]),
            index: 0,
        };
        let unguarded = Producer::FuncReturn {
            key: key.clone(),
            guarded: false,
        };
        assert!(!unguarded.needs_guard());
        assert!(unguarded.with_guard(true).needs_guard());
        let guarded = Producer::FuncReturn { key, guarded: true };
        assert!(guarded.needs_guard());
    }

    #[test]
    fn test_local_var_read_deep_never_fires_but_carries_guard() {
        let producer = Producer::LocalVarReadDeep {
            var: Arc::new(VarDecl::new("seen")),
            needs_guard: true,
        };
        assert_eq!(producer.kind(), TriggerKind::Never);
        assert!(!producer.fires(&AnnotationMap::new()));
        assert!(producer.needs_guard());
    }

    #[test]
    fn test_prestrings() {
        let func = make_func("NewS", &[]);
        assert_eq!(Producer::ConstNil.prestring().as_str(), "literal `nil`");
        assert_eq!(
            Producer::NoVarAssign {
                var: Arc::new(VarDecl::new("conn"))
            }
            .prestring()
            .as_str(),
            "unassigned variable `conn`"
        );
        assert_eq!(
            Producer::FuncReturn {
                key: SiteKey::Ret { func, index: 0 },
                guarded: true,
            }
            .prestring()
            .as_str(),
            "result 0 of `NewS()`"
        );
        assert_eq!(
            Producer::map_read(type_key("Cache")).prestring().as_str(),
            "index of a map of type `Cache`"
        );
        assert_eq!(
            Producer::ChanRecv {
                key: type_key("chan *int"),
                needs_guard: true,
            }
            .prestring()
            .as_str(),
            "received from a channel of type `chan *int`"
        );
        assert_eq!(Producer::ExprOk.prestring().as_str(), "is not nilable");
    }

    #[test]
    fn test_func_param_prestring_distinguishes_call_sites() {
        let func = make_func("Handle", &["req"]);
        let declared = Producer::FuncParam {
            key: SiteKey::Param {
                func: Arc::clone(&func),
                index: 0,
            },
        };
        let specialized = Producer::FuncParam {
            key: SiteKey::CallSiteParam {
                func,
                index: 0,
                location: Span::new("main.go", 12, 4),
            },
        };
        assert_eq!(declared.prestring().as_str(), "function parameter `req`");
        assert_eq!(
            specialized.prestring().as_str(),
            "function parameter `req` at main.go:12:4"
        );
    }

    #[test]
    #[should_panic(expected = "expected Ret or CallSiteRet key in FuncReturn")]
    fn test_func_return_prestring_rejects_wrong_key() {
        let producer = Producer::FuncReturn {
            key: type_key("Cache"),
            guarded: false,
        };
        producer.prestring();
    }

    #[test]
    fn test_guard_missing_wraps_and_always_fires() {
        let missing = Producer::GuardMissing {
            inner: Box::new(Producer::map_read(type_key("Cache"))),
        };
        assert!(missing.fires(&AnnotationMap::new()));
        assert_eq!(missing.kind(), TriggerKind::Always);
        assert!(missing.underlying_site().is_none());
        assert!(!missing.needs_guard());
        assert_eq!(
            missing.prestring().as_str(),
            "index of a map of type `Cache` lacking guarding;"
        );
    }

    #[test]
    fn test_duplicate_param_producer_rekeys_to_call_site() {
        let func = make_func("Handle", &["req"]);
        let trigger = ProduceTrigger::new(
            Producer::FuncParam {
                key: SiteKey::Param {
                    func: Arc::clone(&func),
                    index: 0,
                },
            },
            make_expr(1),
        );
        let location = Span::new("main.go", 30, 2);
        let duplicated = duplicate_param_producer(&trigger, location.clone());

        assert_eq!(duplicated.expr, trigger.expr);
        let Producer::FuncParam { key } = &duplicated.producer else {
            panic!("duplicated producer should stay a FuncParam");
        };
        assert_eq!(
            key,
            &SiteKey::CallSiteParam {
                func,
                index: 0,
                location,
            }
        );
    }

    #[test]
    fn test_duplicate_param_producer_preserves_firing_semantics() {
        let func = make_func("Handle", &["req"]);
        let declared_key = SiteKey::Param {
            func: Arc::clone(&func),
            index: 0,
        };
        let trigger = ProduceTrigger::new(
            Producer::FuncParam {
                key: declared_key.clone(),
            },
            make_expr(1),
        );
        let location = Span::new("main.go", 30, 2);
        let duplicated = duplicate_param_producer(&trigger, location.clone());
        let call_site_key = SiteKey::CallSiteParam {
            func,
            index: 0,
            location,
        };

        // Same fact installed under the matching key on each side.
        let declared_map: AnnotationMap = [(declared_key, SiteFact::nilable())]
            .into_iter()
            .collect();
        let call_site_map: AnnotationMap = [(call_site_key, SiteFact::nilable())]
            .into_iter()
            .collect();
        assert_eq!(
            trigger.producer.fires(&declared_map),
            duplicated.producer.fires(&call_site_map)
        );
    }

    #[test]
    #[should_panic(expected = "expected FuncParam producer")]
    fn test_duplicate_param_producer_rejects_other_variants() {
        let trigger = ProduceTrigger::new(Producer::ConstNil, make_expr(1));
        duplicate_param_producer(&trigger, Span::new("main.go", 1, 1));
    }
}

//! Consuming annotation triggers.
//!
//! A consumer is a site where a nil arrival would be an error: a
//! dereference, an indexing, an assignment into a non-nil site, a
//! non-nil return. Consumers fire against the solved annotation map the
//! same way producers do; unlike producers, the guard state lives on the
//! enclosing `ConsumeTrigger`, not on the consumer itself.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use nilguard_ir::span::Span;
use nilguard_ir::sym::{ExprRef, Symbol, VarDecl};

use crate::guard::{GuardNonce, GuardSet};
use crate::map::{AnnotationMap, TriggerKind};
use crate::render::Prestring;
use crate::sites::{AffiliationPair, SiteKey};

/// A possible reason a nil value arriving at a site would be an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Consumer {
    /// The value is dereferenced as a pointer.
    PtrLoad,
    /// A map value is indexed. Reported only when the configuration
    /// enables nilable-map-read reporting: a nil map read yields the
    /// zero value rather than panicking.
    MapAccess,
    /// A map value has one of its indices written to.
    MapWrittenTo,
    /// A channel is used for sending.
    ChanAccess,
    /// A slice value is sliced into.
    SliceAccess,
    /// A field (or method) of the value is selected.
    FieldAccess { sel: Symbol },
    /// The value is assigned deeply into an unannotated element type.
    DeepAssignPrimitive,
    /// The value is assigned deeply into a local of deeply non-nil type.
    LocalVarAssignDeep { var: Arc<VarDecl> },
    /// The value is assigned into a struct field.
    FieldAssign { key: SiteKey },
    /// A struct field value flows into a parameter of the same struct
    /// type (`is_passed`), or is observed unassigned at such a pass.
    ArgFieldPass { key: SiteKey, is_passed: bool },
    /// The value is assigned into a global variable.
    GlobalVarAssign { key: SiteKey },
    /// The value is passed as a function argument. The key is the
    /// declaration-site `Param` or, for contract-bearing callees, a
    /// `CallSiteParam`.
    ArgPass { key: SiteKey },
    /// The value is used as the receiver of a method call.
    RecvPass { key: SiteKey },
    /// A concrete method result flows into an interface method result.
    InterfaceResultFromImpl {
        key: SiteKey,
        affiliation: AffiliationPair,
    },
    /// An interface method parameter flows into an implementing method.
    MethodParamFromInterface {
        key: SiteKey,
        affiliation: AffiliationPair,
    },
    /// The value is returned from a function. Named returns report at
    /// the return statement rather than the returned expression.
    UseAsReturn {
        key: SiteKey,
        is_named_return: bool,
        ret_stmt: Span,
    },
    /// The value flows into the conventional error result.
    UseAsErrorResult {
        key: SiteKey,
        is_named_return: bool,
        ret_stmt: Span,
    },
    /// A struct field value flows out through a returned struct.
    UseAsFldOfReturn { key: SiteKey },
    /// A struct with a nilable field is returned or passed out of the
    /// analysis scope.
    FieldEscape { key: SiteKey },
    /// The value is assigned into a slice element.
    SliceAssign { key: SiteKey },
    /// The value is assigned into an array element.
    ArrayAssign { key: SiteKey },
    /// The value is assigned through a pointer.
    PtrAssign { key: SiteKey },
    /// The value is assigned into a map element.
    MapAssign { key: SiteKey },
    /// The value is sent to a channel.
    ChanSend { key: SiteKey },
    /// The value is assigned deeply into a function parameter.
    ParamAssignDeep { key: SiteKey },
    /// The value is assigned deeply into a function result.
    FuncRetAssignDeep { key: SiteKey },
    /// The value is assigned deeply into a struct field.
    FieldAssignDeep { key: SiteKey },
    /// The value is assigned deeply into a global variable.
    GlobalVarAssignDeep { key: SiteKey },
    /// The value is assigned deeply into a variadic parameter. Consults
    /// the *shallow* site, mirroring the variadic deep producer.
    VariadicParamAssignDeep { key: SiteKey },
    /// A non-error result is returned on a path where the error result
    /// is not provably non-nil.
    UseAsNonErrorRetDependentOnErrorRetNilability {
        key: SiteKey,
        is_named_return: bool,
        ret_stmt: Span,
    },
    /// The error result is nil on at least one path.
    UseAsErrorRetWithNilabilityUnknown {
        key: SiteKey,
        is_named_return: bool,
        ret_stmt: Span,
    },
}

/// The three behavioral bases a consumer reduces to.
enum ConsumeBase<'a> {
    Always,
    IfShallowNonnil(&'a SiteKey),
    IfDeepNonnil(&'a SiteKey),
}

impl Consumer {
    fn base(&self) -> ConsumeBase<'_> {
        match self {
            Consumer::PtrLoad
            | Consumer::MapAccess
            | Consumer::MapWrittenTo
            | Consumer::ChanAccess
            | Consumer::SliceAccess
            | Consumer::FieldAccess { .. }
            | Consumer::DeepAssignPrimitive
            | Consumer::LocalVarAssignDeep { .. } => ConsumeBase::Always,

            Consumer::FieldAssign { key }
            | Consumer::ArgFieldPass { key, .. }
            | Consumer::GlobalVarAssign { key }
            | Consumer::ArgPass { key }
            | Consumer::RecvPass { key }
            | Consumer::InterfaceResultFromImpl { key, .. }
            | Consumer::MethodParamFromInterface { key, .. }
            | Consumer::UseAsReturn { key, .. }
            | Consumer::UseAsErrorResult { key, .. }
            | Consumer::UseAsFldOfReturn { key }
            | Consumer::FieldEscape { key }
            | Consumer::VariadicParamAssignDeep { key }
            | Consumer::UseAsNonErrorRetDependentOnErrorRetNilability { key, .. }
            | Consumer::UseAsErrorRetWithNilabilityUnknown { key, .. } => {
                ConsumeBase::IfShallowNonnil(key)
            }

            Consumer::SliceAssign { key }
            | Consumer::ArrayAssign { key }
            | Consumer::PtrAssign { key }
            | Consumer::MapAssign { key }
            | Consumer::ChanSend { key }
            | Consumer::ParamAssignDeep { key }
            | Consumer::FuncRetAssignDeep { key }
            | Consumer::FieldAssignDeep { key }
            | Consumer::GlobalVarAssignDeep { key } => ConsumeBase::IfDeepNonnil(key),
        }
    }

    /// True when a nil arrival here is an error under `map`.
    pub fn fires(&self, map: &AnnotationMap) -> bool {
        match self.base() {
            ConsumeBase::Always => true,
            ConsumeBase::IfShallowNonnil(key) => key
                .lookup(map)
                .is_some_and(|fact| !fact.shallow.is_nilable()),
            ConsumeBase::IfDeepNonnil(key) => {
                key.lookup(map).is_some_and(|fact| !fact.deep.is_nilable())
            }
        }
    }

    /// Classification used by the solver to bucket triggers.
    pub fn kind(&self) -> TriggerKind {
        match self.base() {
            ConsumeBase::Always => TriggerKind::Always,
            ConsumeBase::IfShallowNonnil(_) => TriggerKind::Conditional,
            ConsumeBase::IfDeepNonnil(_) => TriggerKind::DeepConditional,
        }
    }

    /// The site this consumer's demand depends on; `None` for consumers
    /// that always demand non-nil.
    pub fn underlying_site(&self) -> Option<&SiteKey> {
        match self.base() {
            ConsumeBase::Always => None,
            ConsumeBase::IfShallowNonnil(key) | ConsumeBase::IfDeepNonnil(key) => Some(key),
        }
    }

    /// Overriding report position. Named-return consumers point at the
    /// raw return statement, the source of the potential error; every
    /// other consumer reports at its expression.
    pub fn custom_pos(&self) -> Option<&Span> {
        match self {
            Consumer::UseAsReturn {
                is_named_return,
                ret_stmt,
                ..
            }
            | Consumer::UseAsErrorResult {
                is_named_return,
                ret_stmt,
                ..
            }
            | Consumer::UseAsNonErrorRetDependentOnErrorRetNilability {
                is_named_return,
                ret_stmt,
                ..
            }
            | Consumer::UseAsErrorRetWithNilabilityUnknown {
                is_named_return,
                ret_stmt,
                ..
            } if *is_named_return => Some(ret_stmt),
            _ => None,
        }
    }

    /// How this consumer renders in a diagnostic.
    pub fn prestring(&self) -> Prestring {
        match self {
            Consumer::PtrLoad => Prestring::from("dereferenced"),
            Consumer::MapAccess => Prestring::from("keyed into"),
            Consumer::MapWrittenTo => Prestring::from("written to at an index"),
            Consumer::ChanAccess => Prestring::from("uninitialized; nil channel accessed"),
            Consumer::SliceAccess => Prestring::from("sliced into"),
            Consumer::FieldAccess { sel } => match sel {
                Symbol::Var(var) => Prestring::new(format!("accessed field `{}`", var.name)),
                Symbol::Func(func) => Prestring::new(format!("called `{}()`", func.short_name)),
                other => panic!("unexpected selector symbol in FieldAccess: {other:?}"),
            },
            Consumer::DeepAssignPrimitive => {
                Prestring::from("assigned into a deep type expecting nonnil element type")
            }
            Consumer::LocalVarAssignDeep { var } => {
                Prestring::new(format!("assigned deeply into local variable `{}`", var.name))
            }
            Consumer::FieldAssign { key } => Prestring::new(format!(
                "assigned into field `{}`",
                key.expect_field("FieldAssign").name
            )),
            Consumer::ArgFieldPass { key, is_passed } => {
                let SiteKey::ParamField { func, index, field } = key else {
                    panic!("expected ParamField key in ArgFieldPass but got: {key:?}");
                };
                let prefix = if *is_passed { "assigned to " } else { "" };
                match index {
                    None => {
                        let recv = func.recv_name.as_deref().unwrap_or_default();
                        Prestring::new(format!(
                            "{prefix}field `{}` of method receiver `{recv}`",
                            field.name
                        ))
                    }
                    Some(position) => Prestring::new(format!(
                        "{prefix}field `{}` of argument {position} to `{}()`",
                        field.name, func.short_name
                    )),
                }
            }
            Consumer::GlobalVarAssign { key } => Prestring::new(format!(
                "assigned into global variable `{}`",
                key.expect_global("GlobalVarAssign").name
            )),
            Consumer::ArgPass { key } => match key {
                SiteKey::Param { func, .. } => Prestring::new(format!(
                    "passed as {} to `{}()`",
                    key.minimal_string(),
                    func.short_name
                )),
                SiteKey::CallSiteParam { func, location, .. } => Prestring::new(format!(
                    "passed as {} to `{}()` at {location}",
                    key.minimal_string(),
                    func.short_name
                )),
                other => {
                    panic!("expected Param or CallSiteParam key in ArgPass but got: {other:?}")
                }
            },
            Consumer::RecvPass { key } => match key {
                SiteKey::Recv { func } => Prestring::new(format!(
                    "used as receiver to call `{}()`",
                    func.short_name
                )),
                other => panic!("expected Recv key in RecvPass but got: {other:?}"),
            },
            Consumer::InterfaceResultFromImpl { key, affiliation } => {
                let (func, index) = key.expect_ret("InterfaceResultFromImpl");
                Prestring::new(format!(
                    "returned as result {index} from interface method `{}()` (implemented by `{}()`)",
                    func.name, affiliation.implementing_method.name
                ))
            }
            Consumer::MethodParamFromInterface { key, affiliation } => match key {
                SiteKey::Param { func, .. } => Prestring::new(format!(
                    "passed as parameter `{}` to `{}()` (implementing `{}()`)",
                    key.param_name_string(),
                    func.name,
                    affiliation.interface_method.name
                )),
                other => {
                    panic!("expected Param key in MethodParamFromInterface but got: {other:?}")
                }
            },
            Consumer::UseAsReturn {
                key,
                is_named_return,
                ..
            } => {
                let (func, index) = key.expect_ret("UseAsReturn");
                let mut message = format!("returned from `{}()`", func.short_name);
                if *is_named_return {
                    let name = func.result_name(index).unwrap_or_default();
                    message.push_str(&format!(" via named return `{name}`"));
                } else {
                    message.push_str(&format!(" in position {index}"));
                }
                if let SiteKey::CallSiteRet { location, .. } = key {
                    message.push_str(&format!(" at {location}"));
                }
                Prestring::new(message)
            }
            Consumer::UseAsErrorResult {
                key,
                is_named_return,
                ..
            } => {
                let (func, index) = key.expect_ret("UseAsErrorResult");
                if *is_named_return {
                    let name = func.result_name(index).unwrap_or_default();
                    Prestring::new(format!(
                        "returned as named error result `{name}` of `{}()`",
                        func.short_name
                    ))
                } else {
                    Prestring::new(format!(
                        "returned as error result {index} of `{}()`",
                        func.short_name
                    ))
                }
            }
            Consumer::UseAsFldOfReturn { key } => match key {
                SiteKey::RetField { func, index, field } => Prestring::new(format!(
                    "field `{}` returned by result {index} of `{}()`",
                    field.name, func.short_name
                )),
                other => panic!("expected RetField key in UseAsFldOfReturn but got: {other:?}"),
            },
            Consumer::FieldEscape { key } => Prestring::new(format!(
                "field `{}` escaped out of our analysis scope (presumed nilable)",
                key.expect_field("FieldEscape").name
            )),
            Consumer::SliceAssign { key } => Prestring::new(format!(
                "assigned into a slice of deeply nonnil type `{}`",
                key.expect_type("SliceAssign").name
            )),
            Consumer::ArrayAssign { key } => Prestring::new(format!(
                "assigned into an array of deeply nonnil type `{}`",
                key.expect_type("ArrayAssign").name
            )),
            Consumer::PtrAssign { key } => Prestring::new(format!(
                "assigned into a pointer of deeply nonnil type `{}`",
                key.expect_type("PtrAssign").name
            )),
            Consumer::MapAssign { key } => Prestring::new(format!(
                "assigned into a map of deeply nonnil type `{}`",
                key.expect_type("MapAssign").name
            )),
            Consumer::ChanSend { key } => Prestring::new(format!(
                "sent to channel of deeply nonnil type `{}`",
                key.expect_type("ChanSend").name
            )),
            Consumer::ParamAssignDeep { key } => Prestring::new(format!(
                "assigned deeply into {}",
                key.minimal_string()
            )),
            Consumer::FuncRetAssignDeep { key } => {
                let (func, index) = key.expect_ret("FuncRetAssignDeep");
                Prestring::new(format!(
                    "assigned deeply into result {index} of `{}()`",
                    func.short_name
                ))
            }
            Consumer::FieldAssignDeep { key } => Prestring::new(format!(
                "assigned deeply into field `{}`",
                key.expect_field("FieldAssignDeep").name
            )),
            Consumer::GlobalVarAssignDeep { key } => Prestring::new(format!(
                "assigned deeply into global variable `{}`",
                key.expect_global("GlobalVarAssignDeep").name
            )),
            Consumer::VariadicParamAssignDeep { key } => Prestring::new(format!(
                "assigned deeply into variadic parameter `{}`",
                key.param_name_string()
            )),
            Consumer::UseAsNonErrorRetDependentOnErrorRetNilability {
                key,
                is_named_return,
                ..
            } => {
                let (func, index) = key.expect_ret("UseAsNonErrorRetDependentOnErrorRetNilability");
                let via = if *is_named_return {
                    let name = func.result_name(index).unwrap_or_default();
                    format!(" via named return `{name}`")
                } else {
                    String::new()
                };
                let error_position = func.num_results().saturating_sub(1);
                Prestring::new(format!(
                    "returned from `{}()`{via} in position {index} when the error return \
                     in position {error_position} is not guaranteed to be non-nil through all paths",
                    func.short_name
                ))
            }
            Consumer::UseAsErrorRetWithNilabilityUnknown {
                key,
                is_named_return,
                ..
            } => {
                let (func, index) = key.expect_ret("UseAsErrorRetWithNilabilityUnknown");
                if *is_named_return {
                    let name = func.result_name(index).unwrap_or_default();
                    Prestring::new(format!(
                        "found in at least one path of `{}()` for the named return `{name}` in position {index}",
                        func.short_name
                    ))
                } else {
                    Prestring::new(format!(
                        "found in at least one path of `{}()` for the return in position {index}",
                        func.short_name
                    ))
                }
            }
        }
    }
}

// Don't modify trigger objects after construction: references to them are
// shared across assertion nodes.

/// A point at which a value is consumed that may be required non-nil.
///
/// `expr` is the expression being consumed, not the expression doing the
/// consumption: if `x.f` requires `x` to be non-nil, `x` is the tracked
/// expression.
///
/// `guards` records the conditional checks this consumption was
/// backpropagated across. A guard survives a CFG join only if both
/// branches carried it. `guard_matched` is true only if a guard arose
/// and matched the nonce expected by a guard-requiring statement along
/// *every* path between the current propagation point and the site the
/// trigger arose at; producers that need a guard keep their permissive
/// semantics only against matched consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeTrigger {
    pub consumer: Consumer,
    pub expr: ExprRef,
    pub guards: GuardSet,
    pub guard_matched: bool,
}

impl ConsumeTrigger {
    /// A fresh trigger with no guards.
    pub fn new(consumer: Consumer, expr: ExprRef) -> Self {
        Self {
            consumer,
            expr,
            guards: GuardSet::none(),
            guard_matched: false,
        }
    }

    /// Report position: the consumer's override, or the tracked
    /// expression's position.
    pub fn pos(&self) -> &Span {
        self.consumer.custom_pos().unwrap_or(&self.expr.span)
    }
}

/// Consume trigger for a struct field flowing out through a result.
pub fn ret_field_consumer(key: SiteKey, expr: ExprRef) -> ConsumeTrigger {
    ConsumeTrigger::new(Consumer::UseAsFldOfReturn { key }, expr)
}

/// Consume trigger for a struct field escaping the analysis scope.
pub fn escape_field_consumer(key: SiteKey, expr: ExprRef) -> ConsumeTrigger {
    ConsumeTrigger::new(Consumer::FieldEscape { key }, expr)
}

/// Consume trigger for a struct field passed along with its struct.
pub fn param_field_consumer(key: SiteKey, expr: ExprRef) -> ConsumeTrigger {
    ConsumeTrigger::new(
        Consumer::ArgFieldPass {
            key,
            is_passed: true,
        },
        expr,
    )
}

/// Re-keys a `UseAsReturn` consumer from its declaration-site `Ret` key
/// to the matching `CallSiteRet` key at `location`. Guards are copied;
/// the guard-matched flag and return-statement fields are preserved.
///
/// Panics on any other consumer variant or key.
pub fn duplicate_return_consumer(trigger: &ConsumeTrigger, location: Span) -> ConsumeTrigger {
    let Consumer::UseAsReturn {
        key,
        is_named_return,
        ret_stmt,
    } = &trigger.consumer
    else {
        panic!(
            "expected UseAsReturn consumer in duplicate_return_consumer but got: {:?}",
            trigger.consumer
        );
    };
    let SiteKey::Ret { func, index } = key else {
        panic!("expected Ret key in UseAsReturn but got: {key:?}");
    };
    ConsumeTrigger {
        consumer: Consumer::UseAsReturn {
            key: SiteKey::CallSiteRet {
                func: Arc::clone(func),
                index: *index,
                location,
            },
            is_named_return: *is_named_return,
            ret_stmt: ret_stmt.clone(),
        },
        expr: trigger.expr.clone(),
        guards: trigger.guards.clone(),
        guard_matched: trigger.guard_matched,
    }
}

/// Merges the consume-trigger slices of two CFG branches.
///
/// Triggers with equal consumer and expression merge into one whose guard
/// set is the *intersection* of the two: a guard holds before a branch
/// only if both branches re-established it. `guard_matched` survives only
/// if it held on both sides. Everything else passes through.
pub fn merge_consume_trigger_slices(
    left: &[ConsumeTrigger],
    right: &[ConsumeTrigger],
) -> Vec<ConsumeTrigger> {
    let mut out: Vec<ConsumeTrigger> = Vec::with_capacity(left.len() + right.len());
    let mut index: HashMap<(Consumer, ExprRef), usize> = HashMap::new();

    for trigger in left.iter().chain(right.iter()) {
        match index.entry((trigger.consumer.clone(), trigger.expr.clone())) {
            Entry::Occupied(slot) => {
                let merged = &mut out[*slot.get()];
                merged.guards = merged.guards.intersection(&trigger.guards);
                merged.guard_matched = merged.guard_matched && trigger.guard_matched;
                trace!(expr = trigger.expr.id, "merged consume trigger across branches");
            }
            Entry::Vacant(slot) => {
                slot.insert(out.len());
                out.push(trigger.clone());
            }
        }
    }

    out
}

/// Returns a new slice in which every trigger carries `guards` in
/// addition to its own. The guard-matched flag is reset: guarding is
/// being freshly introduced, not yet matched.
pub fn consume_trigger_slice_as_guarded(
    slice: &[ConsumeTrigger],
    guards: &[GuardNonce],
) -> Vec<ConsumeTrigger> {
    slice
        .iter()
        .map(|trigger| {
            let mut extended = trigger.guards.clone();
            for &nonce in guards {
                extended = extended.add(nonce);
            }
            ConsumeTrigger {
                consumer: trigger.consumer.clone(),
                expr: trigger.expr.clone(),
                guards: extended,
                guard_matched: false,
            }
        })
        .collect()
}

/// Set equality of two consume-trigger slices.
/// Precondition: no duplicates within either input.
pub fn consume_trigger_slices_eq(left: &[ConsumeTrigger], right: &[ConsumeTrigger]) -> bool {
    left.len() == right.len() && left.iter().all(|l| right.iter().any(|r| l == r))
}

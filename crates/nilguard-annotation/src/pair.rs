//! Full triggers: matched producer/consumer pairs and their resolution.
//!
//! The assertion builder emits a `FullTrigger` wherever a value can flow
//! from a possibly-nil producer to a non-nil-demanding consumer. At
//! report time the guard requirement is resolved first, then both sides
//! are checked against the solved annotation map.

use serde::{Deserialize, Serialize};
use tracing::debug;

use nilguard_diagnostics::diagnostic::{Diagnostic, DiagnosticBuilder, Severity};

use crate::config::NilabilityConfig;
use crate::consume::{ConsumeTrigger, Consumer};
use crate::map::AnnotationMap;
use crate::produce::{ProduceTrigger, Producer};

/// Rule code for a completed nil-flow finding.
pub const NIL_FLOW_RULE: &str = "NG001";

/// A matched producer/consumer pair awaiting final resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullTrigger {
    pub produce: ProduceTrigger,
    pub consume: ConsumeTrigger,
}

impl FullTrigger {
    pub fn new(produce: ProduceTrigger, consume: ConsumeTrigger) -> Self {
        Self { produce, consume }
    }

    /// Resolves the guard requirement, then reports iff both sides fire
    /// against `map`.
    ///
    /// `MapAccess` consumers are reported only when the configuration
    /// enables nilable-map-read reporting.
    pub fn check(&mut self, map: &AnnotationMap, config: &NilabilityConfig) -> Option<Diagnostic> {
        resolve_guard_missing(&mut self.produce, &self.consume);

        if matches!(self.consume.consumer, Consumer::MapAccess)
            && !config.report_nilable_map_reads
        {
            return None;
        }
        if !(self.produce.producer.fires(map) && self.consume.consumer.fires(map)) {
            return None;
        }

        let pos = self.consume.pos();
        Some(
            DiagnosticBuilder::new(NIL_FLOW_RULE, Severity::Error, "potential nil flow")
                .location(pos.file.clone(), pos.start_line, pos.start_col)
                .explanation(format!(
                    "{} → {}",
                    self.produce.producer.prestring(),
                    self.consume.consumer.prestring()
                ))
                .build(),
        )
    }
}

/// Substitutes `GuardMissing` for a producer that required a guard its
/// consumer never matched.
///
/// Never invoked during backpropagation: the substitution happens once,
/// when a pair reaches the diagnostic pipeline. An unguarded map read,
/// channel receive, or unchecked error-returning call thereby reports
/// unconditionally, while the same construct stays quiet after the
/// appropriate check.
pub fn resolve_guard_missing(produce: &mut ProduceTrigger, consume: &ConsumeTrigger) {
    if produce.producer.needs_guard() && !consume.guard_matched {
        debug!(
            expr = produce.expr.id,
            "guard requirement unmet; producer treated as always-nil"
        );
        let old = produce.producer.clone();
        produce.producer = Producer::GuardMissing {
            inner: Box::new(old),
        };
    }
}

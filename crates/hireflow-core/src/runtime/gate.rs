// crates/hireflow-core/src/runtime/gate.rs
// ============================================================================
// Module: Hireflow Signal Gate Evaluation
// Description: Gate folding, missing-signal policies, and trace collection.
// Purpose: Evaluate action gate predicates against signal snapshots deterministically.
// Dependencies: crate::core, crate::runtime::comparator
// ============================================================================

//! ## Overview
//! Gate evaluation walks the conditions of a signal gate in declaration
//! order against a single latest-view snapshot, applying each condition's
//! missing-signal policy, and folds the per-condition results under the
//! gate's ALL/ANY logic. Every evaluation produces a full trace regardless
//! of the verdict; the trace is recorded verbatim in the execution log.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::ConditionReason;
use crate::core::ConditionTrace;
use crate::core::GateLogic;
use crate::core::MissingPolicy;
use crate::core::SignalCondition;
use crate::core::SignalGate;
use crate::core::SignalSnapshot;
use crate::core::SignalValue;
use crate::runtime::comparator::evaluate_condition;

// ============================================================================
// SECTION: Gate Evaluation
// ============================================================================

/// Result of evaluating one signal gate against a snapshot.
///
/// # Invariants
/// - `traces` holds one entry per condition in declaration order.
/// - `failures` lists the formatted unmet conditions, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct GateEvaluation {
    /// Per-condition results in declaration order.
    pub traces: Vec<ConditionTrace>,
    /// Whether the gate permits the action.
    pub passed: bool,
    /// Whether a warning policy fired and a decision note is required.
    pub requires_note_for_warning: bool,
    /// Formatted unmet conditions for the rejection message.
    pub failures: Vec<String>,
}

/// Evaluates a signal gate against the latest signal view.
#[must_use]
pub fn evaluate_gate(gate: &SignalGate, snapshot: &SignalSnapshot) -> GateEvaluation {
    let mut traces = Vec::with_capacity(gate.conditions.len());
    let mut failures = Vec::new();
    let mut requires_note_for_warning = false;
    let mut met_count = 0_usize;

    for condition in &gate.conditions {
        let actual = snapshot.get(&condition.signal);
        let (met, reason, warning) = match actual {
            Some(value) => {
                let met = evaluate_condition(
                    value.signal_type(),
                    value,
                    condition.operator,
                    &condition.value,
                );
                (met, None, false)
            }
            None => match condition.on_missing {
                MissingPolicy::Block => (false, Some(ConditionReason::SignalMissing), false),
                MissingPolicy::Allow => (true, Some(ConditionReason::MissingAllowed), false),
                MissingPolicy::Warn => (true, Some(ConditionReason::MissingWithWarning), true),
            },
        };

        if warning {
            requires_note_for_warning = true;
        }
        if met {
            met_count += 1;
        } else {
            failures.push(format_failure(condition, actual));
        }
        traces.push(ConditionTrace {
            signal: condition.signal.clone(),
            operator: condition.operator,
            expected: condition.value.clone(),
            actual: actual.cloned(),
            on_missing: condition.on_missing,
            met,
            reason,
            warning,
        });
    }

    let passed = match gate.logic {
        GateLogic::All => failures.is_empty(),
        GateLogic::Any => met_count > 0 || gate.conditions.is_empty(),
    };

    GateEvaluation {
        traces,
        passed,
        requires_note_for_warning,
        failures,
    }
}

// ============================================================================
// SECTION: Failure Formatting
// ============================================================================

/// Formats one unmet condition for the rejection message.
fn format_failure(condition: &SignalCondition, actual: Option<&SignalValue>) -> String {
    let actual = actual.map_or_else(|| "missing".to_string(), SignalValue::render);
    format!(
        "{} {} {} (actual: {actual})",
        condition.signal, condition.operator.as_str(), condition.value
    )
}

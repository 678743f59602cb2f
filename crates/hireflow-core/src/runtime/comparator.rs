// crates/hireflow-core/src/runtime/comparator.rs
// ============================================================================
// Module: Hireflow Comparator Logic
// Description: Type-strict condition evaluation over signal values.
// Purpose: Convert signal values and expected literals into met/unmet outcomes.
// Dependencies: crate::core, bigdecimal
// ============================================================================

//! ## Overview
//! Condition evaluation is type-strict: booleans and text admit only equality
//! operators, numbers admit the full ordering set with decimal-aware
//! comparison, and any other pairing fails closed (unmet). Expected values
//! arrive as stringified literals from tenant configuration and are parsed
//! according to the signal's declared type, never guessed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use bigdecimal::BigDecimal;

use crate::core::ConditionOperator;
use crate::core::SignalType;
use crate::core::SignalValue;

// ============================================================================
// SECTION: Condition Evaluation
// ============================================================================

/// Evaluates one condition against a present signal value.
///
/// Returns `false` (fail closed) for operator/type pairings outside the
/// supported matrix, for expected literals that do not parse under the
/// declared type, and for values whose variant disagrees with the declared
/// type.
#[must_use]
pub fn evaluate_condition(
    signal_type: SignalType,
    actual: &SignalValue,
    operator: ConditionOperator,
    expected: &str,
) -> bool {
    match signal_type {
        SignalType::Boolean => evaluate_boolean(actual, operator, expected),
        SignalType::Integer | SignalType::Float => evaluate_numeric(actual, operator, expected),
        SignalType::Text => evaluate_text(actual, operator, expected),
    }
}

/// Evaluates equality operators over boolean signals.
fn evaluate_boolean(actual: &SignalValue, operator: ConditionOperator, expected: &str) -> bool {
    let SignalValue::Boolean(actual) = actual else {
        return false;
    };
    let Some(expected) = parse_boolean(expected) else {
        return false;
    };
    match operator {
        ConditionOperator::Eq => *actual == expected,
        ConditionOperator::Ne => *actual != expected,
        _ => false,
    }
}

/// Evaluates ordering operators over numeric signals.
fn evaluate_numeric(actual: &SignalValue, operator: ConditionOperator, expected: &str) -> bool {
    let Some(actual) = decimal_from_signal(actual) else {
        return false;
    };
    let Ok(expected) = BigDecimal::from_str(expected.trim()) else {
        return false;
    };
    let ordering = actual.cmp(&expected);
    match operator {
        ConditionOperator::Eq => ordering.is_eq(),
        ConditionOperator::Ne => ordering.is_ne(),
        ConditionOperator::Gt => ordering.is_gt(),
        ConditionOperator::Ge => ordering.is_ge(),
        ConditionOperator::Lt => ordering.is_lt(),
        ConditionOperator::Le => ordering.is_le(),
    }
}

/// Evaluates equality operators over text signals.
fn evaluate_text(actual: &SignalValue, operator: ConditionOperator, expected: &str) -> bool {
    let SignalValue::Text(actual) = actual else {
        return false;
    };
    match operator {
        ConditionOperator::Eq => actual == expected,
        ConditionOperator::Ne => actual != expected,
        _ => false,
    }
}

// ============================================================================
// SECTION: Literal Parsing
// ============================================================================

/// Parses a stringified boolean literal.
fn parse_boolean(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "TRUE" | "True" => Some(true),
        "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Converts a numeric signal value into a decimal with a stable rendering.
fn decimal_from_signal(value: &SignalValue) -> Option<BigDecimal> {
    match value {
        SignalValue::Integer(value) => Some(BigDecimal::from(*value)),
        SignalValue::Float(value) => {
            if !value.is_finite() {
                return None;
            }
            BigDecimal::from_str(&value.to_string()).ok()
        }
        SignalValue::Boolean(_) | SignalValue::Text(_) => None,
    }
}

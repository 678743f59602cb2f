// crates/hireflow-core/tests/comparator_unit.rs
// ============================================================================
// Module: Comparator Unit Tests
// Description: Type-strict condition evaluation over signal values.
// Purpose: Validate the operator/type matrix and fail-closed behavior.
// ============================================================================

//! Comparator tests covering the supported operator matrix, boundary
//! ordering semantics, and fail-closed handling of unsupported pairings and
//! unparseable expected literals.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use hireflow_core::ConditionOperator;
use hireflow_core::SignalType;
use hireflow_core::SignalValue;
use hireflow_core::evaluate_condition;

// ============================================================================
// SECTION: Boolean Signals
// ============================================================================

#[test]
fn boolean_equality_operators() {
    let actual = SignalValue::Boolean(true);
    assert!(evaluate_condition(SignalType::Boolean, &actual, ConditionOperator::Eq, "true"));
    assert!(!evaluate_condition(SignalType::Boolean, &actual, ConditionOperator::Eq, "false"));
    assert!(evaluate_condition(SignalType::Boolean, &actual, ConditionOperator::Ne, "false"));
    assert!(!evaluate_condition(SignalType::Boolean, &actual, ConditionOperator::Ne, "true"));
}

#[test]
fn boolean_rejects_ordering_operators() {
    let actual = SignalValue::Boolean(true);
    for operator in [
        ConditionOperator::Gt,
        ConditionOperator::Ge,
        ConditionOperator::Lt,
        ConditionOperator::Le,
    ] {
        assert!(!evaluate_condition(SignalType::Boolean, &actual, operator, "true"));
    }
}

#[test]
fn boolean_accepts_case_variants_of_literals() {
    let actual = SignalValue::Boolean(false);
    assert!(evaluate_condition(SignalType::Boolean, &actual, ConditionOperator::Eq, "FALSE"));
    assert!(evaluate_condition(SignalType::Boolean, &actual, ConditionOperator::Eq, "False"));
}

#[test]
fn boolean_fails_closed_on_bad_literal() {
    let actual = SignalValue::Boolean(true);
    assert!(!evaluate_condition(SignalType::Boolean, &actual, ConditionOperator::Eq, "yes"));
    assert!(!evaluate_condition(SignalType::Boolean, &actual, ConditionOperator::Eq, "1"));
}

// ============================================================================
// SECTION: Numeric Signals
// ============================================================================

#[test]
fn integer_ordering_at_equality_boundary() {
    let actual = SignalValue::Integer(3);
    assert!(evaluate_condition(SignalType::Integer, &actual, ConditionOperator::Ge, "3"));
    assert!(!evaluate_condition(SignalType::Integer, &actual, ConditionOperator::Gt, "3"));
    assert!(evaluate_condition(SignalType::Integer, &actual, ConditionOperator::Le, "3"));
    assert!(!evaluate_condition(SignalType::Integer, &actual, ConditionOperator::Lt, "3"));
    assert!(evaluate_condition(SignalType::Integer, &actual, ConditionOperator::Eq, "3"));
    assert!(!evaluate_condition(SignalType::Integer, &actual, ConditionOperator::Ne, "3"));
}

#[test]
fn integer_strict_ordering() {
    let actual = SignalValue::Integer(4);
    assert!(evaluate_condition(SignalType::Integer, &actual, ConditionOperator::Gt, "3"));
    assert!(evaluate_condition(SignalType::Integer, &actual, ConditionOperator::Ge, "3"));
    assert!(!evaluate_condition(SignalType::Integer, &actual, ConditionOperator::Lt, "3"));
    assert!(!evaluate_condition(SignalType::Integer, &actual, ConditionOperator::Le, "3"));
}

#[test]
fn float_compares_decimal_aware() {
    let actual = SignalValue::Float(4.5);
    assert!(evaluate_condition(SignalType::Float, &actual, ConditionOperator::Eq, "4.5"));
    assert!(evaluate_condition(SignalType::Float, &actual, ConditionOperator::Ge, "4.5"));
    assert!(evaluate_condition(SignalType::Float, &actual, ConditionOperator::Lt, "4.6"));
    assert!(!evaluate_condition(SignalType::Float, &actual, ConditionOperator::Gt, "4.5"));
}

#[test]
fn float_against_integer_literal() {
    let actual = SignalValue::Float(4.0);
    assert!(evaluate_condition(SignalType::Float, &actual, ConditionOperator::Eq, "4"));
    assert!(evaluate_condition(SignalType::Float, &actual, ConditionOperator::Ge, "4"));
}

#[test]
fn numeric_fails_closed_on_bad_literal() {
    let actual = SignalValue::Integer(3);
    assert!(!evaluate_condition(SignalType::Integer, &actual, ConditionOperator::Ge, "three"));
    assert!(!evaluate_condition(SignalType::Integer, &actual, ConditionOperator::Eq, ""));
}

#[test]
fn numeric_fails_closed_on_non_finite_value() {
    let actual = SignalValue::Float(f64::NAN);
    assert!(!evaluate_condition(SignalType::Float, &actual, ConditionOperator::Eq, "1"));
    let actual = SignalValue::Float(f64::INFINITY);
    assert!(!evaluate_condition(SignalType::Float, &actual, ConditionOperator::Gt, "1"));
}

// ============================================================================
// SECTION: Text Signals
// ============================================================================

#[test]
fn text_equality_operators() {
    let actual = SignalValue::Text("SENIOR".to_string());
    assert!(evaluate_condition(SignalType::Text, &actual, ConditionOperator::Eq, "SENIOR"));
    assert!(evaluate_condition(SignalType::Text, &actual, ConditionOperator::Ne, "JUNIOR"));
    assert!(!evaluate_condition(SignalType::Text, &actual, ConditionOperator::Eq, "senior"));
}

#[test]
fn text_rejects_ordering_operators() {
    let actual = SignalValue::Text("b".to_string());
    for operator in [
        ConditionOperator::Gt,
        ConditionOperator::Ge,
        ConditionOperator::Lt,
        ConditionOperator::Le,
    ] {
        assert!(!evaluate_condition(SignalType::Text, &actual, operator, "a"));
    }
}

// ============================================================================
// SECTION: Type Mismatches
// ============================================================================

#[test]
fn mismatched_value_variant_fails_closed() {
    let text = SignalValue::Text("true".to_string());
    assert!(!evaluate_condition(SignalType::Boolean, &text, ConditionOperator::Eq, "true"));

    let boolean = SignalValue::Boolean(true);
    assert!(!evaluate_condition(SignalType::Integer, &boolean, ConditionOperator::Eq, "1"));

    let number = SignalValue::Integer(1);
    assert!(!evaluate_condition(SignalType::Text, &number, ConditionOperator::Eq, "1"));
}

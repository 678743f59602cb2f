// crates/hireflow-core/tests/proptest_comparator.rs
// ============================================================================
// Module: Comparator Property Tests
// Description: Randomized coverage of numeric and boolean comparison laws.
// Purpose: Pin ordering consistency and fail-closed behavior across inputs.
// ============================================================================

//! Property tests for the condition comparator: numeric operators agree with
//! native integer ordering, equality operators are complementary, and
//! unsupported operator/type pairings never pass.

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
use proptest::prelude::proptest;

proptest! {
    #[test]
    fn integer_operators_agree_with_native_ordering(actual in -1_000_000_i64..1_000_000, expected in -1_000_000_i64..1_000_000) {
        let value = SignalValue::Integer(actual);
        let literal = expected.to_string();
        assert_eq!(
            evaluate_condition(SignalType::Integer, &value, ConditionOperator::Gt, &literal),
            actual > expected
        );
        assert_eq!(
            evaluate_condition(SignalType::Integer, &value, ConditionOperator::Ge, &literal),
            actual >= expected
        );
        assert_eq!(
            evaluate_condition(SignalType::Integer, &value, ConditionOperator::Lt, &literal),
            actual < expected
        );
        assert_eq!(
            evaluate_condition(SignalType::Integer, &value, ConditionOperator::Le, &literal),
            actual <= expected
        );
    }

    #[test]
    fn equality_operators_are_complementary(actual in -1_000_i64..1_000, expected in -1_000_i64..1_000) {
        let value = SignalValue::Integer(actual);
        let literal = expected.to_string();
        let equal = evaluate_condition(SignalType::Integer, &value, ConditionOperator::Eq, &literal);
        let unequal = evaluate_condition(SignalType::Integer, &value, ConditionOperator::Ne, &literal);
        assert_ne!(equal, unequal);
        assert_eq!(equal, actual == expected);
    }

    #[test]
    fn boolean_ordering_operators_never_pass(actual in proptest::bool::ANY, expected in proptest::bool::ANY) {
        let value = SignalValue::Boolean(actual);
        let literal = expected.to_string();
        for operator in [
            ConditionOperator::Gt,
            ConditionOperator::Ge,
            ConditionOperator::Lt,
            ConditionOperator::Le,
        ] {
            assert!(!evaluate_condition(SignalType::Boolean, &value, operator, &literal));
        }
    }

    #[test]
    fn float_round_trips_through_rendered_literal(actual in -1.0e6_f64..1.0e6) {
        let value = SignalValue::Float(actual);
        let literal = actual.to_string();
        assert!(evaluate_condition(SignalType::Float, &value, ConditionOperator::Eq, &literal));
        assert!(evaluate_condition(SignalType::Float, &value, ConditionOperator::Ge, &literal));
        assert!(evaluate_condition(SignalType::Float, &value, ConditionOperator::Le, &literal));
    }

    #[test]
    fn text_never_orders(actual in "[a-z]{0,8}", expected in "[a-z]{0,8}") {
        let value = SignalValue::Text(actual);
        for operator in [
            ConditionOperator::Gt,
            ConditionOperator::Ge,
            ConditionOperator::Lt,
            ConditionOperator::Le,
        ] {
            assert!(!evaluate_condition(SignalType::Text, &value, operator, &expected));
        }
    }
}

// crates/hireflow-core/src/runtime/aggregate.rs
// ============================================================================
// Module: Hireflow Response Aggregation
// Description: Panel response validation and per-signal aggregation rules.
// Purpose: Reduce participant responses into new signal values deterministically.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! When an evaluation completes, every non-text field of its template schema
//! is reduced across the submitted responses: MAJORITY and its boolean
//! cousins fold truth values, AVERAGE takes the arithmetic mean of present
//! numerics. Unanswered fields contribute nothing; a field with zero
//! contributing responses produces no signal at all. Output order follows
//! the schema, which keeps downstream signal writes deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::Aggregation;
use crate::core::EvaluationResponse;
use crate::core::EvaluationTemplate;
use crate::core::ResponseData;
use crate::core::ResponseValue;
use crate::core::SignalField;
use crate::core::SignalKey;
use crate::core::SignalType;
use crate::core::SignalValue;
use crate::errors::EngineError;

// ============================================================================
// SECTION: Response Validation
// ============================================================================

/// Validates one submission against the template schema.
///
/// Required fields must be answered, answers must match the declared field
/// type, and numeric answers must respect the field bounds. Keys outside the
/// schema are rejected.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] naming the first offending field.
pub fn validate_response(
    template: &EvaluationTemplate,
    data: &ResponseData,
) -> Result<(), EngineError> {
    for key in data.keys() {
        if !template.schema.iter().any(|field| &field.key == key) {
            return Err(EngineError::Validation(format!(
                "response field {key} is not part of template {}",
                template.name
            )));
        }
    }
    for field in &template.schema {
        let answer = data.get(&field.key);
        let missing = matches!(answer, None | Some(ResponseValue::Null));
        if missing {
            if field.required {
                return Err(EngineError::Validation(format!(
                    "required field {} is unanswered",
                    field.key
                )));
            }
            continue;
        }
        if let Some(answer) = answer {
            validate_answer(field, answer)?;
        }
    }
    Ok(())
}

/// Validates one answered field against its declaration.
fn validate_answer(field: &SignalField, answer: &ResponseValue) -> Result<(), EngineError> {
    let matches_type = matches!(
        (field.signal_type, answer),
        (SignalType::Boolean, ResponseValue::Boolean(_))
            | (SignalType::Integer, ResponseValue::Integer(_))
            | (SignalType::Float, ResponseValue::Float(_) | ResponseValue::Integer(_))
            | (SignalType::Text, ResponseValue::Text(_))
    );
    if !matches_type {
        return Err(EngineError::Validation(format!(
            "field {} expects a {} answer",
            field.key,
            field.signal_type.as_str()
        )));
    }
    if let Some(numeric) = numeric_answer(answer) {
        if let Some(min) = field.min
            && numeric < min
        {
            return Err(EngineError::Validation(format!(
                "field {} is below its minimum of {min}",
                field.key
            )));
        }
        if let Some(max) = field.max
            && numeric > max
        {
            return Err(EngineError::Validation(format!(
                "field {} is above its maximum of {max}",
                field.key
            )));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Aggregation
// ============================================================================

/// Aggregates submitted responses into new signal values, in schema order.
///
/// Text fields never aggregate; a non-text field without a field-level or
/// template-level aggregation is skipped, as is any field with zero
/// contributing answers.
#[must_use]
pub fn aggregate_responses(
    template: &EvaluationTemplate,
    responses: &[EvaluationResponse],
) -> Vec<(SignalKey, SignalValue)> {
    let mut out = Vec::new();
    for field in &template.schema {
        if field.signal_type == SignalType::Text {
            continue;
        }
        let Some(aggregation) = field.aggregation.or(template.default_aggregation) else {
            continue;
        };
        let Some(value) = aggregate_field(field, aggregation, responses) else {
            continue;
        };
        out.push((field.key.clone(), value));
    }
    out
}

/// Aggregates one field across the responses, or `None` with no contributors.
fn aggregate_field(
    field: &SignalField,
    aggregation: Aggregation,
    responses: &[EvaluationResponse],
) -> Option<SignalValue> {
    match aggregation {
        Aggregation::Majority => {
            let answers = boolean_answers(field, responses);
            if answers.is_empty() {
                return None;
            }
            let trues = answers.iter().filter(|value| **value).count();
            let falses = answers.len() - trues;
            Some(SignalValue::Boolean(trues > falses))
        }
        Aggregation::Unanimous => {
            let answers = boolean_answers(field, responses);
            if answers.is_empty() {
                return None;
            }
            Some(SignalValue::Boolean(answers.iter().all(|value| *value)))
        }
        Aggregation::Any => {
            let answers = boolean_answers(field, responses);
            if answers.is_empty() {
                return None;
            }
            Some(SignalValue::Boolean(answers.iter().any(|value| *value)))
        }
        Aggregation::Average => {
            let answers = numeric_answers(field, responses);
            if answers.is_empty() {
                return None;
            }
            #[allow(
                clippy::cast_precision_loss,
                reason = "Panel sizes are far below the f64 integer range."
            )]
            let mean = answers.iter().sum::<f64>() / answers.len() as f64;
            Some(SignalValue::Float(mean))
        }
    }
}

/// Collects the present boolean answers for a field.
fn boolean_answers(field: &SignalField, responses: &[EvaluationResponse]) -> Vec<bool> {
    responses
        .iter()
        .filter_map(|response| match response.data.get(&field.key) {
            Some(ResponseValue::Boolean(value)) => Some(*value),
            _ => None,
        })
        .collect()
}

/// Collects the present numeric answers for a field.
fn numeric_answers(field: &SignalField, responses: &[EvaluationResponse]) -> Vec<f64> {
    responses
        .iter()
        .filter_map(|response| response.data.get(&field.key).and_then(numeric_answer))
        .collect()
}

/// Returns the numeric value of an answer, when it has one.
fn numeric_answer(answer: &ResponseValue) -> Option<f64> {
    match answer {
        ResponseValue::Integer(value) => {
            #[allow(
                clippy::cast_precision_loss,
                reason = "Assessment scores are far below the f64 integer range."
            )]
            let numeric = *value as f64;
            Some(numeric)
        }
        ResponseValue::Float(value) => Some(*value),
        ResponseValue::Null | ResponseValue::Boolean(_) | ResponseValue::Text(_) => None,
    }
}

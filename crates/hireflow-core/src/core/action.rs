// crates/hireflow-core/src/core/action.rs
// ============================================================================
// Module: Hireflow Stage Actions
// Description: Per-stage action catalog entries and signal gate predicates.
// Purpose: Model the configurable operations the engine may execute on a stage.
// Dependencies: crate::core::{capability, identifiers, status}, serde
// ============================================================================

//! ## Overview
//! A stage action is a named, pre-configured operation the engine can execute
//! against an application sitting on a specific stage. Each action declares
//! its required capability, validation gates (notes, feedback), the optional
//! signal gate predicate, and the transition it produces (stage advancement,
//! outcome change, terminality).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde::de;

use crate::core::capability::Capability;
use crate::core::identifiers::ActionCode;
use crate::core::identifiers::SignalKey;
use crate::core::identifiers::StageId;
use crate::core::identifiers::TenantId;
use crate::core::status::OutcomeType;

// ============================================================================
// SECTION: Condition Operators
// ============================================================================

/// Comparison operator usable inside a signal condition.
///
/// # Invariants
/// - Wire forms are the literal operator tokens (`=`, `!=`, `>`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionOperator {
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Le,
}

impl ConditionOperator {
    /// Returns the stable wire token for the operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }

    /// Parses an operator from its stable wire token.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "=" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            _ => None,
        }
    }
}

impl Serialize for ConditionOperator {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ConditionOperator {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Self::parse(&token)
            .ok_or_else(|| de::Error::custom(format!("unknown condition operator: {token}")))
    }
}

// ============================================================================
// SECTION: Missing-Signal Policies
// ============================================================================

/// Policy applied when a condition's signal has no current value.
///
/// # Invariants
/// - Unknown tokens deserialize as [`MissingPolicy::Block`] (fail closed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Missing signal fails the condition.
    #[default]
    Block,
    /// Missing signal passes the condition.
    Allow,
    /// Missing signal passes but demands a decision note.
    Warn,
}

impl MissingPolicy {
    /// Returns the stable wire label for the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Block => "BLOCK",
            Self::Allow => "ALLOW",
            Self::Warn => "WARN",
        }
    }

    /// Parses a policy, falling back to `Block` for unknown tokens.
    #[must_use]
    pub fn parse_or_block(label: &str) -> Self {
        match label {
            "ALLOW" => Self::Allow,
            "WARN" => Self::Warn,
            _ => Self::Block,
        }
    }
}

impl Serialize for MissingPolicy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MissingPolicy {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::parse_or_block(&label))
    }
}

// ============================================================================
// SECTION: Signal Gate Predicate
// ============================================================================

/// Folding mode for a multi-condition gate.
///
/// # Invariants
/// - Variants are stable for serialization and gate evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateLogic {
    /// Every condition must be met.
    #[default]
    All,
    /// At least one condition must be met.
    Any,
}

/// One typed condition inside a signal gate.
///
/// # Invariants
/// - `value` is the stringified expected literal; parsing is type-directed at
///   evaluation time and fails closed on mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCondition {
    /// Signal key the condition reads.
    pub signal: SignalKey,
    /// Comparison operator.
    pub operator: ConditionOperator,
    /// Stringified expected literal.
    pub value: String,
    /// Policy applied when the signal has no current value.
    #[serde(default)]
    pub on_missing: MissingPolicy,
}

/// Read-only predicate attached to a stage action.
///
/// # Invariants
/// - Conditions are evaluated in declaration order against a single snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalGate {
    /// Folding mode across conditions.
    #[serde(default)]
    pub logic: GateLogic,
    /// Conditions in declaration order.
    pub conditions: Vec<SignalCondition>,
}

// ============================================================================
// SECTION: Stage Action Specification
// ============================================================================

/// One catalogued action executable on a stage.
///
/// # Invariants
/// - `(tenant_id, stage_id, action_code)` is unique within the catalog.
/// - Inactive actions are invisible to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageActionSpec {
    /// Tenant owning the action.
    pub tenant_id: TenantId,
    /// Stage the action is configured on.
    pub stage_id: StageId,
    /// Action code (unique per stage).
    pub action_code: ActionCode,
    /// Outcome family the action produces, when it changes one.
    pub outcome_type: Option<OutcomeType>,
    /// Whether the action advances to the next ordered stage.
    pub moves_to_next_stage: bool,
    /// Whether the action produces a terminal state.
    pub is_terminal: bool,
    /// Whether the action demands stage feedback before executing.
    pub requires_feedback: bool,
    /// Whether the action demands a non-blank decision note.
    pub requires_notes: bool,
    /// Capability the caller must hold.
    pub required_capability: Capability,
    /// Optional read-only signal gate.
    pub signal_conditions: Option<SignalGate>,
    /// Whether the action is currently executable.
    pub is_active: bool,
}

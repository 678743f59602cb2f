// crates/hireflow-core/src/core/signal.rs
// ============================================================================
// Module: Hireflow Signals
// Description: Typed, versioned, application-scoped facts used to gate actions.
// Purpose: Model append-only signal history with a deterministic latest view.
// Dependencies: crate::core::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! A signal is a typed fact about one application (`TECH_PASS = true`,
//! `SCORE = 4`). Signal history is append-only: a new write supersedes the
//! previous row for the same key rather than updating it, so every decision
//! can be audited against the exact values it saw. The latest view holds at
//! most one value per key and renders to canonical JSON for log snapshots.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ApplicationId;
use crate::core::identifiers::SignalKey;
use crate::core::identifiers::TenantId;
use crate::core::identifiers::UserId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Signal Types and Values
// ============================================================================

/// Value type of a signal.
///
/// # Invariants
/// - Variants are stable for serialization and condition evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    /// Boolean signal.
    Boolean,
    /// Whole-number signal.
    Integer,
    /// Floating-point signal.
    Float,
    /// Free-text signal.
    Text,
}

impl SignalType {
    /// Returns the stable wire label for the signal type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
        }
    }

    /// Parses a signal type from its stable wire label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "boolean" => Some(Self::Boolean),
            "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Typed signal value.
///
/// # Invariants
/// - The variant always matches the declaring row's `signal_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    /// Boolean value.
    Boolean(bool),
    /// Whole-number value.
    Integer(i64),
    /// Floating-point value.
    Float(f64),
    /// Free-text value.
    Text(String),
}

impl SignalValue {
    /// Returns the signal type of this value.
    #[must_use]
    pub const fn signal_type(&self) -> SignalType {
        match self {
            Self::Boolean(_) => SignalType::Boolean,
            Self::Integer(_) => SignalType::Integer,
            Self::Float(_) => SignalType::Float,
            Self::Text(_) => SignalType::Text,
        }
    }

    /// Returns the value as a JSON literal.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Boolean(value) => Value::Bool(*value),
            Self::Integer(value) => Value::from(*value),
            Self::Float(value) => {
                serde_json::Number::from_f64(*value).map_or(Value::Null, Value::Number)
            }
            Self::Text(value) => Value::String(value.clone()),
        }
    }

    /// Renders the value for condition-failure messages.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Boolean(value) => value.to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Text(value) => value.clone(),
        }
    }
}

// ============================================================================
// SECTION: Signal Sources
// ============================================================================

/// Producer class that wrote a signal row.
///
/// # Invariants
/// - Variants are stable for serialization and supersession scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalSource {
    /// Written by evaluation aggregation.
    Evaluation,
    /// Written by an administrator override.
    Manual,
    /// Written by the platform itself.
    System,
    /// Written by the interview domain.
    Interview,
}

impl SignalSource {
    /// Returns the stable wire label for the source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Evaluation => "EVALUATION",
            Self::Manual => "MANUAL",
            Self::System => "SYSTEM",
            Self::Interview => "INTERVIEW",
        }
    }

    /// Parses a source from its stable wire label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "EVALUATION" => Some(Self::Evaluation),
            "MANUAL" => Some(Self::Manual),
            "SYSTEM" => Some(Self::System),
            "INTERVIEW" => Some(Self::Interview),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Signal Records
// ============================================================================

/// One append-only signal row.
///
/// # Invariants
/// - At most one row per `(application_id, key)` has `superseded_at = None`.
/// - Rows are never updated except to set `superseded_at`/`superseded_by` once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    /// Row identifier.
    pub id: i64,
    /// Tenant owning the application.
    pub tenant_id: TenantId,
    /// Application the signal describes.
    pub application_id: ApplicationId,
    /// Signal key.
    pub key: SignalKey,
    /// Typed value.
    pub value: SignalValue,
    /// Producer class that wrote the row.
    pub source: SignalSource,
    /// Producer identifier (evaluation instance, interview round), when any.
    pub source_id: Option<i64>,
    /// User accountable for the write.
    pub set_by: UserId,
    /// Optional note recorded with a manual write.
    pub note: Option<String>,
    /// Write timestamp.
    pub set_at: Timestamp,
    /// Supersession timestamp, set once by the replacing write.
    pub superseded_at: Option<Timestamp>,
    /// Row identifier of the replacing write.
    pub superseded_by: Option<i64>,
}

// ============================================================================
// SECTION: Latest View
// ============================================================================

/// Latest-view snapshot: at most one current value per signal key.
///
/// # Invariants
/// - Keys are unique; iteration order is deterministic (sorted by key).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalSnapshot {
    /// Current values keyed by signal.
    values: BTreeMap<SignalKey, SignalValue>,
}

impl SignalSnapshot {
    /// Creates a snapshot from `(key, value)` pairs; later pairs win.
    #[must_use]
    pub fn new(pairs: Vec<(SignalKey, SignalValue)>) -> Self {
        Self {
            values: pairs.into_iter().collect(),
        }
    }

    /// Returns the current value for a key, if any.
    #[must_use]
    pub fn get(&self, key: &SignalKey) -> Option<&SignalValue> {
        self.values.get(key)
    }

    /// Returns the number of current signals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether the snapshot holds no signals.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates current `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&SignalKey, &SignalValue)> {
        self.values.iter()
    }

    /// Renders the snapshot as a JSON object keyed by signal.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut object = serde_json::Map::new();
        for (key, value) in &self.values {
            object.insert(key.as_str().to_string(), value.to_json());
        }
        Value::Object(object)
    }
}

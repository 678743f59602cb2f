// crates/hireflow-core/src/core/evaluation.rs
// ============================================================================
// Module: Hireflow Evaluation Model
// Description: Templates, instances, participants, and immutable responses.
// Purpose: Model the evaluation lifecycle that feeds aggregated signals.
// Dependencies: crate::core::{identifiers, signal, time}, serde
// ============================================================================

//! ## Overview
//! An evaluation template declares an ordered signal schema and a participant
//! model. Instances bind a template to one application and stage; participants
//! submit exactly one immutable response each, and completion aggregates the
//! responses into new signal versions. Once any instance references a
//! template, structural edits create a new template version instead of
//! mutating the referenced one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ApplicationId;
use crate::core::identifiers::EvaluationId;
use crate::core::identifiers::SignalKey;
use crate::core::identifiers::StageId;
use crate::core::identifiers::TemplateId;
use crate::core::identifiers::TenantId;
use crate::core::identifiers::UserId;
use crate::core::signal::SignalType;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Participant Model
// ============================================================================

/// Participant model of a template.
///
/// # Invariants
/// - Variants are stable for serialization and completion policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantType {
    /// One assessor.
    Single,
    /// A panel submitting independently; completion needs every submission.
    Panel,
    /// Assessors submitting in turn; completion needs at least one.
    Sequential,
}

impl ParticipantType {
    /// Returns the stable wire label for the participant model.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "SINGLE",
            Self::Panel => "PANEL",
            Self::Sequential => "SEQUENTIAL",
        }
    }

    /// Parses a participant model from its stable wire label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "SINGLE" => Some(Self::Single),
            "PANEL" => Some(Self::Panel),
            "SEQUENTIAL" => Some(Self::Sequential),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Aggregation
// ============================================================================

/// Reduction rule turning participant responses into one signal value.
///
/// # Invariants
/// - Variants are stable for serialization; text signals never aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregation {
    /// Boolean majority; ties break toward `false`.
    Majority,
    /// Boolean conjunction over present responses.
    Unanimous,
    /// Boolean disjunction over present responses.
    Any,
    /// Arithmetic mean over present numeric responses.
    Average,
}

impl Aggregation {
    /// Returns the stable wire label for the aggregation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Majority => "MAJORITY",
            Self::Unanimous => "UNANIMOUS",
            Self::Any => "ANY",
            Self::Average => "AVERAGE",
        }
    }

    /// Parses an aggregation from its stable wire label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "MAJORITY" => Some(Self::Majority),
            "UNANIMOUS" => Some(Self::Unanimous),
            "ANY" => Some(Self::Any),
            "AVERAGE" => Some(Self::Average),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Template Schema
// ============================================================================

/// One ordered entry of a template's signal schema.
///
/// # Invariants
/// - `key` is unique within the schema.
/// - `aggregation` is `None` for text fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalField {
    /// Signal key the field produces.
    pub key: SignalKey,
    /// Value type collected from participants.
    pub signal_type: SignalType,
    /// Human-facing field label.
    pub label: String,
    /// Field-level aggregation override, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
    /// Inclusive lower bound for numeric fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Whether a submission must answer the field.
    #[serde(default)]
    pub required: bool,
}

/// Versioned, tenant-scoped evaluation template.
///
/// # Invariants
/// - The schema is immutable once any instance references the template;
///   structural edits create a new version and flip `is_latest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationTemplate {
    /// Template identifier.
    pub id: TemplateId,
    /// Tenant owning the template.
    pub tenant_id: TenantId,
    /// Template name (shared across versions).
    pub name: String,
    /// Version number, 1-based.
    pub version: i64,
    /// Whether this is the latest version of the name.
    pub is_latest: bool,
    /// Whether the template may be instantiated.
    pub is_active: bool,
    /// Participant model.
    pub participant_type: ParticipantType,
    /// Template-level aggregation default, when any.
    pub default_aggregation: Option<Aggregation>,
    /// Ordered signal schema.
    pub schema: Vec<SignalField>,
}

// ============================================================================
// SECTION: Instances and Participants
// ============================================================================

/// Lifecycle status of an evaluation instance.
///
/// # Invariants
/// - Variants are stable for serialization; `Completed` and `Cancelled` are
///   absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationStatus {
    /// Created, no submission yet.
    Pending,
    /// At least one submission received.
    InProgress,
    /// Completed and aggregated.
    Completed,
    /// Cancelled before completion.
    Cancelled,
}

impl EvaluationStatus {
    /// Returns the stable wire label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a status from its stable wire label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "PENDING" => Some(Self::Pending),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// One evaluation bound to an application and stage.
///
/// # Invariants
/// - `(tenant_id, application_id, template_id, stage_id)` is unique, making
///   stage-entry auto-creation idempotent.
/// - `force_completed` implies a non-blank `force_note`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationInstance {
    /// Instance identifier.
    pub id: EvaluationId,
    /// Tenant owning the application.
    pub tenant_id: TenantId,
    /// Application under evaluation.
    pub application_id: ApplicationId,
    /// Template version the instance references.
    pub template_id: TemplateId,
    /// Stage the evaluation belongs to.
    pub stage_id: StageId,
    /// Lifecycle status.
    pub status: EvaluationStatus,
    /// Whether completion was forced with missing submissions.
    pub force_completed: bool,
    /// Justification recorded for a forced completion.
    pub force_note: Option<String>,
    /// User who completed the evaluation.
    pub completed_by: Option<UserId>,
    /// Completion timestamp.
    pub completed_at: Option<Timestamp>,
}

/// Submission status of one participant.
///
/// # Invariants
/// - Variants are stable for serialization; `Submitted` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantStatus {
    /// Invited, no submission yet.
    Pending,
    /// Response submitted.
    Submitted,
    /// Declined to participate.
    Declined,
}

impl ParticipantStatus {
    /// Returns the stable wire label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Submitted => "SUBMITTED",
            Self::Declined => "DECLINED",
        }
    }

    /// Parses a status from its stable wire label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "PENDING" => Some(Self::Pending),
            "SUBMITTED" => Some(Self::Submitted),
            "DECLINED" => Some(Self::Declined),
            _ => None,
        }
    }
}

/// One participant of an evaluation instance.
///
/// # Invariants
/// - `(evaluation_id, user_id)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationParticipant {
    /// Evaluation the participant belongs to.
    pub evaluation_id: EvaluationId,
    /// Participant user.
    pub user_id: UserId,
    /// Submission status.
    pub status: ParticipantStatus,
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Typed literal answering one schema field.
///
/// # Invariants
/// - `Null` marks a field the participant left unanswered; aggregation
///   excludes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseValue {
    /// Unanswered field.
    Null,
    /// Boolean answer.
    Boolean(bool),
    /// Whole-number answer.
    Integer(i64),
    /// Floating-point answer.
    Float(f64),
    /// Free-text answer.
    Text(String),
}

/// Response data mapping signal keys to typed literals.
pub type ResponseData = BTreeMap<SignalKey, ResponseValue>;

/// One immutable participant response.
///
/// # Invariants
/// - Exactly one response exists per participant; no update path exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResponse {
    /// Evaluation the response belongs to.
    pub evaluation_id: EvaluationId,
    /// Submitting participant.
    pub user_id: UserId,
    /// Field answers keyed by signal.
    pub data: ResponseData,
    /// Submission timestamp.
    pub submitted_at: Timestamp,
}

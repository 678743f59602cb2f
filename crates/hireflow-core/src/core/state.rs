// crates/hireflow-core/src/core/state.rs
// ============================================================================
// Module: Hireflow Pipeline State
// Description: Pipeline state, stage history, and execution log records.
// Purpose: Capture the authoritative decision evolution for audit and replay.
// Dependencies: crate::core::{action, identifiers, signal, status, time}, serde
// ============================================================================

//! ## Overview
//! Pipeline state is the single mutable row per application; history and the
//! execution log are append-only. Every successful decision writes at most
//! one history row (deduplicated by event hash) and exactly one execution
//! log row carrying the signal snapshot and condition trace it decided on.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::action::ConditionOperator;
use crate::core::action::MissingPolicy;
use crate::core::identifiers::ActionCode;
use crate::core::identifiers::ApplicationId;
use crate::core::identifiers::JobId;
use crate::core::identifiers::PipelineId;
use crate::core::identifiers::SignalKey;
use crate::core::identifiers::StageId;
use crate::core::identifiers::StatusCode;
use crate::core::identifiers::TenantId;
use crate::core::identifiers::UserId;
use crate::core::signal::SignalSnapshot;
use crate::core::signal::SignalValue;
use crate::core::status::OutcomeType;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Pipeline State
// ============================================================================

/// The single mutable pipeline state row for one application.
///
/// # Invariants
/// - Exactly one row exists per application.
/// - `is_terminal` implies no subsequent mutation of stage, status, or outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    /// Row identifier.
    pub id: i64,
    /// Tenant owning the application.
    pub tenant_id: TenantId,
    /// Application this state tracks.
    pub application_id: ApplicationId,
    /// Job the application targets.
    pub job_id: JobId,
    /// Pipeline the application moves through.
    pub pipeline_id: PipelineId,
    /// Current stage.
    pub current_stage_id: StageId,
    /// Presentation status from the tenant catalog.
    pub status: StatusCode,
    /// Outcome family.
    pub outcome_type: OutcomeType,
    /// Whether the application is terminally decided.
    pub is_terminal: bool,
    /// Timestamp when the current stage was entered.
    pub entered_stage_at: Timestamp,
    /// Timestamp of the last mutation.
    pub updated_at: Timestamp,
}

/// Decoupled pipeline state returned by every engine operation.
///
/// # Invariants
/// - Field values mirror the persisted row at return time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStateView {
    /// Row identifier.
    pub id: i64,
    /// Application this state tracks.
    pub application_id: ApplicationId,
    /// Job the application targets.
    pub job_id: JobId,
    /// Pipeline the application moves through.
    pub pipeline_id: PipelineId,
    /// Current stage.
    pub current_stage_id: StageId,
    /// Presentation status from the tenant catalog.
    pub status: StatusCode,
    /// Timestamp when the current stage was entered.
    pub entered_stage_at: Timestamp,
    /// Timestamp of the last mutation.
    pub updated_at: Timestamp,
    /// Outcome family.
    pub outcome_type: OutcomeType,
    /// Whether the application is terminally decided.
    pub is_terminal: bool,
}

impl From<&PipelineState> for PipelineStateView {
    fn from(state: &PipelineState) -> Self {
        Self {
            id: state.id,
            application_id: state.application_id,
            job_id: state.job_id,
            pipeline_id: state.pipeline_id,
            current_stage_id: state.current_stage_id,
            status: state.status.clone(),
            entered_stage_at: state.entered_stage_at,
            updated_at: state.updated_at,
            outcome_type: state.outcome_type,
            is_terminal: state.is_terminal,
        }
    }
}

// ============================================================================
// SECTION: Stage History
// ============================================================================

/// One append-only state transition record.
///
/// # Invariants
/// - `event_hash` is unique; duplicate transitions are silently dropped at
///   insert time rather than recorded twice.
/// - `to_stage_id = from_stage_id` represents an in-place status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageHistoryRecord {
    /// Row identifier.
    pub id: i64,
    /// Tenant owning the application.
    pub tenant_id: TenantId,
    /// Application the transition belongs to.
    pub application_id: ApplicationId,
    /// Event code naming the transition cause.
    pub event_code: ActionCode,
    /// Stage the application left.
    pub from_stage_id: StageId,
    /// Stage the application entered.
    pub to_stage_id: StageId,
    /// Status after the transition.
    pub status: StatusCode,
    /// Outcome family after the transition.
    pub outcome_type: OutcomeType,
    /// Deduplication hash over the transition tuple.
    pub event_hash: String,
    /// User accountable for the transition, when known.
    pub recorded_by: Option<UserId>,
    /// Optional free-text reason.
    pub reason: Option<String>,
    /// Transition timestamp.
    pub recorded_at: Timestamp,
}

// ============================================================================
// SECTION: Condition Traces
// ============================================================================

/// Reason label attached to a missing-signal condition result.
///
/// # Invariants
/// - Variants are stable for serialization and audit queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionReason {
    /// Signal absent and the policy blocks.
    SignalMissing,
    /// Signal absent and the policy allows.
    MissingAllowed,
    /// Signal absent and the policy allows with a warning.
    MissingWithWarning,
}

/// Per-condition evaluation result recorded in the execution log.
///
/// # Invariants
/// - `actual` is `None` exactly when the signal had no current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionTrace {
    /// Signal key the condition read.
    pub signal: SignalKey,
    /// Comparison operator.
    pub operator: ConditionOperator,
    /// Stringified expected literal.
    pub expected: String,
    /// Actual value at decision time, when present.
    pub actual: Option<SignalValue>,
    /// Missing-signal policy in force.
    pub on_missing: MissingPolicy,
    /// Whether the condition was met.
    pub met: bool,
    /// Reason label for missing-signal outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ConditionReason>,
    /// Whether the condition passed only under a warning policy.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub warning: bool,
}

// ============================================================================
// SECTION: Execution Log
// ============================================================================

/// Immutable audit record of one executed decision.
///
/// # Invariants
/// - Rows are never updated or deleted.
/// - `signal_snapshot` equals the latest signal view at decision time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogRecord {
    /// Row identifier.
    pub id: i64,
    /// Tenant owning the application.
    pub tenant_id: TenantId,
    /// Application the decision touched.
    pub application_id: ApplicationId,
    /// Executed action code.
    pub action_code: ActionCode,
    /// Stage the action was configured on.
    pub stage_id: StageId,
    /// Stage the application left.
    pub from_stage_id: StageId,
    /// Stage the application entered, when the decision moved it.
    pub to_stage_id: Option<StageId>,
    /// Outcome family after the decision.
    pub outcome_type: OutcomeType,
    /// Whether the decision produced a terminal state.
    pub is_terminal: bool,
    /// User who executed the action.
    pub executed_by: UserId,
    /// Decision timestamp.
    pub executed_at: Timestamp,
    /// Latest signal view at decision time.
    pub signal_snapshot: SignalSnapshot,
    /// Per-condition evaluation trace (empty when the action had no gate).
    pub conditions_evaluated: Vec<ConditionTrace>,
    /// Decision note supplied by the caller.
    pub decision_note: Option<String>,
    /// Override justification supplied by the caller.
    pub override_reason: Option<String>,
    /// Reviewer accountable for the decision, when any.
    pub reviewed_by: Option<UserId>,
    /// Approver accountable for the decision, when any.
    pub approved_by: Option<UserId>,
}

// crates/hireflow-core/src/runtime/decision.rs
// ============================================================================
// Module: Hireflow Decision Planning
// Description: Pure planning for action execution, stage moves, and status changes.
// Purpose: Validate, gate, and compute one transition deterministically.
// Dependencies: crate::core, crate::runtime::gate
// ============================================================================

//! ## Overview
//! Decision planning is the pure half of the action engine: given the loaded
//! pipeline state, stage, action definition, capability set, feedback count,
//! and latest signal view, it validates every gate in a single linear
//! sequence and computes the transition to apply. The store layer supplies
//! the rows under its transaction, applies the returned plan, and commits.
//! Planning never performs I/O and never reads the clock.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::ActionCode;
use crate::core::ApplicationId;
use crate::core::Capability;
use crate::core::ConditionTrace;
use crate::core::GateLogic;
use crate::core::OutcomeType;
use crate::core::PipelineState;
use crate::core::SignalSnapshot;
use crate::core::StageActionSpec;
use crate::core::StageId;
use crate::core::StageRef;
use crate::core::StatusCatalog;
use crate::core::StatusCode;
use crate::core::TenantId;
use crate::core::UserId;
use crate::core::hashing::transition_event_hash;
use crate::errors::EngineError;
use crate::runtime::gate::evaluate_gate;

// ============================================================================
// SECTION: Event Codes
// ============================================================================

/// Event code recorded for direct stage moves.
pub const MOVE_STAGE_EVENT: &str = "MOVE_STAGE";
/// Event code recorded for direct status changes.
pub const STATUS_CHANGE_EVENT: &str = "STATUS_CHANGE";
/// Event code recorded when an application is attached to a pipeline.
pub const ATTACH_EVENT: &str = "ATTACHED";

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Caller-supplied arguments for one action execution.
///
/// # Invariants
/// - `tenant_id` and `user_id` come from the authenticated edge, never from
///   request bodies; the plan re-verifies them against persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    /// Caller's tenant.
    pub tenant_id: TenantId,
    /// Caller's user.
    pub user_id: UserId,
    /// Application to decide on.
    pub application_id: ApplicationId,
    /// Action code to execute.
    pub action_code: ActionCode,
    /// Decision note.
    pub notes: Option<String>,
    /// Override justification.
    pub override_reason: Option<String>,
    /// Reviewer accountable for the decision.
    pub reviewed_by: Option<UserId>,
    /// Approver accountable for the decision.
    pub approved_by: Option<UserId>,
}

// ============================================================================
// SECTION: Decision Context
// ============================================================================

/// Rows loaded under the decision transaction, handed to the planner.
///
/// # Invariants
/// - `stage` is the state's current stage; `action` belongs to that stage.
/// - `next_stage` is the stage at `order_index + 1`, when one exists.
/// - `signals` is the latest view read inside the same transaction.
#[derive(Debug)]
pub struct DecisionContext<'a> {
    /// Locked pipeline state row.
    pub state: &'a PipelineState,
    /// Current stage of the application.
    pub stage: &'a StageRef,
    /// Action definition under execution.
    pub action: &'a StageActionSpec,
    /// Next ordered stage of the pipeline, when any.
    pub next_stage: Option<&'a StageRef>,
    /// Capabilities held by the caller's persisted role.
    pub capabilities: &'a [Capability],
    /// Stage feedback rows recorded for the current stage.
    pub feedback_count: u64,
    /// Latest signal view at decision time.
    pub signals: &'a SignalSnapshot,
    /// Tenant status catalog.
    pub statuses: &'a StatusCatalog,
}

// ============================================================================
// SECTION: Decision Plan
// ============================================================================

/// Transition computed by the planner, applied verbatim by the store.
///
/// # Invariants
/// - `is_noop` implies the target configuration equals the current state;
///   the store writes nothing for no-ops.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionPlan {
    /// Stage after the decision.
    pub new_stage_id: StageId,
    /// Whether the stage changed.
    pub stage_changed: bool,
    /// Status after the decision.
    pub new_status: StatusCode,
    /// Outcome family after the decision.
    pub new_outcome: OutcomeType,
    /// Whether the decision produced a terminal state.
    pub new_terminal: bool,
    /// Whether the target configuration equals the current state.
    pub is_noop: bool,
    /// Deduplication hash over the transition tuple.
    pub event_hash: String,
    /// Per-condition evaluation trace for the execution log.
    pub traces: Vec<ConditionTrace>,
}

// ============================================================================
// SECTION: Action Planning
// ============================================================================

/// Plans one action execution.
///
/// Runs the linear validation sequence: tenant assertion, terminal gate,
/// capability check, notes gate, feedback gate, signal gate, hold/activate
/// guards, then computes the transition, resolves the presentation status,
/// and derives the idempotency verdict.
///
/// # Errors
///
/// Returns the [`EngineError`] taxonomy variant matching the first gate that
/// rejects the request.
pub fn plan_action(
    request: &ActionRequest,
    ctx: &DecisionContext<'_>,
) -> Result<DecisionPlan, EngineError> {
    let state = ctx.state;
    let action = ctx.action;

    if state.tenant_id != request.tenant_id {
        return Err(EngineError::TenantMismatch(format!(
            "application {} does not belong to tenant {}",
            request.application_id, request.tenant_id
        )));
    }
    if state.is_terminal {
        return Err(EngineError::TerminalStatus(format!(
            "application {} is terminally decided",
            request.application_id
        )));
    }
    if !action.is_active {
        return Err(EngineError::InvalidAction(format!(
            "action {} is not active on stage {}",
            action.action_code, ctx.stage.name
        )));
    }
    if !ctx.capabilities.contains(&action.required_capability) {
        return Err(EngineError::Forbidden(format!(
            "user {} lacks capability {}",
            request.user_id,
            action.required_capability.as_str()
        )));
    }
    if action.requires_notes && is_blank(request.notes.as_deref()) {
        return Err(EngineError::Validation(format!(
            "action {} requires a decision note",
            action.action_code
        )));
    }
    if action.requires_feedback && ctx.feedback_count == 0 {
        return Err(EngineError::FeedbackRequired(format!(
            "action {} requires stage feedback for {}",
            action.action_code, ctx.stage.name
        )));
    }

    let traces = evaluate_signal_gate(request, ctx)?;

    if let Some(outcome) = action.outcome_type {
        match outcome {
            OutcomeType::Hold if state.outcome_type != OutcomeType::Active => {
                return Err(EngineError::InvalidAction(
                    "only active applications can be put on hold".to_string(),
                ));
            }
            OutcomeType::Active if state.outcome_type != OutcomeType::Hold => {
                return Err(EngineError::InvalidAction(
                    "only held applications can be reactivated".to_string(),
                ));
            }
            _ => {}
        }
    }

    let mut new_stage_id = state.current_stage_id;
    let mut new_outcome = state.outcome_type;
    let new_terminal = action.is_terminal;
    let mut new_status = state.status.clone();

    if action.moves_to_next_stage {
        let Some(next_stage) = ctx.next_stage else {
            return Err(EngineError::InvalidAction(format!(
                "application {} is at the last stage of its pipeline",
                request.application_id
            )));
        };
        new_stage_id = next_stage.id;
    }

    if let Some(outcome) = action.outcome_type {
        new_outcome = outcome;
        let Some(definition) = ctx.statuses.resolve_for_outcome(outcome, new_terminal) else {
            return Err(EngineError::InvalidStatus(format!(
                "no active status configured for outcome {} (terminal: {new_terminal})",
                outcome.as_str()
            )));
        };
        new_status = definition.status_code.clone();
    }

    let stage_changed = new_stage_id != state.current_stage_id;
    let is_noop = !stage_changed
        && new_outcome == state.outcome_type
        && new_terminal == state.is_terminal
        && new_status == state.status;

    let event_hash = transition_event_hash(
        request.application_id,
        &action.action_code,
        state.current_stage_id,
        new_stage_id,
        new_outcome,
        &new_status,
    )
    .map_err(|err| EngineError::Validation(err.to_string()))?;

    Ok(DecisionPlan {
        new_stage_id,
        stage_changed,
        new_status,
        new_outcome,
        new_terminal,
        is_noop,
        event_hash: event_hash.value,
        traces,
    })
}

/// Evaluates the action's signal gate and enforces its verdict.
fn evaluate_signal_gate(
    request: &ActionRequest,
    ctx: &DecisionContext<'_>,
) -> Result<Vec<ConditionTrace>, EngineError> {
    let Some(gate) = &ctx.action.signal_conditions else {
        return Ok(Vec::new());
    };

    let evaluation = evaluate_gate(gate, ctx.signals);
    if evaluation.requires_note_for_warning && is_blank(request.notes.as_deref()) {
        return Err(EngineError::Validation(
            "a decision note is required when signals are missing under a warning policy"
                .to_string(),
        ));
    }
    if !evaluation.passed {
        let failures = match gate.logic {
            GateLogic::All => evaluation.failures.join("; "),
            GateLogic::Any => format!("none of the conditions held: {}", evaluation.failures.join("; ")),
        };
        return Err(EngineError::SignalsNotMet(failures));
    }
    Ok(evaluation.traces)
}

// ============================================================================
// SECTION: Stage Move Planning
// ============================================================================

/// Plans a direct stage move within the application's pipeline.
///
/// # Errors
///
/// Returns [`EngineError`] when the caller lacks `OVERRIDE_FLOW`, the target
/// stage belongs to another pipeline, or the application is terminal.
pub fn plan_stage_move(
    caller_tenant: TenantId,
    state: &PipelineState,
    target: &StageRef,
    capabilities: &[Capability],
) -> Result<DecisionPlan, EngineError> {
    if state.tenant_id != caller_tenant {
        return Err(EngineError::TenantMismatch(format!(
            "application {} does not belong to tenant {caller_tenant}",
            state.application_id
        )));
    }
    if state.is_terminal {
        return Err(EngineError::TerminalStatus(format!(
            "application {} is terminally decided",
            state.application_id
        )));
    }
    if !capabilities.contains(&Capability::OverrideFlow) {
        return Err(EngineError::Forbidden(format!(
            "capability {} is required to move stages directly",
            Capability::OverrideFlow.as_str()
        )));
    }
    if target.pipeline_id != state.pipeline_id {
        return Err(EngineError::InvalidAction(format!(
            "stage {} belongs to another pipeline",
            target.id
        )));
    }

    let is_noop = target.id == state.current_stage_id;
    let event_code = ActionCode::new(MOVE_STAGE_EVENT);
    let event_hash = transition_event_hash(
        state.application_id,
        &event_code,
        state.current_stage_id,
        target.id,
        state.outcome_type,
        &state.status,
    )
    .map_err(|err| EngineError::Validation(err.to_string()))?;

    Ok(DecisionPlan {
        new_stage_id: target.id,
        stage_changed: !is_noop,
        new_status: state.status.clone(),
        new_outcome: state.outcome_type,
        new_terminal: state.is_terminal,
        is_noop,
        event_hash: event_hash.value,
        traces: Vec::new(),
    })
}

// ============================================================================
// SECTION: Status Change Planning
// ============================================================================

/// Plans a direct status change without moving stage.
///
/// # Errors
///
/// Returns [`EngineError`] when the caller lacks `CHANGE_STATUS`, the status
/// is absent or inactive in the tenant catalog, or the application is
/// terminal.
pub fn plan_status_change(
    caller_tenant: TenantId,
    state: &PipelineState,
    status_code: &StatusCode,
    statuses: &StatusCatalog,
    capabilities: &[Capability],
) -> Result<DecisionPlan, EngineError> {
    if state.tenant_id != caller_tenant {
        return Err(EngineError::TenantMismatch(format!(
            "application {} does not belong to tenant {caller_tenant}",
            state.application_id
        )));
    }
    if state.is_terminal {
        return Err(EngineError::TerminalStatus(format!(
            "application {} is terminally decided",
            state.application_id
        )));
    }
    if !capabilities.contains(&Capability::ChangeStatus) {
        return Err(EngineError::Forbidden(format!(
            "capability {} is required to change statuses directly",
            Capability::ChangeStatus.as_str()
        )));
    }
    let Some(definition) = statuses.get(status_code) else {
        return Err(EngineError::InvalidStatus(format!(
            "status {status_code} is not configured for tenant {caller_tenant}"
        )));
    };
    if !definition.is_active {
        return Err(EngineError::InvalidStatus(format!("status {status_code} is not active")));
    }

    let is_noop = &state.status == status_code;
    let event_code = ActionCode::new(STATUS_CHANGE_EVENT);
    let event_hash = transition_event_hash(
        state.application_id,
        &event_code,
        state.current_stage_id,
        state.current_stage_id,
        definition.outcome_type,
        status_code,
    )
    .map_err(|err| EngineError::Validation(err.to_string()))?;

    Ok(DecisionPlan {
        new_stage_id: state.current_stage_id,
        stage_changed: false,
        new_status: status_code.clone(),
        new_outcome: definition.outcome_type,
        new_terminal: definition.is_terminal,
        is_noop,
        event_hash: event_hash.value,
        traces: Vec::new(),
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns whether an optional note is absent or whitespace-only.
#[must_use]
pub fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|value| value.trim().is_empty())
}

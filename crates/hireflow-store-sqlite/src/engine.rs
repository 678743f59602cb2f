// crates/hireflow-store-sqlite/src/engine.rs
// ============================================================================
// Module: Action Engine
// Description: Transactional execution of actions, stage moves, and status changes.
// Purpose: Apply pure decision plans to persisted pipeline state atomically.
// Dependencies: hireflow-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! Every engine operation is one immediate transaction: load the pipeline
//! state row, assert the persisted tenant against the caller, assemble the
//! decision context, delegate planning to `hireflow_core::runtime`, and
//! apply the returned plan: history insert deduplicated by event hash,
//! state mutation, execution-log append, and the stage-entry auto-create
//! cascade. Idempotent no-ops return the unchanged state without writing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use hireflow_core::ActionCode;
use hireflow_core::ApplicationId;
use hireflow_core::Capability;
use hireflow_core::EngineError;
use hireflow_core::JobId;
use hireflow_core::OutcomeType;
use hireflow_core::PipelineId;
use hireflow_core::PipelineState;
use hireflow_core::PipelineStateView;
use hireflow_core::SignalSnapshot;
use hireflow_core::StageActionSpec;
use hireflow_core::StageHistoryRecord;
use hireflow_core::StageId;
use hireflow_core::StageRef;
use hireflow_core::StageType;
use hireflow_core::StatusCode;
use hireflow_core::TenantId;
use hireflow_core::Timestamp;
use hireflow_core::UserId;
use hireflow_core::hashing::transition_event_hash;
use hireflow_core::runtime::ATTACH_EVENT;
use hireflow_core::runtime::ActionRequest;
use hireflow_core::runtime::MOVE_STAGE_EVENT;
use hireflow_core::runtime::STATUS_CHANGE_EVENT;
use hireflow_core::runtime::DecisionContext;
use hireflow_core::runtime::DecisionPlan;
use hireflow_core::runtime::plan_action;
use hireflow_core::runtime::plan_stage_move;
use hireflow_core::runtime::plan_status_change;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::catalog::capabilities_for_user;
use crate::catalog::load_status_catalog;
use crate::catalog::parse_outcome;
use crate::evaluations::auto_create_for_stage;
use crate::signals::latest_signals;
use crate::store::HireflowStore;
use crate::store::SqliteStoreError;
use crate::store::StoreResult;
use crate::store::now;

// ============================================================================
// SECTION: Row Loading
// ============================================================================

/// Loads the pipeline state row for an application, when one exists.
pub(crate) fn load_state_row(
    conn: &Connection,
    application_id: ApplicationId,
) -> StoreResult<Option<PipelineState>> {
    conn.query_row(
        "SELECT id, tenant_id, application_id, job_id, pipeline_id, current_stage_id, status, \
         outcome_type, is_terminal, entered_stage_at, updated_at
         FROM application_pipeline_state WHERE application_id = ?1",
        params![application_id.get() as i64],
        map_state_row,
    )
    .optional()
    .map_err(SqliteStoreError::from_sqlite)?
    .map(finish_state_row)
    .transpose()
}

/// Raw tuple read from a pipeline state row.
type StateRow = (i64, i64, i64, i64, i64, i64, String, String, bool, i64, i64);

/// Maps a pipeline state row into its raw tuple.
fn map_state_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StateRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
    ))
}

/// Converts a raw state tuple into the domain type.
fn finish_state_row(row: StateRow) -> StoreResult<PipelineState> {
    let (
        id,
        tenant,
        application,
        job,
        pipeline,
        stage,
        status,
        outcome,
        is_terminal,
        entered,
        updated,
    ) = row;
    Ok(PipelineState {
        id,
        tenant_id: nonzero(tenant as u64, "tenant_id")?,
        application_id: nonzero(application as u64, "application_id")?,
        job_id: nonzero(job as u64, "job_id")?,
        pipeline_id: nonzero(pipeline as u64, "pipeline_id")?,
        current_stage_id: nonzero(stage as u64, "current_stage_id")?,
        status: StatusCode::new(status),
        outcome_type: parse_outcome(&outcome)?,
        is_terminal,
        entered_stage_at: Timestamp::from_unix_millis(entered),
        updated_at: Timestamp::from_unix_millis(updated),
    })
}

/// Parses a non-zero identifier column, failing as corruption on zero.
fn nonzero<T: IdentifierFromRaw>(raw: u64, column: &str) -> StoreResult<T> {
    T::from_raw_id(raw)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("zero {column} on persisted row")))
}

/// Construction seam for numeric identifiers read from rows.
trait IdentifierFromRaw: Sized {
    /// Builds the identifier from a raw column value.
    fn from_raw_id(raw: u64) -> Option<Self>;
}

impl IdentifierFromRaw for TenantId {
    fn from_raw_id(raw: u64) -> Option<Self> {
        Self::from_raw(raw)
    }
}

impl IdentifierFromRaw for ApplicationId {
    fn from_raw_id(raw: u64) -> Option<Self> {
        Self::from_raw(raw)
    }
}

impl IdentifierFromRaw for JobId {
    fn from_raw_id(raw: u64) -> Option<Self> {
        Self::from_raw(raw)
    }
}

impl IdentifierFromRaw for PipelineId {
    fn from_raw_id(raw: u64) -> Option<Self> {
        Self::from_raw(raw)
    }
}

impl IdentifierFromRaw for StageId {
    fn from_raw_id(raw: u64) -> Option<Self> {
        Self::from_raw(raw)
    }
}

/// Loads a stage row by identifier.
pub(crate) fn load_stage(conn: &Connection, stage_id: StageId) -> StoreResult<Option<StageRef>> {
    conn.query_row(
        "SELECT id, tenant_id, pipeline_id, order_index, name, stage_type, conducted_by
         FROM pipeline_stages WHERE id = ?1",
        params![stage_id.get() as i64],
        map_stage_row,
    )
    .optional()
    .map_err(SqliteStoreError::from_sqlite)?
    .map(finish_stage_row)
    .transpose()
}

/// Loads the stage at the next order index of a pipeline, when one exists.
fn load_next_stage(
    conn: &Connection,
    pipeline_id: PipelineId,
    order_index: i64,
) -> StoreResult<Option<StageRef>> {
    conn.query_row(
        "SELECT id, tenant_id, pipeline_id, order_index, name, stage_type, conducted_by
         FROM pipeline_stages WHERE pipeline_id = ?1 AND order_index = ?2",
        params![pipeline_id.get() as i64, order_index + 1],
        map_stage_row,
    )
    .optional()
    .map_err(SqliteStoreError::from_sqlite)?
    .map(finish_stage_row)
    .transpose()
}

/// Raw tuple read from a stage row.
type StageRow = (i64, i64, i64, i64, String, String, String);

/// Maps a stage row into its raw tuple.
fn map_stage_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StageRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

/// Converts a raw stage tuple into the domain type.
fn finish_stage_row(row: StageRow) -> StoreResult<StageRef> {
    let (id, tenant, pipeline, order_index, name, stage_type, conducted_by) = row;
    Ok(StageRef {
        id: nonzero(id as u64, "stage id")?,
        tenant_id: nonzero(tenant as u64, "tenant_id")?,
        pipeline_id: nonzero(pipeline as u64, "pipeline_id")?,
        order_index,
        name,
        stage_type: StageType::parse(&stage_type)
            .ok_or_else(|| SqliteStoreError::Corrupt(format!("unknown stage type: {stage_type}")))?,
        conducted_by,
    })
}

/// Loads an active action definition for a stage.
fn load_action(
    conn: &Connection,
    tenant_id: TenantId,
    stage_id: StageId,
    action_code: &ActionCode,
) -> StoreResult<Option<StageActionSpec>> {
    let row = conn
        .query_row(
            "SELECT outcome_type, moves_to_next_stage, is_terminal, requires_feedback, \
             requires_notes, required_capability, signal_conditions, is_active
             FROM stage_actions
             WHERE tenant_id = ?1 AND stage_id = ?2 AND action_code = ?3 AND is_active = 1",
            params![tenant_id.get() as i64, stage_id.get() as i64, action_code.as_str()],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, bool>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, bool>(7)?,
                ))
            },
        )
        .optional()
        .map_err(SqliteStoreError::from_sqlite)?;
    let Some((
        outcome,
        moves_to_next_stage,
        is_terminal,
        requires_feedback,
        requires_notes,
        capability,
        conditions,
        is_active,
    )) = row
    else {
        return Ok(None);
    };
    let outcome_type = outcome.as_deref().map(parse_outcome).transpose()?;
    let required_capability = Capability::parse(&capability)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("unknown capability: {capability}")))?;
    let signal_conditions = conditions
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|err| SqliteStoreError::Corrupt(format!("bad signal conditions: {err}")))?;
    Ok(Some(StageActionSpec {
        tenant_id,
        stage_id,
        action_code: action_code.clone(),
        outcome_type,
        moves_to_next_stage,
        is_terminal,
        requires_feedback,
        requires_notes,
        required_capability,
        signal_conditions,
        is_active,
    }))
}

/// Counts feedback rows recorded for an application on a stage.
fn feedback_count(
    conn: &Connection,
    tenant_id: TenantId,
    application_id: ApplicationId,
    stage_name: &str,
) -> StoreResult<u64> {
    conn.query_row(
        "SELECT COUNT(*) FROM stage_feedback
         WHERE tenant_id = ?1 AND application_id = ?2 AND stage_name = ?3",
        params![tenant_id.get() as i64, application_id.get() as i64, stage_name],
        |row| row.get::<_, i64>(0),
    )
    .map(|count| count as u64)
    .map_err(SqliteStoreError::from_sqlite)
}

// ============================================================================
// SECTION: Plan Application
// ============================================================================

/// Inserts a history row, silently dropping duplicate event hashes.
fn insert_history(
    conn: &Connection,
    state: &PipelineState,
    plan: &DecisionPlan,
    event_code: &ActionCode,
    recorded_by: Option<UserId>,
    reason: Option<&str>,
    at: Timestamp,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO application_stage_history (tenant_id, application_id, event_code, \
         from_stage_id, to_stage_id, status, outcome_type, event_hash, recorded_by, reason, \
         recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT (event_hash) DO NOTHING",
        params![
            state.tenant_id.get() as i64,
            state.application_id.get() as i64,
            event_code.as_str(),
            state.current_stage_id.get() as i64,
            plan.new_stage_id.get() as i64,
            plan.new_status.as_str(),
            plan.new_outcome.as_str(),
            plan.event_hash,
            recorded_by.map(|id| id.get() as i64),
            reason,
            at.as_unix_millis(),
        ],
    )
    .map_err(SqliteStoreError::from_sqlite)?;
    Ok(())
}

/// Applies a decision plan to the pipeline state row.
fn apply_state_update(
    conn: &Connection,
    state: &PipelineState,
    plan: &DecisionPlan,
    at: Timestamp,
) -> StoreResult<PipelineState> {
    let entered_stage_at = if plan.stage_changed {
        at
    } else {
        state.entered_stage_at
    };
    conn.execute(
        "UPDATE application_pipeline_state
         SET current_stage_id = ?1, status = ?2, outcome_type = ?3, is_terminal = ?4, \
         entered_stage_at = ?5, updated_at = ?6
         WHERE id = ?7",
        params![
            plan.new_stage_id.get() as i64,
            plan.new_status.as_str(),
            plan.new_outcome.as_str(),
            plan.new_terminal,
            entered_stage_at.as_unix_millis(),
            at.as_unix_millis(),
            state.id,
        ],
    )
    .map_err(SqliteStoreError::from_sqlite)?;
    let mut updated = state.clone();
    updated.current_stage_id = plan.new_stage_id;
    updated.status = plan.new_status.clone();
    updated.outcome_type = plan.new_outcome;
    updated.is_terminal = plan.new_terminal;
    updated.entered_stage_at = entered_stage_at;
    updated.updated_at = at;
    Ok(updated)
}

/// Appends one execution log row for a successful decision.
#[allow(
    clippy::too_many_arguments,
    reason = "Log rows carry the full accountability surface of a decision."
)]
fn insert_execution_log(
    conn: &Connection,
    state: &PipelineState,
    plan: &DecisionPlan,
    request: &ActionRequest,
    stage_id: StageId,
    snapshot: &SignalSnapshot,
    at: Timestamp,
) -> StoreResult<()> {
    let snapshot_json = serde_json::to_string(snapshot)
        .map_err(|err| SqliteStoreError::Corrupt(format!("snapshot serialization: {err}")))?;
    let traces_json = serde_json::to_string(&plan.traces)
        .map_err(|err| SqliteStoreError::Corrupt(format!("trace serialization: {err}")))?;
    let to_stage = plan.stage_changed.then_some(plan.new_stage_id);
    conn.execute(
        "INSERT INTO action_execution_log (tenant_id, application_id, action_code, stage_id, \
         from_stage_id, to_stage_id, outcome_type, is_terminal, executed_by, executed_at, \
         signal_snapshot, conditions_evaluated, decision_note, override_reason, reviewed_by, \
         approved_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            state.tenant_id.get() as i64,
            state.application_id.get() as i64,
            request.action_code.as_str(),
            stage_id.get() as i64,
            state.current_stage_id.get() as i64,
            to_stage.map(|id| id.get() as i64),
            plan.new_outcome.as_str(),
            plan.new_terminal,
            request.user_id.get() as i64,
            at.as_unix_millis(),
            snapshot_json,
            traces_json,
            request.notes,
            request.override_reason,
            request.reviewed_by.map(|id| id.get() as i64),
            request.approved_by.map(|id| id.get() as i64),
        ],
    )
    .map_err(SqliteStoreError::from_sqlite)?;
    Ok(())
}

// ============================================================================
// SECTION: Engine Operations
// ============================================================================

impl HireflowStore {
    /// Attaches an application to a pipeline at its first stage.
    ///
    /// Creates the single pipeline state row, records the initial history
    /// entry, and runs the stage-entry auto-create cascade. A second attach
    /// for the same application fails with `CONFLICT`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] wrapping the engine taxonomy on lookup,
    /// tenant, or uniqueness failure.
    pub fn attach_application(
        &self,
        tenant_id: TenantId,
        application_id: ApplicationId,
        job_id: JobId,
        pipeline_id: PipelineId,
        first_stage_id: StageId,
        user_id: Option<UserId>,
    ) -> StoreResult<PipelineStateView> {
        let at = now();
        self.with_immediate_txn(|tx| {
            let application: Option<(i64, i64)> = tx
                .query_row(
                    "SELECT tenant_id, job_id FROM applications WHERE id = ?1",
                    params![application_id.get() as i64],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(SqliteStoreError::from_sqlite)?;
            let Some((app_tenant, app_job)) = application else {
                return Err(SqliteStoreError::Engine(EngineError::NotFound(format!(
                    "application {application_id} does not exist"
                ))));
            };
            if app_tenant != tenant_id.get() as i64 {
                return Err(SqliteStoreError::Engine(EngineError::TenantMismatch(format!(
                    "application {application_id} does not belong to tenant {tenant_id}"
                ))));
            }
            if app_job != job_id.get() as i64 {
                return Err(SqliteStoreError::Engine(EngineError::Validation(format!(
                    "application {application_id} does not belong to job {job_id}"
                ))));
            }
            let stage = load_stage(tx, first_stage_id)?.ok_or_else(|| {
                SqliteStoreError::Engine(EngineError::NotFound(format!(
                    "stage {first_stage_id} does not exist"
                )))
            })?;
            if stage.tenant_id != tenant_id || stage.pipeline_id != pipeline_id {
                return Err(SqliteStoreError::Engine(EngineError::NotFound(format!(
                    "stage {first_stage_id} is not part of pipeline {pipeline_id}"
                ))));
            }
            let catalog = load_status_catalog(tx, tenant_id)?;
            let Some(initial) = catalog.resolve_for_outcome(OutcomeType::Active, false) else {
                return Err(SqliteStoreError::Engine(EngineError::InvalidStatus(
                    "no active non-terminal status configured for ACTIVE".to_string(),
                )));
            };
            tx.execute(
                "INSERT INTO application_pipeline_state (tenant_id, application_id, job_id, \
                 pipeline_id, current_stage_id, status, outcome_type, is_terminal, \
                 entered_stage_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)",
                params![
                    tenant_id.get() as i64,
                    application_id.get() as i64,
                    job_id.get() as i64,
                    pipeline_id.get() as i64,
                    first_stage_id.get() as i64,
                    initial.status_code.as_str(),
                    OutcomeType::Active.as_str(),
                    at.as_unix_millis(),
                ],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            let state = load_state_row(tx, application_id)?.ok_or_else(|| {
                SqliteStoreError::Corrupt("pipeline state missing after attach".to_string())
            })?;

            let event_code = ActionCode::new(ATTACH_EVENT);
            let event_hash = transition_event_hash(
                application_id,
                &event_code,
                first_stage_id,
                first_stage_id,
                OutcomeType::Active,
                &initial.status_code,
            )
            .map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
            tx.execute(
                "INSERT INTO application_stage_history (tenant_id, application_id, event_code, \
                 from_stage_id, to_stage_id, status, outcome_type, event_hash, recorded_by, \
                 reason, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?7, ?8, NULL, ?9)
                 ON CONFLICT (event_hash) DO NOTHING",
                params![
                    tenant_id.get() as i64,
                    application_id.get() as i64,
                    event_code.as_str(),
                    first_stage_id.get() as i64,
                    initial.status_code.as_str(),
                    OutcomeType::Active.as_str(),
                    event_hash.value,
                    user_id.map(|id| id.get() as i64),
                    at.as_unix_millis(),
                ],
            )
            .map_err(SqliteStoreError::from_sqlite)?;

            auto_create_for_stage(tx, tenant_id, application_id, &stage)?;
            Ok(PipelineStateView::from(&state))
        })
    }

    /// Executes one catalogued action against an application.
    ///
    /// Implements the full linear decision sequence inside a single
    /// transaction. See the crate documentation for the step ordering.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] wrapping the engine taxonomy variant for
    /// the first gate that rejects the request.
    pub fn execute_action(&self, request: &ActionRequest) -> StoreResult<PipelineStateView> {
        let at = now();
        self.with_immediate_txn(|tx| {
            let state = load_state_row(tx, request.application_id)?.ok_or_else(|| {
                SqliteStoreError::Engine(EngineError::NotFound(format!(
                    "application {} has no pipeline state",
                    request.application_id
                )))
            })?;
            if state.tenant_id != request.tenant_id {
                return Err(SqliteStoreError::Engine(EngineError::TenantMismatch(format!(
                    "application {} does not belong to tenant {}",
                    request.application_id, request.tenant_id
                ))));
            }
            if state.is_terminal {
                return Err(SqliteStoreError::Engine(EngineError::TerminalStatus(format!(
                    "application {} is terminally decided",
                    request.application_id
                ))));
            }
            let stage = load_stage(tx, state.current_stage_id)?.ok_or_else(|| {
                SqliteStoreError::Engine(EngineError::NotFound(format!(
                    "stage {} does not exist",
                    state.current_stage_id
                )))
            })?;
            let action = load_action(tx, state.tenant_id, stage.id, &request.action_code)?
                .ok_or_else(|| {
                    SqliteStoreError::Engine(EngineError::InvalidAction(format!(
                        "action {} is not configured for stage {}",
                        request.action_code, stage.name
                    )))
                })?;
            let capabilities = capabilities_for_user(tx, state.tenant_id, request.user_id)?;
            let feedback = feedback_count(tx, state.tenant_id, state.application_id, &stage.name)?;
            let snapshot = latest_signals(tx, state.application_id)?;
            let next_stage = if action.moves_to_next_stage {
                load_next_stage(tx, state.pipeline_id, stage.order_index)?
            } else {
                None
            };
            let catalog = load_status_catalog(tx, state.tenant_id)?;

            let ctx = DecisionContext {
                state: &state,
                stage: &stage,
                action: &action,
                next_stage: next_stage.as_ref(),
                capabilities: &capabilities,
                feedback_count: feedback,
                signals: &snapshot,
                statuses: &catalog,
            };
            let plan = plan_action(request, &ctx).map_err(SqliteStoreError::Engine)?;

            if plan.is_noop {
                return Ok(PipelineStateView::from(&state));
            }

            insert_history(
                tx,
                &state,
                &plan,
                &request.action_code,
                Some(request.user_id),
                request.notes.as_deref(),
                at,
            )?;
            let updated = apply_state_update(tx, &state, &plan, at)?;
            insert_execution_log(tx, &state, &plan, request, stage.id, &snapshot, at)?;
            if plan.stage_changed
                && let Some(next_stage) = next_stage.as_ref()
            {
                auto_create_for_stage(tx, state.tenant_id, state.application_id, next_stage)?;
            }
            Ok(PipelineStateView::from(&updated))
        })
    }

    /// Moves an application to another stage of its pipeline directly.
    ///
    /// Requires `OVERRIDE_FLOW`; linearized with every other decision on the
    /// same application and idempotent on the current stage.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] wrapping the engine taxonomy on lookup,
    /// capability, or tenant failure.
    pub fn move_stage(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        application_id: ApplicationId,
        to_stage_id: StageId,
        reason: Option<String>,
    ) -> StoreResult<PipelineStateView> {
        let at = now();
        self.with_immediate_txn(|tx| {
            let state = load_state_row(tx, application_id)?.ok_or_else(|| {
                SqliteStoreError::Engine(EngineError::NotFound(format!(
                    "application {application_id} has no pipeline state"
                )))
            })?;
            let target = load_stage(tx, to_stage_id)?.ok_or_else(|| {
                SqliteStoreError::Engine(EngineError::NotFound(format!(
                    "stage {to_stage_id} does not exist"
                )))
            })?;
            let capabilities = capabilities_for_user(tx, state.tenant_id, user_id)?;
            let plan = plan_stage_move(tenant_id, &state, &target, &capabilities)
                .map_err(SqliteStoreError::Engine)?;
            if plan.is_noop {
                return Ok(PipelineStateView::from(&state));
            }
            let event_code = ActionCode::new(MOVE_STAGE_EVENT);
            insert_history(tx, &state, &plan, &event_code, Some(user_id), reason.as_deref(), at)?;
            let updated = apply_state_update(tx, &state, &plan, at)?;
            auto_create_for_stage(tx, state.tenant_id, application_id, &target)?;
            Ok(PipelineStateView::from(&updated))
        })
    }

    /// Changes an application's status without moving stage.
    ///
    /// Requires `CHANGE_STATUS`; the status must exist and be active in the
    /// tenant catalog, and the row adopts its outcome and terminal flags.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] wrapping the engine taxonomy on lookup,
    /// capability, or catalog failure.
    pub fn update_status(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        application_id: ApplicationId,
        status_code: StatusCode,
        reason: Option<String>,
    ) -> StoreResult<PipelineStateView> {
        let at = now();
        self.with_immediate_txn(|tx| {
            let state = load_state_row(tx, application_id)?.ok_or_else(|| {
                SqliteStoreError::Engine(EngineError::NotFound(format!(
                    "application {application_id} has no pipeline state"
                )))
            })?;
            let catalog = load_status_catalog(tx, state.tenant_id)?;
            let capabilities = capabilities_for_user(tx, state.tenant_id, user_id)?;
            let plan = plan_status_change(tenant_id, &state, &status_code, &catalog, &capabilities)
                .map_err(SqliteStoreError::Engine)?;
            if plan.is_noop {
                return Ok(PipelineStateView::from(&state));
            }
            let event_code = ActionCode::new(STATUS_CHANGE_EVENT);
            insert_history(tx, &state, &plan, &event_code, Some(user_id), reason.as_deref(), at)?;
            let updated = apply_state_update(tx, &state, &plan, at)?;
            Ok(PipelineStateView::from(&updated))
        })
    }

    /// Returns the stage history of an application, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on tenant mismatch or query failure.
    pub fn stage_history(
        &self,
        tenant_id: TenantId,
        application_id: ApplicationId,
    ) -> StoreResult<Vec<StageHistoryRecord>> {
        let guard = self.lock_connection()?;
        let state = load_state_row(&guard, application_id)?.ok_or_else(|| {
            SqliteStoreError::Engine(EngineError::NotFound(format!(
                "application {application_id} has no pipeline state"
            )))
        })?;
        if state.tenant_id != tenant_id {
            return Err(SqliteStoreError::Engine(EngineError::TenantMismatch(format!(
                "application {application_id} does not belong to tenant {tenant_id}"
            ))));
        }
        let mut stmt = guard
            .prepare(
                "SELECT id, event_code, from_stage_id, to_stage_id, status, outcome_type, \
                 event_hash, recorded_by, reason, recorded_at
                 FROM application_stage_history
                 WHERE application_id = ?1 ORDER BY id DESC",
            )
            .map_err(SqliteStoreError::from_sqlite)?;
        let rows = stmt
            .query_map(params![application_id.get() as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, Option<i64>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, i64>(9)?,
                ))
            })
            .map_err(SqliteStoreError::from_sqlite)?;
        let mut records = Vec::new();
        for row in rows {
            let (id, event, from, to, status, outcome, hash, by, reason, at) =
                row.map_err(SqliteStoreError::from_sqlite)?;
            records.push(StageHistoryRecord {
                id,
                tenant_id,
                application_id,
                event_code: ActionCode::new(event),
                from_stage_id: nonzero(from as u64, "from_stage_id")?,
                to_stage_id: nonzero(to as u64, "to_stage_id")?,
                status: StatusCode::new(status),
                outcome_type: parse_outcome(&outcome)?,
                event_hash: hash,
                recorded_by: by.and_then(|id| UserId::from_raw(id as u64)),
                reason,
                recorded_at: Timestamp::from_unix_millis(at),
            });
        }
        Ok(records)
    }

    /// Returns the current pipeline state for an application.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on tenant mismatch or when the
    /// application has no pipeline state.
    pub fn pipeline_state(
        &self,
        tenant_id: TenantId,
        application_id: ApplicationId,
    ) -> StoreResult<PipelineStateView> {
        let guard = self.lock_connection()?;
        let state = load_state_row(&guard, application_id)?.ok_or_else(|| {
            SqliteStoreError::Engine(EngineError::NotFound(format!(
                "application {application_id} has no pipeline state"
            )))
        })?;
        if state.tenant_id != tenant_id {
            return Err(SqliteStoreError::Engine(EngineError::TenantMismatch(format!(
                "application {application_id} does not belong to tenant {tenant_id}"
            ))));
        }
        Ok(PipelineStateView::from(&state))
    }
}

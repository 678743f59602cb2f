// crates/hireflow-store-sqlite/src/audit.rs
// ============================================================================
// Module: Execution Log Queries
// Description: Read-only projections of the action execution log.
// Purpose: Serve audit listings, single entries, and rejection lookups.
// Dependencies: hireflow-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! The execution log is written only by the action engine and never mutated.
//! These queries project it for audit consumers: filtered listings, single
//! entries, and the most recent terminal failure. Display fields (executor
//! email, stage names) are joined at read time so the log rows themselves
//! stay denormalization-free.

// ============================================================================
// SECTION: Imports
// ============================================================================

use hireflow_core::ActionCode;
use hireflow_core::ApplicationId;
use hireflow_core::Capability;
use hireflow_core::EngineError;
use hireflow_core::ExecutionLogRecord;
use hireflow_core::OutcomeType;
use hireflow_core::StageId;
use hireflow_core::TenantId;
use hireflow_core::Timestamp;
use hireflow_core::UserId;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::ToSql;
use rusqlite::params;

use crate::catalog::parse_outcome;
use crate::catalog::user_has_capability;
use crate::signals::assert_application_tenant;
use crate::store::HireflowStore;
use crate::store::SqliteStoreError;
use crate::store::StoreResult;

// ============================================================================
// SECTION: Filters and Entries
// ============================================================================

/// Filter for execution log listings.
///
/// # Invariants
/// - `limit` of zero returns an empty page.
#[derive(Debug, Clone, Default)]
pub struct DecisionLogFilter {
    /// Restrict to one outcome family.
    pub outcome_type: Option<OutcomeType>,
    /// Restrict to one action code.
    pub action_code: Option<ActionCode>,
    /// Maximum rows returned.
    pub limit: u64,
    /// Rows skipped before the first returned.
    pub offset: u64,
}

impl DecisionLogFilter {
    /// Builds an unfiltered page of the given size.
    #[must_use]
    pub fn page(limit: u64, offset: u64) -> Self {
        Self {
            outcome_type: None,
            action_code: None,
            limit,
            offset,
        }
    }
}

/// One execution log row enriched with display fields.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionLogEntry {
    /// The immutable log record.
    pub record: ExecutionLogRecord,
    /// Email of the executing user, when known.
    pub executed_by_email: Option<String>,
    /// Name of the stage the action was configured on.
    pub stage_name: Option<String>,
    /// Name of the stage the application entered, when the decision moved it.
    pub to_stage_name: Option<String>,
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Column list shared by the audit queries.
const LOG_COLUMNS: &str = "log.id, log.application_id, log.action_code, log.stage_id, \
    log.from_stage_id, log.to_stage_id, log.outcome_type, log.is_terminal, log.executed_by, \
    log.executed_at, log.signal_snapshot, log.conditions_evaluated, log.decision_note, \
    log.override_reason, log.reviewed_by, log.approved_by, users.email, stage.name, to_stage.name";

/// Joins shared by the audit queries.
const LOG_JOINS: &str = "FROM action_execution_log AS log
    LEFT JOIN users ON users.id = log.executed_by
    LEFT JOIN pipeline_stages AS stage ON stage.id = log.stage_id
    LEFT JOIN pipeline_stages AS to_stage ON to_stage.id = log.to_stage_id";

/// Maps one joined log row into an enriched entry.
fn map_log_row(tenant_id: TenantId, row: &rusqlite::Row<'_>) -> StoreResult<DecisionLogEntry> {
    let id: i64 = row.get(0).map_err(SqliteStoreError::from_sqlite)?;
    let application: u64 = row.get::<_, i64>(1).map_err(SqliteStoreError::from_sqlite)? as u64;
    let action: String = row.get(2).map_err(SqliteStoreError::from_sqlite)?;
    let stage: u64 = row.get::<_, i64>(3).map_err(SqliteStoreError::from_sqlite)? as u64;
    let from_stage: u64 = row.get::<_, i64>(4).map_err(SqliteStoreError::from_sqlite)? as u64;
    let to_stage: Option<u64> =
        row.get::<_, Option<i64>>(5).map_err(SqliteStoreError::from_sqlite)?.map(|v| v as u64);
    let outcome: String = row.get(6).map_err(SqliteStoreError::from_sqlite)?;
    let is_terminal: bool = row.get(7).map_err(SqliteStoreError::from_sqlite)?;
    let executed_by: u64 = row.get::<_, i64>(8).map_err(SqliteStoreError::from_sqlite)? as u64;
    let executed_at: i64 = row.get(9).map_err(SqliteStoreError::from_sqlite)?;
    let snapshot: String = row.get(10).map_err(SqliteStoreError::from_sqlite)?;
    let conditions: String = row.get(11).map_err(SqliteStoreError::from_sqlite)?;
    let decision_note: Option<String> = row.get(12).map_err(SqliteStoreError::from_sqlite)?;
    let override_reason: Option<String> = row.get(13).map_err(SqliteStoreError::from_sqlite)?;
    let reviewed_by: Option<u64> =
        row.get::<_, Option<i64>>(14).map_err(SqliteStoreError::from_sqlite)?.map(|v| v as u64);
    let approved_by: Option<u64> =
        row.get::<_, Option<i64>>(15).map_err(SqliteStoreError::from_sqlite)?.map(|v| v as u64);
    let email: Option<String> = row.get(16).map_err(SqliteStoreError::from_sqlite)?;
    let stage_name: Option<String> = row.get(17).map_err(SqliteStoreError::from_sqlite)?;
    let to_stage_name: Option<String> = row.get(18).map_err(SqliteStoreError::from_sqlite)?;

    let record = ExecutionLogRecord {
        id,
        tenant_id,
        application_id: ApplicationId::from_raw(application)
            .ok_or_else(|| SqliteStoreError::Corrupt("zero application_id on log".to_string()))?,
        action_code: ActionCode::new(action),
        stage_id: StageId::from_raw(stage)
            .ok_or_else(|| SqliteStoreError::Corrupt("zero stage_id on log".to_string()))?,
        from_stage_id: StageId::from_raw(from_stage)
            .ok_or_else(|| SqliteStoreError::Corrupt("zero from_stage_id on log".to_string()))?,
        to_stage_id: to_stage.and_then(StageId::from_raw),
        outcome_type: parse_outcome(&outcome)?,
        is_terminal,
        executed_by: UserId::from_raw(executed_by)
            .ok_or_else(|| SqliteStoreError::Corrupt("zero executed_by on log".to_string()))?,
        executed_at: Timestamp::from_unix_millis(executed_at),
        signal_snapshot: serde_json::from_str(&snapshot)
            .map_err(|err| SqliteStoreError::Corrupt(format!("bad log snapshot: {err}")))?,
        conditions_evaluated: serde_json::from_str(&conditions)
            .map_err(|err| SqliteStoreError::Corrupt(format!("bad log conditions: {err}")))?,
        decision_note,
        override_reason,
        reviewed_by: reviewed_by.and_then(UserId::from_raw),
        approved_by: approved_by.and_then(UserId::from_raw),
    };
    Ok(DecisionLogEntry {
        record,
        executed_by_email: email,
        stage_name,
        to_stage_name,
    })
}

// ============================================================================
// SECTION: Audit Queries
// ============================================================================

impl HireflowStore {
    /// Lists execution log entries for an application, newest first.
    ///
    /// Requires `VIEW_TRACKING`; the application's tenant is asserted from
    /// persisted state.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on authorization, tenant, or query
    /// failure.
    pub fn list_decision_log(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        application_id: ApplicationId,
        filter: &DecisionLogFilter,
    ) -> StoreResult<Vec<DecisionLogEntry>> {
        let guard = self.lock_connection()?;
        authorize_audit_read(&guard, tenant_id, user_id, application_id)?;

        let mut sql = format!(
            "SELECT {LOG_COLUMNS} {LOG_JOINS}
             WHERE log.tenant_id = ?1 AND log.application_id = ?2"
        );
        let tenant_param = tenant_id.get() as i64;
        let application_param = application_id.get() as i64;
        let mut params_vec: Vec<Box<dyn ToSql>> =
            vec![Box::new(tenant_param), Box::new(application_param)];
        if let Some(outcome) = filter.outcome_type {
            params_vec.push(Box::new(outcome.as_str().to_string()));
            sql.push_str(&format!(" AND log.outcome_type = ?{}", params_vec.len()));
        }
        if let Some(action) = &filter.action_code {
            params_vec.push(Box::new(action.as_str().to_string()));
            sql.push_str(&format!(" AND log.action_code = ?{}", params_vec.len()));
        }
        params_vec.push(Box::new(filter.limit as i64));
        sql.push_str(&format!(" ORDER BY log.id DESC LIMIT ?{}", params_vec.len()));
        params_vec.push(Box::new(filter.offset as i64));
        sql.push_str(&format!(" OFFSET ?{}", params_vec.len()));

        let mut stmt = guard.prepare(&sql).map_err(SqliteStoreError::from_sqlite)?;
        let bound = params_vec.iter().map(|param| -> &dyn ToSql { param.as_ref() });
        let mut rows = stmt
            .query(rusqlite::params_from_iter(bound))
            .map_err(SqliteStoreError::from_sqlite)?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().map_err(SqliteStoreError::from_sqlite)? {
            entries.push(map_log_row(tenant_id, row)?);
        }
        Ok(entries)
    }

    /// Returns one execution log entry by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] with `NOT_FOUND` when the entry does not
    /// exist for the application.
    pub fn get_decision_log_entry(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        application_id: ApplicationId,
        entry_id: i64,
    ) -> StoreResult<DecisionLogEntry> {
        let guard = self.lock_connection()?;
        authorize_audit_read(&guard, tenant_id, user_id, application_id)?;
        let sql = format!(
            "SELECT {LOG_COLUMNS} {LOG_JOINS}
             WHERE log.tenant_id = ?1 AND log.application_id = ?2 AND log.id = ?3"
        );
        let row = guard
            .query_row(&sql, params![tenant_id.get() as i64, application_id.get() as i64, entry_id], |row| {
                Ok(map_log_row(tenant_id, row))
            })
            .optional()
            .map_err(SqliteStoreError::from_sqlite)?;
        match row {
            Some(entry) => entry,
            None => Err(SqliteStoreError::Engine(EngineError::NotFound(format!(
                "log entry {entry_id} does not exist for application {application_id}"
            )))),
        }
    }

    /// Returns the most recent terminal failure entry, when one exists.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on authorization, tenant, or query
    /// failure.
    pub fn rejection_reason(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        application_id: ApplicationId,
    ) -> StoreResult<Option<DecisionLogEntry>> {
        let guard = self.lock_connection()?;
        authorize_audit_read(&guard, tenant_id, user_id, application_id)?;
        let sql = format!(
            "SELECT {LOG_COLUMNS} {LOG_JOINS}
             WHERE log.tenant_id = ?1 AND log.application_id = ?2
               AND log.is_terminal = 1 AND log.outcome_type = ?3
             ORDER BY log.id DESC LIMIT 1"
        );
        let row = guard
            .query_row(
                &sql,
                params![
                    tenant_id.get() as i64,
                    application_id.get() as i64,
                    OutcomeType::Failure.as_str()
                ],
                |row| Ok(map_log_row(tenant_id, row)),
            )
            .optional()
            .map_err(SqliteStoreError::from_sqlite)?;
        row.transpose()
    }
}

/// Authorizes an audit read: tenant assertion plus `VIEW_TRACKING`.
fn authorize_audit_read(
    conn: &Connection,
    tenant_id: TenantId,
    user_id: UserId,
    application_id: ApplicationId,
) -> StoreResult<()> {
    assert_application_tenant(conn, tenant_id, application_id)?;
    if !user_has_capability(conn, tenant_id, user_id, Capability::ViewTracking)? {
        return Err(SqliteStoreError::Engine(EngineError::Forbidden(format!(
            "capability {} is required to read the decision log",
            Capability::ViewTracking.as_str()
        ))));
    }
    Ok(())
}

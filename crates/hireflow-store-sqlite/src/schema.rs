// crates/hireflow-store-sqlite/src/schema.rs
// ============================================================================
// Module: SQLite Schema
// Description: Versioned DDL for the Hireflow decision-engine store.
// Purpose: Create tables, uniqueness constraints, and state-guard triggers.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! The schema encodes the store-level invariants the engine relies on:
//! exactly one pipeline state row per application, at most one unsuperseded
//! signal row per `(application, key)`, unique transition event hashes, and
//! idempotent evaluation auto-creation. Two triggers guard the pipeline
//! state row itself: statuses must exist and be active in the tenant
//! catalog, and terminal rows are frozen.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rusqlite::Connection;

use crate::store::SqliteStoreError;

// ============================================================================
// SECTION: Schema Version
// ============================================================================

/// `SQLite` schema version for the store.
pub const SCHEMA_VERSION: i64 = 1;

// ============================================================================
// SECTION: DDL
// ============================================================================

/// Table, index, and trigger definitions executed on initialization.
const SCHEMA_DDL: &str = "
CREATE TABLE IF NOT EXISTS schema_meta (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tenants (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    owner_user_id INTEGER NOT NULL REFERENCES users(id),
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS tenant_members (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    role_name TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    UNIQUE (tenant_id, user_id)
);

CREATE TABLE IF NOT EXISTS role_capabilities (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id),
    role_name TEXT NOT NULL,
    capability TEXT NOT NULL,
    UNIQUE (tenant_id, role_name, capability)
);

CREATE TABLE IF NOT EXISTS tenant_statuses (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id),
    status_code TEXT NOT NULL,
    display_name TEXT NOT NULL,
    action_code TEXT NOT NULL,
    is_terminal INTEGER NOT NULL,
    outcome_type TEXT NOT NULL,
    sort_order INTEGER NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    UNIQUE (tenant_id, status_code)
);

CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id),
    title TEXT NOT NULL,
    created_by INTEGER NOT NULL REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS pipelines (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id),
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pipeline_stages (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id),
    pipeline_id INTEGER NOT NULL REFERENCES pipelines(id),
    order_index INTEGER NOT NULL,
    name TEXT NOT NULL,
    stage_type TEXT NOT NULL,
    conducted_by TEXT NOT NULL,
    UNIQUE (pipeline_id, order_index)
);

CREATE TABLE IF NOT EXISTS stage_actions (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id),
    stage_id INTEGER NOT NULL REFERENCES pipeline_stages(id),
    action_code TEXT NOT NULL,
    outcome_type TEXT,
    moves_to_next_stage INTEGER NOT NULL DEFAULT 0,
    is_terminal INTEGER NOT NULL DEFAULT 0,
    requires_feedback INTEGER NOT NULL DEFAULT 0,
    requires_notes INTEGER NOT NULL DEFAULT 0,
    required_capability TEXT NOT NULL,
    signal_conditions TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    UNIQUE (tenant_id, stage_id, action_code)
);

CREATE TABLE IF NOT EXISTS applications (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id),
    job_id INTEGER NOT NULL REFERENCES jobs(id),
    candidate_name TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS application_pipeline_state (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id),
    application_id INTEGER NOT NULL UNIQUE REFERENCES applications(id),
    job_id INTEGER NOT NULL REFERENCES jobs(id),
    pipeline_id INTEGER NOT NULL REFERENCES pipelines(id),
    current_stage_id INTEGER NOT NULL REFERENCES pipeline_stages(id),
    status TEXT NOT NULL,
    outcome_type TEXT NOT NULL,
    is_terminal INTEGER NOT NULL DEFAULT 0,
    entered_stage_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS application_stage_history (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id),
    application_id INTEGER NOT NULL REFERENCES applications(id),
    event_code TEXT NOT NULL,
    from_stage_id INTEGER NOT NULL REFERENCES pipeline_stages(id),
    to_stage_id INTEGER NOT NULL REFERENCES pipeline_stages(id),
    status TEXT NOT NULL,
    outcome_type TEXT NOT NULL,
    event_hash TEXT NOT NULL UNIQUE,
    recorded_by INTEGER REFERENCES users(id),
    reason TEXT,
    recorded_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS application_signals (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id),
    application_id INTEGER NOT NULL REFERENCES applications(id),
    signal_key TEXT NOT NULL,
    signal_type TEXT NOT NULL,
    value_boolean INTEGER,
    value_numeric REAL,
    value_text TEXT,
    source_type TEXT NOT NULL,
    source_id INTEGER,
    set_by INTEGER NOT NULL REFERENCES users(id),
    note TEXT,
    set_at INTEGER NOT NULL,
    superseded_at INTEGER,
    superseded_by INTEGER REFERENCES application_signals(id)
);

CREATE UNIQUE INDEX IF NOT EXISTS application_signals_current
    ON application_signals (application_id, signal_key)
    WHERE superseded_at IS NULL;

CREATE TABLE IF NOT EXISTS action_execution_log (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id),
    application_id INTEGER NOT NULL REFERENCES applications(id),
    action_code TEXT NOT NULL,
    stage_id INTEGER NOT NULL REFERENCES pipeline_stages(id),
    from_stage_id INTEGER NOT NULL REFERENCES pipeline_stages(id),
    to_stage_id INTEGER REFERENCES pipeline_stages(id),
    outcome_type TEXT NOT NULL,
    is_terminal INTEGER NOT NULL,
    executed_by INTEGER NOT NULL REFERENCES users(id),
    executed_at INTEGER NOT NULL,
    signal_snapshot TEXT NOT NULL,
    conditions_evaluated TEXT NOT NULL,
    decision_note TEXT,
    override_reason TEXT,
    reviewed_by INTEGER REFERENCES users(id),
    approved_by INTEGER REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS evaluation_templates (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id),
    name TEXT NOT NULL,
    version INTEGER NOT NULL,
    is_latest INTEGER NOT NULL DEFAULT 1,
    is_active INTEGER NOT NULL DEFAULT 1,
    participant_type TEXT NOT NULL,
    default_aggregation TEXT,
    signal_schema TEXT NOT NULL,
    UNIQUE (tenant_id, name, version)
);

CREATE TABLE IF NOT EXISTS evaluation_instances (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id),
    application_id INTEGER NOT NULL REFERENCES applications(id),
    template_id INTEGER NOT NULL REFERENCES evaluation_templates(id),
    stage_id INTEGER NOT NULL REFERENCES pipeline_stages(id),
    status TEXT NOT NULL,
    force_completed INTEGER NOT NULL DEFAULT 0,
    force_note TEXT,
    completed_by INTEGER REFERENCES users(id),
    completed_at INTEGER,
    UNIQUE (tenant_id, application_id, template_id, stage_id)
);

CREATE TABLE IF NOT EXISTS evaluation_participants (
    id INTEGER PRIMARY KEY,
    evaluation_id INTEGER NOT NULL REFERENCES evaluation_instances(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    status TEXT NOT NULL,
    UNIQUE (evaluation_id, user_id)
);

CREATE TABLE IF NOT EXISTS evaluation_responses (
    id INTEGER PRIMARY KEY,
    evaluation_id INTEGER NOT NULL REFERENCES evaluation_instances(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    response_data TEXT NOT NULL,
    submitted_at INTEGER NOT NULL,
    UNIQUE (evaluation_id, user_id)
);

CREATE TABLE IF NOT EXISTS stage_evaluations (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id),
    stage_id INTEGER NOT NULL REFERENCES pipeline_stages(id),
    template_id INTEGER NOT NULL REFERENCES evaluation_templates(id),
    auto_create INTEGER NOT NULL DEFAULT 1,
    is_active INTEGER NOT NULL DEFAULT 1,
    UNIQUE (tenant_id, stage_id, template_id)
);

CREATE TABLE IF NOT EXISTS stage_feedback (
    id INTEGER PRIMARY KEY,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id),
    application_id INTEGER NOT NULL REFERENCES applications(id),
    stage_name TEXT NOT NULL,
    author_id INTEGER NOT NULL REFERENCES users(id),
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TRIGGER IF NOT EXISTS pipeline_state_status_in_catalog
BEFORE UPDATE OF status ON application_pipeline_state
WHEN NOT EXISTS (
    SELECT 1 FROM tenant_statuses
    WHERE tenant_id = NEW.tenant_id
      AND status_code = NEW.status
      AND is_active = 1
)
BEGIN
    SELECT RAISE(ABORT, 'status not present and active in tenant catalog');
END;

CREATE TRIGGER IF NOT EXISTS pipeline_state_terminal_frozen
BEFORE UPDATE ON application_pipeline_state
WHEN OLD.is_terminal = 1
 AND (NEW.current_stage_id != OLD.current_stage_id
   OR NEW.status != OLD.status
   OR NEW.outcome_type != OLD.outcome_type
   OR NEW.is_terminal != OLD.is_terminal)
BEGIN
    SELECT RAISE(ABORT, 'terminal pipeline state is frozen');
END;
";

// ============================================================================
// SECTION: Initialization
// ============================================================================

/// Creates or validates the store schema on an open connection.
///
/// # Errors
///
/// Returns [`SqliteStoreError`] when DDL execution fails or a persisted
/// schema version disagrees with [`SCHEMA_VERSION`].
pub fn initialize_schema(connection: &Connection) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(SCHEMA_DDL)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let stored: Option<i64> = connection
        .query_row("SELECT version FROM schema_meta LIMIT 1", [], |row| row.get(0))
        .map(Some)
        .or_else(|err| match err {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(SqliteStoreError::Db(other.to_string())),
        })?;
    match stored {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(version) => Err(SqliteStoreError::VersionMismatch(format!(
            "schema version {version} found, expected {SCHEMA_VERSION}"
        ))),
        None => {
            connection
                .execute("INSERT INTO schema_meta (version) VALUES (?1)", [SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            Ok(())
        }
    }
}

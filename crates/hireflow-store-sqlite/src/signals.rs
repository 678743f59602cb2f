// crates/hireflow-store-sqlite/src/signals.rs
// ============================================================================
// Module: Signal Store
// Description: Append-only signal history with versioned supersession.
// Purpose: Persist typed signals with a deterministic latest view per key.
// Dependencies: hireflow-core, rusqlite
// ============================================================================

//! ## Overview
//! Signal writes follow the supersede-then-insert pattern inside the
//! enclosing transaction: the current row for the key is stamped with
//! `superseded_at`, the new row is inserted, and the old row's
//! `superseded_by` points at it. A partial unique index keeps at most one
//! unsuperseded row per `(application, key)`, so racing writers lose with a
//! deterministic `CONFLICT` instead of leaving two current rows.
//!
//! Interview-sourced writes supersede only interview-sourced rows. A key
//! currently held by an evaluation or manual write is left untouched and the
//! interview write is skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use hireflow_core::ApplicationId;
use hireflow_core::Capability;
use hireflow_core::EngineError;
use hireflow_core::SignalKey;
use hireflow_core::SignalRecord;
use hireflow_core::SignalSnapshot;
use hireflow_core::SignalSource;
use hireflow_core::SignalType;
use hireflow_core::SignalValue;
use hireflow_core::TenantId;
use hireflow_core::Timestamp;
use hireflow_core::UserId;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::catalog::member_role;
use crate::catalog::user_has_capability;
use crate::engine::load_state_row;
use crate::store::HireflowStore;
use crate::store::SqliteStoreError;
use crate::store::StoreResult;
use crate::store::now;

// ============================================================================
// SECTION: Signal Writes
// ============================================================================

/// Arguments for one signal write.
#[derive(Debug, Clone)]
pub(crate) struct SignalWrite {
    /// Tenant owning the application.
    pub tenant_id: TenantId,
    /// Application the signal describes.
    pub application_id: ApplicationId,
    /// Signal key.
    pub key: SignalKey,
    /// Typed value to record.
    pub value: SignalValue,
    /// Producer class performing the write.
    pub source: SignalSource,
    /// Producer identifier, when any.
    pub source_id: Option<i64>,
    /// User accountable for the write.
    pub set_by: UserId,
    /// Optional note recorded with a manual write.
    pub note: Option<String>,
}

/// Writes one signal version inside the enclosing transaction.
///
/// Returns the new row identifier, or `None` when an interview-sourced write
/// was skipped because the key is currently held by another source.
pub(crate) fn put_signal(
    conn: &Connection,
    write: &SignalWrite,
    at: Timestamp,
) -> StoreResult<Option<i64>> {
    let current: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, source_type FROM application_signals
             WHERE application_id = ?1 AND signal_key = ?2 AND superseded_at IS NULL",
            params![write.application_id.get(), write.key.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(SqliteStoreError::from_sqlite)?;

    if let Some((_, source)) = &current
        && write.source == SignalSource::Interview
        && source != SignalSource::Interview.as_str()
    {
        return Ok(None);
    }

    if let Some((current_id, _)) = &current {
        conn.execute(
            "UPDATE application_signals SET superseded_at = ?1 WHERE id = ?2",
            params![at.as_unix_millis(), current_id],
        )
        .map_err(SqliteStoreError::from_sqlite)?;
    }

    let (value_boolean, value_numeric, value_text) = value_columns(&write.value);
    conn.execute(
        "INSERT INTO application_signals (tenant_id, application_id, signal_key, signal_type, \
         value_boolean, value_numeric, value_text, source_type, source_id, set_by, note, set_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            write.tenant_id.get(),
            write.application_id.get(),
            write.key.as_str(),
            write.value.signal_type().as_str(),
            value_boolean,
            value_numeric,
            value_text,
            write.source.as_str(),
            write.source_id,
            write.set_by.get(),
            write.note,
            at.as_unix_millis(),
        ],
    )
    .map_err(SqliteStoreError::from_sqlite)?;
    let new_id = conn.last_insert_rowid();

    if let Some((current_id, _)) = &current {
        conn.execute(
            "UPDATE application_signals SET superseded_by = ?1 WHERE id = ?2",
            params![new_id, current_id],
        )
        .map_err(SqliteStoreError::from_sqlite)?;
    }
    Ok(Some(new_id))
}

/// Splits a typed value into its storage columns.
fn value_columns(value: &SignalValue) -> (Option<bool>, Option<f64>, Option<String>) {
    match value {
        SignalValue::Boolean(flag) => (Some(*flag), None, None),
        SignalValue::Integer(number) => {
            #[allow(
                clippy::cast_precision_loss,
                reason = "Signal magnitudes are far below the f64 integer range."
            )]
            let numeric = *number as f64;
            (None, Some(numeric), None)
        }
        SignalValue::Float(number) => (None, Some(*number), None),
        SignalValue::Text(text) => (None, None, Some(text.clone())),
    }
}

// ============================================================================
// SECTION: Signal Reads
// ============================================================================

/// Reads the latest signal view for an application.
pub(crate) fn latest_signals(
    conn: &Connection,
    application_id: ApplicationId,
) -> StoreResult<SignalSnapshot> {
    let mut stmt = conn
        .prepare(
            "SELECT signal_key, signal_type, value_boolean, value_numeric, value_text
             FROM application_signals
             WHERE application_id = ?1 AND superseded_at IS NULL
             ORDER BY signal_key",
        )
        .map_err(SqliteStoreError::from_sqlite)?;
    let rows = stmt
        .query_map(params![application_id.get()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<bool>>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })
        .map_err(SqliteStoreError::from_sqlite)?;
    let mut pairs = Vec::new();
    for row in rows {
        let (key, type_label, boolean, numeric, text) =
            row.map_err(SqliteStoreError::from_sqlite)?;
        let value = assemble_value(&type_label, boolean, numeric, text)?;
        pairs.push((SignalKey::new(key), value));
    }
    Ok(SignalSnapshot::new(pairs))
}

/// Reads the full history of one signal key, newest first.
pub(crate) fn signal_history(
    conn: &Connection,
    tenant_id: TenantId,
    application_id: ApplicationId,
    key: &SignalKey,
) -> StoreResult<Vec<SignalRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, signal_type, value_boolean, value_numeric, value_text, source_type, \
             source_id, set_by, note, set_at, superseded_at, superseded_by
             FROM application_signals
             WHERE application_id = ?1 AND signal_key = ?2
             ORDER BY set_at DESC, id DESC",
        )
        .map_err(SqliteStoreError::from_sqlite)?;
    let rows = stmt
        .query_map(params![application_id.get(), key.as_str()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<bool>>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<i64>>(6)?,
                row.get::<_, u64>(7)?,
                row.get::<_, Option<String>>(8)?,
                row.get::<_, i64>(9)?,
                row.get::<_, Option<i64>>(10)?,
                row.get::<_, Option<i64>>(11)?,
            ))
        })
        .map_err(SqliteStoreError::from_sqlite)?;
    let mut records = Vec::new();
    for row in rows {
        let (
            id,
            type_label,
            boolean,
            numeric,
            text,
            source_label,
            source_id,
            set_by,
            note,
            set_at,
            superseded_at,
            superseded_by,
        ) = row.map_err(SqliteStoreError::from_sqlite)?;
        let value = assemble_value(&type_label, boolean, numeric, text)?;
        let source = SignalSource::parse(&source_label).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!("unknown signal source: {source_label}"))
        })?;
        let set_by = UserId::from_raw(set_by)
            .ok_or_else(|| SqliteStoreError::Corrupt("zero user id on signal row".to_string()))?;
        records.push(SignalRecord {
            id,
            tenant_id,
            application_id,
            key: key.clone(),
            value,
            source,
            source_id,
            set_by,
            note,
            set_at: Timestamp::from_unix_millis(set_at),
            superseded_at: superseded_at.map(Timestamp::from_unix_millis),
            superseded_by,
        });
    }
    Ok(records)
}

/// Rebuilds a typed value from its storage columns.
fn assemble_value(
    type_label: &str,
    boolean: Option<bool>,
    numeric: Option<f64>,
    text: Option<String>,
) -> StoreResult<SignalValue> {
    let signal_type = SignalType::parse(type_label)
        .ok_or_else(|| SqliteStoreError::Corrupt(format!("unknown signal type: {type_label}")))?;
    let value = match signal_type {
        SignalType::Boolean => boolean.map(SignalValue::Boolean),
        SignalType::Integer => {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Integer signals are stored from i64 and round-trip exactly."
            )]
            let as_integer = numeric.map(|number| SignalValue::Integer(number as i64));
            as_integer
        }
        SignalType::Float => numeric.map(SignalValue::Float),
        SignalType::Text => text.map(SignalValue::Text),
    };
    value.ok_or_else(|| {
        SqliteStoreError::Corrupt(format!("signal row missing value for type {type_label}"))
    })
}

// ============================================================================
// SECTION: Public Operations
// ============================================================================

impl HireflowStore {
    /// Records a manual signal override, versioning the key.
    ///
    /// Requires `MANAGE_SETTINGS`; the application's tenant is asserted from
    /// its persisted pipeline state, never from the parameter alone.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] wrapping the engine taxonomy on
    /// authorization, validation, or lookup failure.
    pub fn set_manual_signal(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        application_id: ApplicationId,
        key: SignalKey,
        signal_type: SignalType,
        value: SignalValue,
        note: Option<String>,
    ) -> StoreResult<SignalRecord> {
        if value.signal_type() != signal_type {
            return Err(SqliteStoreError::Engine(EngineError::Validation(format!(
                "value does not match declared signal type {}",
                signal_type.as_str()
            ))));
        }
        let at = now();
        self.with_immediate_txn(|tx| {
            let state = load_state_row(tx, application_id)?.ok_or_else(|| {
                SqliteStoreError::Engine(EngineError::NotFound(format!(
                    "application {application_id} has no pipeline state"
                )))
            })?;
            if state.tenant_id != tenant_id {
                return Err(SqliteStoreError::Engine(EngineError::TenantMismatch(format!(
                    "application {application_id} does not belong to tenant {tenant_id}"
                ))));
            }
            if !user_has_capability(tx, tenant_id, user_id, Capability::ManageSettings)? {
                return Err(SqliteStoreError::Engine(EngineError::Forbidden(format!(
                    "capability {} is required to set manual signals",
                    Capability::ManageSettings.as_str()
                ))));
            }
            let write = SignalWrite {
                tenant_id,
                application_id,
                key: key.clone(),
                value: value.clone(),
                source: SignalSource::Manual,
                source_id: None,
                set_by: user_id,
                note: note.clone(),
            };
            let id = put_signal(tx, &write, at)?.ok_or_else(|| {
                SqliteStoreError::Corrupt("manual signal write was skipped".to_string())
            })?;
            Ok(SignalRecord {
                id,
                tenant_id,
                application_id,
                key: key.clone(),
                value: value.clone(),
                source: SignalSource::Manual,
                source_id: None,
                set_by: user_id,
                note: note.clone(),
                set_at: at,
                superseded_at: None,
                superseded_by: None,
            })
        })
    }

    /// Records a signal produced by the interview domain.
    ///
    /// Interview writes version only interview-sourced rows: a key currently
    /// held by an evaluation or manual write is left untouched and `None` is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on tenant, membership, or lookup failure.
    pub fn record_interview_signal(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        application_id: ApplicationId,
        key: SignalKey,
        value: SignalValue,
        source_id: Option<i64>,
    ) -> StoreResult<Option<i64>> {
        let at = now();
        self.with_immediate_txn(|tx| {
            assert_application_tenant(tx, tenant_id, application_id)?;
            if member_role(tx, tenant_id, user_id)?.is_none() {
                return Err(SqliteStoreError::Engine(EngineError::Forbidden(format!(
                    "user {user_id} is not a member of tenant {tenant_id}"
                ))));
            }
            let write = SignalWrite {
                tenant_id,
                application_id,
                key: key.clone(),
                value: value.clone(),
                source: SignalSource::Interview,
                source_id,
                set_by: user_id,
                note: None,
            };
            put_signal(tx, &write, at)
        })
    }

    /// Returns the latest signal view for an application.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on tenant mismatch or query failure.
    pub fn latest_signals(
        &self,
        tenant_id: TenantId,
        application_id: ApplicationId,
    ) -> StoreResult<SignalSnapshot> {
        let guard = self.lock_connection()?;
        assert_application_tenant(&guard, tenant_id, application_id)?;
        latest_signals(&guard, application_id)
    }

    /// Returns the full history of one signal key, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on tenant mismatch or query failure.
    pub fn signal_history(
        &self,
        tenant_id: TenantId,
        application_id: ApplicationId,
        key: &SignalKey,
    ) -> StoreResult<Vec<SignalRecord>> {
        let guard = self.lock_connection()?;
        assert_application_tenant(&guard, tenant_id, application_id)?;
        signal_history(&guard, tenant_id, application_id, key)
    }
}

/// Asserts an application's persisted tenant against the caller's.
pub(crate) fn assert_application_tenant(
    conn: &Connection,
    tenant_id: TenantId,
    application_id: ApplicationId,
) -> StoreResult<()> {
    let state = load_state_row(conn, application_id)?.ok_or_else(|| {
        SqliteStoreError::Engine(EngineError::NotFound(format!(
            "application {application_id} has no pipeline state"
        )))
    })?;
    if state.tenant_id != tenant_id {
        return Err(SqliteStoreError::Engine(EngineError::TenantMismatch(format!(
            "application {application_id} does not belong to tenant {tenant_id}"
        ))));
    }
    Ok(())
}

// crates/hireflow-store-sqlite/src/evaluations.rs
// ============================================================================
// Module: Evaluation Engine
// Description: Templates, instances, participants, responses, and aggregation.
// Purpose: Drive the evaluation lifecycle that feeds aggregated signals.
// Dependencies: hireflow-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! Templates are versioned: once any instance references one, structural
//! edits insert a new version and flip `is_latest` instead of mutating the
//! referenced schema. Instances are unique per `(tenant, application,
//! template, stage)`, which makes stage-entry auto-creation idempotent.
//! Responses are immutable; completion aggregates the submitted responses in
//! schema order and writes new signal versions with the instance as source.

// ============================================================================
// SECTION: Imports
// ============================================================================

use hireflow_core::Aggregation;
use hireflow_core::ApplicationId;
use hireflow_core::Capability;
use hireflow_core::EngineError;
use hireflow_core::EvaluationId;
use hireflow_core::EvaluationInstance;
use hireflow_core::EvaluationParticipant;
use hireflow_core::EvaluationResponse;
use hireflow_core::EvaluationStatus;
use hireflow_core::EvaluationTemplate;
use hireflow_core::ParticipantStatus;
use hireflow_core::ParticipantType;
use hireflow_core::ResponseData;
use hireflow_core::SignalField;
use hireflow_core::SignalSource;
use hireflow_core::SignalType;
use hireflow_core::StageId;
use hireflow_core::StageRef;
use hireflow_core::TemplateId;
use hireflow_core::TenantId;
use hireflow_core::Timestamp;
use hireflow_core::UserId;
use hireflow_core::aggregate_responses;
use hireflow_core::runtime::is_blank;
use hireflow_core::validate_response;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::catalog::member_role;
use crate::catalog::user_has_capability;
use crate::engine::load_state_row;
use crate::signals::SignalWrite;
use crate::signals::assert_application_tenant;
use crate::signals::put_signal;
use crate::store::HireflowStore;
use crate::store::SqliteStoreError;
use crate::store::StoreResult;
use crate::store::now;

// ============================================================================
// SECTION: Template Loading
// ============================================================================

/// Loads a template row by identifier.
pub(crate) fn load_template(
    conn: &Connection,
    template_id: TemplateId,
) -> StoreResult<Option<EvaluationTemplate>> {
    let row = conn
        .query_row(
            "SELECT tenant_id, name, version, is_latest, is_active, participant_type, \
             default_aggregation, signal_schema
             FROM evaluation_templates WHERE id = ?1",
            params![template_id.get() as i64],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, String>(7)?,
                ))
            },
        )
        .optional()
        .map_err(SqliteStoreError::from_sqlite)?;
    let Some((tenant, name, version, is_latest, is_active, participant, aggregation, schema)) = row
    else {
        return Ok(None);
    };
    Ok(Some(EvaluationTemplate {
        id: template_id,
        tenant_id: TenantId::from_raw(tenant as u64)
            .ok_or_else(|| SqliteStoreError::Corrupt("zero tenant_id on template".to_string()))?,
        name,
        version,
        is_latest,
        is_active,
        participant_type: ParticipantType::parse(&participant).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!("unknown participant type: {participant}"))
        })?,
        default_aggregation: aggregation
            .as_deref()
            .map(|label| {
                Aggregation::parse(label).ok_or_else(|| {
                    SqliteStoreError::Corrupt(format!("unknown aggregation: {label}"))
                })
            })
            .transpose()?,
        schema: serde_json::from_str(&schema)
            .map_err(|err| SqliteStoreError::Corrupt(format!("bad template schema: {err}")))?,
    }))
}

/// Returns whether any instance references a template.
fn template_referenced(conn: &Connection, template_id: TemplateId) -> StoreResult<bool> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM evaluation_instances WHERE template_id = ?1)",
        params![template_id.get() as i64],
        |row| row.get::<_, bool>(0),
    )
    .map_err(SqliteStoreError::from_sqlite)
}

/// Validates a template schema before persisting it.
fn validate_schema(schema: &[SignalField]) -> StoreResult<()> {
    for (index, field) in schema.iter().enumerate() {
        if schema.iter().take(index).any(|other| other.key == field.key) {
            return Err(SqliteStoreError::Engine(EngineError::Validation(format!(
                "duplicate schema key {}",
                field.key
            ))));
        }
        if field.signal_type == SignalType::Text && field.aggregation.is_some() {
            return Err(SqliteStoreError::Engine(EngineError::Validation(format!(
                "text field {} cannot declare an aggregation",
                field.key
            ))));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Instance Loading
// ============================================================================

/// Loads an instance row by identifier.
pub(crate) fn load_instance(
    conn: &Connection,
    evaluation_id: EvaluationId,
) -> StoreResult<Option<EvaluationInstance>> {
    let row = conn
        .query_row(
            "SELECT tenant_id, application_id, template_id, stage_id, status, force_completed, \
             force_note, completed_by, completed_at
             FROM evaluation_instances WHERE id = ?1",
            params![evaluation_id.get() as i64],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, bool>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<i64>>(7)?,
                    row.get::<_, Option<i64>>(8)?,
                ))
            },
        )
        .optional()
        .map_err(SqliteStoreError::from_sqlite)?;
    let Some((tenant, application, template, stage, status, forced, note, by, at)) = row else {
        return Ok(None);
    };
    Ok(Some(EvaluationInstance {
        id: evaluation_id,
        tenant_id: TenantId::from_raw(tenant as u64)
            .ok_or_else(|| SqliteStoreError::Corrupt("zero tenant_id on instance".to_string()))?,
        application_id: ApplicationId::from_raw(application as u64).ok_or_else(|| {
            SqliteStoreError::Corrupt("zero application_id on instance".to_string())
        })?,
        template_id: TemplateId::from_raw(template as u64)
            .ok_or_else(|| SqliteStoreError::Corrupt("zero template_id on instance".to_string()))?,
        stage_id: StageId::from_raw(stage as u64)
            .ok_or_else(|| SqliteStoreError::Corrupt("zero stage_id on instance".to_string()))?,
        status: EvaluationStatus::parse(&status).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!("unknown evaluation status: {status}"))
        })?,
        force_completed: forced,
        force_note: note,
        completed_by: by.and_then(|id| UserId::from_raw(id as u64)),
        completed_at: at.map(Timestamp::from_unix_millis),
    }))
}

/// Loads the participants of an instance.
fn load_participants(
    conn: &Connection,
    evaluation_id: EvaluationId,
) -> StoreResult<Vec<EvaluationParticipant>> {
    let mut stmt = conn
        .prepare(
            "SELECT user_id, status FROM evaluation_participants
             WHERE evaluation_id = ?1 ORDER BY user_id",
        )
        .map_err(SqliteStoreError::from_sqlite)?;
    let rows = stmt
        .query_map(params![evaluation_id.get() as i64], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .map_err(SqliteStoreError::from_sqlite)?;
    let mut participants = Vec::new();
    for row in rows {
        let (user, status) = row.map_err(SqliteStoreError::from_sqlite)?;
        participants.push(EvaluationParticipant {
            evaluation_id,
            user_id: UserId::from_raw(user as u64).ok_or_else(|| {
                SqliteStoreError::Corrupt("zero user_id on participant".to_string())
            })?,
            status: ParticipantStatus::parse(&status).ok_or_else(|| {
                SqliteStoreError::Corrupt(format!("unknown participant status: {status}"))
            })?,
        });
    }
    Ok(participants)
}

/// Loads the submitted responses of an instance.
fn load_responses(
    conn: &Connection,
    evaluation_id: EvaluationId,
) -> StoreResult<Vec<EvaluationResponse>> {
    let mut stmt = conn
        .prepare(
            "SELECT user_id, response_data, submitted_at FROM evaluation_responses
             WHERE evaluation_id = ?1 ORDER BY user_id",
        )
        .map_err(SqliteStoreError::from_sqlite)?;
    let rows = stmt
        .query_map(params![evaluation_id.get() as i64], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, i64>(2)?))
        })
        .map_err(SqliteStoreError::from_sqlite)?;
    let mut responses = Vec::new();
    for row in rows {
        let (user, data, at) = row.map_err(SqliteStoreError::from_sqlite)?;
        responses.push(EvaluationResponse {
            evaluation_id,
            user_id: UserId::from_raw(user as u64)
                .ok_or_else(|| SqliteStoreError::Corrupt("zero user_id on response".to_string()))?,
            data: serde_json::from_str(&data)
                .map_err(|err| SqliteStoreError::Corrupt(format!("bad response data: {err}")))?,
            submitted_at: Timestamp::from_unix_millis(at),
        });
    }
    Ok(responses)
}

// ============================================================================
// SECTION: Auto-Creation
// ============================================================================

/// Creates the configured evaluations for a stage entry, idempotently.
///
/// For HR-conducted stages the HR participant is resolved as the job creator
/// when they are an active tenant member, falling back to the tenant owner,
/// and added as PENDING once per instance.
pub(crate) fn auto_create_for_stage(
    conn: &Connection,
    tenant_id: TenantId,
    application_id: ApplicationId,
    stage: &StageRef,
) -> StoreResult<()> {
    let mut stmt = conn
        .prepare(
            "SELECT template_id FROM stage_evaluations
             WHERE tenant_id = ?1 AND stage_id = ?2 AND auto_create = 1 AND is_active = 1
             ORDER BY template_id",
        )
        .map_err(SqliteStoreError::from_sqlite)?;
    let rows = stmt
        .query_map(params![tenant_id.get() as i64, stage.id.get() as i64], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(SqliteStoreError::from_sqlite)?;
    let mut template_ids = Vec::new();
    for row in rows {
        template_ids.push(row.map_err(SqliteStoreError::from_sqlite)?);
    }
    drop(stmt);

    let hr_participant = if stage.is_hr_conducted() {
        Some(resolve_hr_participant(conn, tenant_id, application_id)?)
    } else {
        None
    };

    for template_id in template_ids {
        conn.execute(
            "INSERT INTO evaluation_instances (tenant_id, application_id, template_id, stage_id, \
             status)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (tenant_id, application_id, template_id, stage_id) DO NOTHING",
            params![
                tenant_id.get() as i64,
                application_id.get() as i64,
                template_id,
                stage.id.get() as i64,
                EvaluationStatus::Pending.as_str(),
            ],
        )
        .map_err(SqliteStoreError::from_sqlite)?;
        if let Some(hr_user) = hr_participant {
            let instance_id: i64 = conn
                .query_row(
                    "SELECT id FROM evaluation_instances
                     WHERE tenant_id = ?1 AND application_id = ?2 AND template_id = ?3 \
                     AND stage_id = ?4",
                    params![
                        tenant_id.get() as i64,
                        application_id.get() as i64,
                        template_id,
                        stage.id.get() as i64
                    ],
                    |row| row.get(0),
                )
                .map_err(SqliteStoreError::from_sqlite)?;
            conn.execute(
                "INSERT INTO evaluation_participants (evaluation_id, user_id, status)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (evaluation_id, user_id) DO NOTHING",
                params![instance_id, hr_user.get() as i64, ParticipantStatus::Pending.as_str()],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
        }
    }
    Ok(())
}

/// Resolves the HR participant: job creator if active in the tenant, else owner.
fn resolve_hr_participant(
    conn: &Connection,
    tenant_id: TenantId,
    application_id: ApplicationId,
) -> StoreResult<UserId> {
    let creator: Option<i64> = conn
        .query_row(
            "SELECT jobs.created_by FROM applications
             JOIN jobs ON jobs.id = applications.job_id
             WHERE applications.id = ?1",
            params![application_id.get() as i64],
            |row| row.get(0),
        )
        .optional()
        .map_err(SqliteStoreError::from_sqlite)?;
    if let Some(creator) = creator {
        let creator = UserId::from_raw(creator as u64)
            .ok_or_else(|| SqliteStoreError::Corrupt("zero job creator".to_string()))?;
        if member_role(conn, tenant_id, creator)?.is_some() {
            return Ok(creator);
        }
    }
    let owner: i64 = conn
        .query_row(
            "SELECT owner_user_id FROM tenants WHERE id = ?1",
            params![tenant_id.get() as i64],
            |row| row.get(0),
        )
        .map_err(SqliteStoreError::from_sqlite)?;
    UserId::from_raw(owner as u64)
        .ok_or_else(|| SqliteStoreError::Corrupt("zero tenant owner".to_string()))
}

// ============================================================================
// SECTION: Template Operations
// ============================================================================

impl HireflowStore {
    /// Creates a new evaluation template at version 1.
    ///
    /// Requires `MANAGE_SETTINGS`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on authorization or schema validation
    /// failure.
    pub fn create_template(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        name: &str,
        participant_type: ParticipantType,
        default_aggregation: Option<Aggregation>,
        schema: Vec<SignalField>,
    ) -> StoreResult<EvaluationTemplate> {
        validate_schema(&schema)?;
        self.with_immediate_txn(|tx| {
            if !user_has_capability(tx, tenant_id, user_id, Capability::ManageSettings)? {
                return Err(SqliteStoreError::Engine(EngineError::Forbidden(format!(
                    "capability {} is required to manage templates",
                    Capability::ManageSettings.as_str()
                ))));
            }
            let schema_json = serde_json::to_string(&schema)
                .map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
            tx.execute(
                "INSERT INTO evaluation_templates (tenant_id, name, version, is_latest, \
                 is_active, participant_type, default_aggregation, signal_schema)
                 VALUES (?1, ?2, 1, 1, 1, ?3, ?4, ?5)",
                params![
                    tenant_id.get() as i64,
                    name,
                    participant_type.as_str(),
                    default_aggregation.map(Aggregation::as_str),
                    schema_json,
                ],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            let id = TemplateId::from_raw(u64::try_from(tx.last_insert_rowid()).unwrap_or(0))
                .ok_or_else(|| SqliteStoreError::Corrupt("zero template rowid".to_string()))?;
            Ok(EvaluationTemplate {
                id,
                tenant_id,
                name: name.to_string(),
                version: 1,
                is_latest: true,
                is_active: true,
                participant_type,
                default_aggregation,
                schema,
            })
        })
    }

    /// Updates a template, versioning it when instances reference it.
    ///
    /// Requires `MANAGE_SETTINGS`. A referenced template gets a new version
    /// row with `is_latest` flipped; an unreferenced one is edited in place.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on authorization, lookup, or validation
    /// failure.
    pub fn update_template(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        template_id: TemplateId,
        participant_type: ParticipantType,
        default_aggregation: Option<Aggregation>,
        schema: Vec<SignalField>,
    ) -> StoreResult<EvaluationTemplate> {
        validate_schema(&schema)?;
        self.with_immediate_txn(|tx| {
            if !user_has_capability(tx, tenant_id, user_id, Capability::ManageSettings)? {
                return Err(SqliteStoreError::Engine(EngineError::Forbidden(format!(
                    "capability {} is required to manage templates",
                    Capability::ManageSettings.as_str()
                ))));
            }
            let template = load_template(tx, template_id)?.ok_or_else(|| {
                SqliteStoreError::Engine(EngineError::NotFound(format!(
                    "template {template_id} does not exist"
                )))
            })?;
            if template.tenant_id != tenant_id {
                return Err(SqliteStoreError::Engine(EngineError::TenantMismatch(format!(
                    "template {template_id} does not belong to tenant {tenant_id}"
                ))));
            }
            let schema_json = serde_json::to_string(&schema)
                .map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;

            if template_referenced(tx, template_id)? {
                tx.execute(
                    "UPDATE evaluation_templates SET is_latest = 0 \
                     WHERE tenant_id = ?1 AND name = ?2",
                    params![tenant_id.get() as i64, template.name],
                )
                .map_err(SqliteStoreError::from_sqlite)?;
                let next_version = template.version + 1;
                tx.execute(
                    "INSERT INTO evaluation_templates (tenant_id, name, version, is_latest, \
                     is_active, participant_type, default_aggregation, signal_schema)
                     VALUES (?1, ?2, ?3, 1, 1, ?4, ?5, ?6)",
                    params![
                        tenant_id.get() as i64,
                        template.name,
                        next_version,
                        participant_type.as_str(),
                        default_aggregation.map(Aggregation::as_str),
                        schema_json,
                    ],
                )
                .map_err(SqliteStoreError::from_sqlite)?;
                let id = TemplateId::from_raw(u64::try_from(tx.last_insert_rowid()).unwrap_or(0))
                    .ok_or_else(|| SqliteStoreError::Corrupt("zero template rowid".to_string()))?;
                Ok(EvaluationTemplate {
                    id,
                    tenant_id,
                    name: template.name,
                    version: next_version,
                    is_latest: true,
                    is_active: true,
                    participant_type,
                    default_aggregation,
                    schema,
                })
            } else {
                tx.execute(
                    "UPDATE evaluation_templates SET participant_type = ?1, \
                     default_aggregation = ?2, signal_schema = ?3 WHERE id = ?4",
                    params![
                        participant_type.as_str(),
                        default_aggregation.map(Aggregation::as_str),
                        schema_json,
                        template_id.get() as i64,
                    ],
                )
                .map_err(SqliteStoreError::from_sqlite)?;
                Ok(EvaluationTemplate {
                    participant_type,
                    default_aggregation,
                    schema,
                    ..template
                })
            }
        })
    }

    /// Deactivates a template without touching existing instances.
    ///
    /// Requires `MANAGE_SETTINGS`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on authorization or lookup failure.
    pub fn soft_delete_template(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        template_id: TemplateId,
    ) -> StoreResult<()> {
        self.with_immediate_txn(|tx| {
            if !user_has_capability(tx, tenant_id, user_id, Capability::ManageSettings)? {
                return Err(SqliteStoreError::Engine(EngineError::Forbidden(format!(
                    "capability {} is required to manage templates",
                    Capability::ManageSettings.as_str()
                ))));
            }
            let template = load_template(tx, template_id)?.ok_or_else(|| {
                SqliteStoreError::Engine(EngineError::NotFound(format!(
                    "template {template_id} does not exist"
                )))
            })?;
            if template.tenant_id != tenant_id {
                return Err(SqliteStoreError::Engine(EngineError::TenantMismatch(format!(
                    "template {template_id} does not belong to tenant {tenant_id}"
                ))));
            }
            tx.execute(
                "UPDATE evaluation_templates SET is_active = 0 WHERE id = ?1",
                params![template_id.get() as i64],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            Ok(())
        })
    }
}

// ============================================================================
// SECTION: Instance Operations
// ============================================================================

impl HireflowStore {
    /// Creates an evaluation instance for an application.
    ///
    /// The stage defaults to the application's current stage. A duplicate
    /// `(tenant, application, template, stage)` fails with `CONFLICT`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on lookup, tenant, or uniqueness failure.
    pub fn create_instance(
        &self,
        tenant_id: TenantId,
        application_id: ApplicationId,
        template_id: TemplateId,
        stage_id: Option<StageId>,
    ) -> StoreResult<EvaluationInstance> {
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
            let template = load_template(tx, template_id)?.ok_or_else(|| {
                SqliteStoreError::Engine(EngineError::NotFound(format!(
                    "template {template_id} does not exist"
                )))
            })?;
            if template.tenant_id != tenant_id {
                return Err(SqliteStoreError::Engine(EngineError::TenantMismatch(format!(
                    "template {template_id} does not belong to tenant {tenant_id}"
                ))));
            }
            if !template.is_active {
                return Err(SqliteStoreError::Engine(EngineError::InvalidAction(format!(
                    "template {template_id} is not active"
                ))));
            }
            let stage_id = stage_id.unwrap_or(state.current_stage_id);
            tx.execute(
                "INSERT INTO evaluation_instances (tenant_id, application_id, template_id, \
                 stage_id, status)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    tenant_id.get() as i64,
                    application_id.get() as i64,
                    template_id.get() as i64,
                    stage_id.get() as i64,
                    EvaluationStatus::Pending.as_str(),
                ],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            let id = EvaluationId::from_raw(u64::try_from(tx.last_insert_rowid()).unwrap_or(0))
                .ok_or_else(|| SqliteStoreError::Corrupt("zero instance rowid".to_string()))?;
            Ok(EvaluationInstance {
                id,
                tenant_id,
                application_id,
                template_id,
                stage_id,
                status: EvaluationStatus::Pending,
                force_completed: false,
                force_note: None,
                completed_by: None,
                completed_at: None,
            })
        })
    }

    /// Adds a PENDING participant to an open instance.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] with `CONFLICT` for duplicates and
    /// `INVALID_ACTION` for closed instances.
    pub fn add_participant(
        &self,
        tenant_id: TenantId,
        evaluation_id: EvaluationId,
        user_id: UserId,
    ) -> StoreResult<()> {
        self.with_immediate_txn(|tx| {
            require_open_instance(tx, tenant_id, evaluation_id)?;
            tx.execute(
                "INSERT INTO evaluation_participants (evaluation_id, user_id, status)
                 VALUES (?1, ?2, ?3)",
                params![
                    evaluation_id.get() as i64,
                    user_id.get() as i64,
                    ParticipantStatus::Pending.as_str()
                ],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            Ok(())
        })
    }

    /// Removes a participant who has not submitted.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] with `VALIDATION` once the participant
    /// has submitted.
    pub fn remove_participant(
        &self,
        tenant_id: TenantId,
        evaluation_id: EvaluationId,
        user_id: UserId,
    ) -> StoreResult<()> {
        self.with_immediate_txn(|tx| {
            require_open_instance(tx, tenant_id, evaluation_id)?;
            let status: Option<String> = tx
                .query_row(
                    "SELECT status FROM evaluation_participants
                     WHERE evaluation_id = ?1 AND user_id = ?2",
                    params![evaluation_id.get() as i64, user_id.get() as i64],
                    |row| row.get(0),
                )
                .optional()
                .map_err(SqliteStoreError::from_sqlite)?;
            let Some(status) = status else {
                return Err(SqliteStoreError::Engine(EngineError::NotFound(format!(
                    "user {user_id} is not a participant of evaluation {evaluation_id}"
                ))));
            };
            if status == ParticipantStatus::Submitted.as_str() {
                return Err(SqliteStoreError::Engine(EngineError::Validation(format!(
                    "participant {user_id} has already submitted"
                ))));
            }
            tx.execute(
                "DELETE FROM evaluation_participants WHERE evaluation_id = ?1 AND user_id = ?2",
                params![evaluation_id.get() as i64, user_id.get() as i64],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            Ok(())
        })
    }

    /// Cancels an instance that has not completed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] with `INVALID_ACTION` for completed
    /// instances.
    pub fn cancel_instance(
        &self,
        tenant_id: TenantId,
        evaluation_id: EvaluationId,
    ) -> StoreResult<()> {
        self.with_immediate_txn(|tx| {
            let instance = load_instance(tx, evaluation_id)?.ok_or_else(|| {
                SqliteStoreError::Engine(EngineError::NotFound(format!(
                    "evaluation {evaluation_id} does not exist"
                )))
            })?;
            if instance.tenant_id != tenant_id {
                return Err(SqliteStoreError::Engine(EngineError::TenantMismatch(format!(
                    "evaluation {evaluation_id} does not belong to tenant {tenant_id}"
                ))));
            }
            if instance.status == EvaluationStatus::Completed {
                return Err(SqliteStoreError::Engine(EngineError::InvalidAction(format!(
                    "evaluation {evaluation_id} has already completed"
                ))));
            }
            tx.execute(
                "UPDATE evaluation_instances SET status = ?1 WHERE id = ?2",
                params![EvaluationStatus::Cancelled.as_str(), evaluation_id.get() as i64],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            Ok(())
        })
    }
}

/// Loads an instance and rejects closed or foreign ones.
fn require_open_instance(
    conn: &Connection,
    tenant_id: TenantId,
    evaluation_id: EvaluationId,
) -> StoreResult<EvaluationInstance> {
    let instance = load_instance(conn, evaluation_id)?.ok_or_else(|| {
        SqliteStoreError::Engine(EngineError::NotFound(format!(
            "evaluation {evaluation_id} does not exist"
        )))
    })?;
    if instance.tenant_id != tenant_id {
        return Err(SqliteStoreError::Engine(EngineError::TenantMismatch(format!(
            "evaluation {evaluation_id} does not belong to tenant {tenant_id}"
        ))));
    }
    if !matches!(instance.status, EvaluationStatus::Pending | EvaluationStatus::InProgress) {
        return Err(SqliteStoreError::Engine(EngineError::InvalidAction(format!(
            "evaluation {evaluation_id} is {}",
            instance.status.as_str()
        ))));
    }
    Ok(instance)
}

// ============================================================================
// SECTION: Responses and Completion
// ============================================================================

impl HireflowStore {
    /// Records one immutable participant response.
    ///
    /// The submitter must be a PENDING participant of an open instance. The
    /// submission flips the participant to SUBMITTED and a PENDING instance
    /// to IN_PROGRESS.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] with `FORBIDDEN` for non-participants,
    /// `CONFLICT` for second submissions, and `VALIDATION` for schema
    /// mismatches.
    pub fn submit_response(
        &self,
        user_id: UserId,
        evaluation_id: EvaluationId,
        data: &ResponseData,
    ) -> StoreResult<()> {
        let at = now();
        self.with_immediate_txn(|tx| {
            let instance = load_instance(tx, evaluation_id)?.ok_or_else(|| {
                SqliteStoreError::Engine(EngineError::NotFound(format!(
                    "evaluation {evaluation_id} does not exist"
                )))
            })?;
            if !matches!(
                instance.status,
                EvaluationStatus::Pending | EvaluationStatus::InProgress
            ) {
                return Err(SqliteStoreError::Engine(EngineError::InvalidAction(format!(
                    "evaluation {evaluation_id} is {}",
                    instance.status.as_str()
                ))));
            }
            let status: Option<String> = tx
                .query_row(
                    "SELECT status FROM evaluation_participants
                     WHERE evaluation_id = ?1 AND user_id = ?2",
                    params![evaluation_id.get() as i64, user_id.get() as i64],
                    |row| row.get(0),
                )
                .optional()
                .map_err(SqliteStoreError::from_sqlite)?;
            let Some(status) = status else {
                return Err(SqliteStoreError::Engine(EngineError::Forbidden(format!(
                    "user {user_id} is not a participant of evaluation {evaluation_id}"
                ))));
            };
            match ParticipantStatus::parse(&status) {
                Some(ParticipantStatus::Pending) => {}
                Some(ParticipantStatus::Submitted) => {
                    return Err(SqliteStoreError::Engine(EngineError::Conflict(format!(
                        "participant {user_id} has already submitted"
                    ))));
                }
                Some(ParticipantStatus::Declined) => {
                    return Err(SqliteStoreError::Engine(EngineError::Forbidden(format!(
                        "participant {user_id} declined evaluation {evaluation_id}"
                    ))));
                }
                None => {
                    return Err(SqliteStoreError::Corrupt(format!(
                        "unknown participant status: {status}"
                    )));
                }
            }
            let template = load_template(tx, instance.template_id)?.ok_or_else(|| {
                SqliteStoreError::Corrupt(format!(
                    "template {} missing for evaluation {evaluation_id}",
                    instance.template_id
                ))
            })?;
            validate_response(&template, data).map_err(SqliteStoreError::Engine)?;

            let data_json = serde_json::to_string(data)
                .map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
            tx.execute(
                "INSERT INTO evaluation_responses (evaluation_id, user_id, response_data, \
                 submitted_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    evaluation_id.get() as i64,
                    user_id.get() as i64,
                    data_json,
                    at.as_unix_millis()
                ],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            tx.execute(
                "UPDATE evaluation_participants SET status = ?1
                 WHERE evaluation_id = ?2 AND user_id = ?3",
                params![
                    ParticipantStatus::Submitted.as_str(),
                    evaluation_id.get() as i64,
                    user_id.get() as i64
                ],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            if instance.status == EvaluationStatus::Pending {
                tx.execute(
                    "UPDATE evaluation_instances SET status = ?1 WHERE id = ?2",
                    params![EvaluationStatus::InProgress.as_str(), evaluation_id.get() as i64],
                )
                .map_err(SqliteStoreError::from_sqlite)?;
            }
            Ok(())
        })
    }

    /// Completes an evaluation and aggregates its responses into signals.
    ///
    /// PANEL instances require every participant SUBMITTED; SINGLE and
    /// SEQUENTIAL require at least one submission. `force` overrides either
    /// rule and demands a non-blank `force_note`. Aggregated values are
    /// written through the signal store with the instance as source.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] with `EVALUATION_INCOMPLETE` when
    /// submissions are missing and completion is not forced.
    pub fn complete_evaluation(
        &self,
        user_id: UserId,
        evaluation_id: EvaluationId,
        force: bool,
        force_note: Option<String>,
    ) -> StoreResult<EvaluationInstance> {
        let at = now();
        self.with_immediate_txn(|tx| {
            let instance = load_instance(tx, evaluation_id)?.ok_or_else(|| {
                SqliteStoreError::Engine(EngineError::NotFound(format!(
                    "evaluation {evaluation_id} does not exist"
                )))
            })?;
            if !matches!(
                instance.status,
                EvaluationStatus::Pending | EvaluationStatus::InProgress
            ) {
                return Err(SqliteStoreError::Engine(EngineError::InvalidAction(format!(
                    "evaluation {evaluation_id} is {}",
                    instance.status.as_str()
                ))));
            }
            if member_role(tx, instance.tenant_id, user_id)?.is_none() {
                return Err(SqliteStoreError::Engine(EngineError::Forbidden(format!(
                    "user {user_id} is not a member of tenant {}",
                    instance.tenant_id
                ))));
            }
            if force && is_blank(force_note.as_deref()) {
                return Err(SqliteStoreError::Engine(EngineError::Validation(
                    "forced completion requires a justification note".to_string(),
                )));
            }
            let template = load_template(tx, instance.template_id)?.ok_or_else(|| {
                SqliteStoreError::Corrupt(format!(
                    "template {} missing for evaluation {evaluation_id}",
                    instance.template_id
                ))
            })?;
            let participants = load_participants(tx, evaluation_id)?;
            let submitted = participants
                .iter()
                .filter(|participant| participant.status == ParticipantStatus::Submitted)
                .count();
            if !force {
                match template.participant_type {
                    ParticipantType::Panel => {
                        if participants.is_empty() || submitted < participants.len() {
                            return Err(SqliteStoreError::Engine(
                                EngineError::EvaluationIncomplete(format!(
                                    "{submitted} of {} participants submitted",
                                    participants.len()
                                )),
                            ));
                        }
                    }
                    ParticipantType::Single | ParticipantType::Sequential => {
                        if submitted == 0 {
                            return Err(SqliteStoreError::Engine(
                                EngineError::EvaluationIncomplete(
                                    "no participant has submitted".to_string(),
                                ),
                            ));
                        }
                    }
                }
            }

            tx.execute(
                "UPDATE evaluation_instances SET status = ?1, force_completed = ?2, \
                 force_note = ?3, completed_by = ?4, completed_at = ?5 WHERE id = ?6",
                params![
                    EvaluationStatus::Completed.as_str(),
                    force,
                    force_note,
                    user_id.get() as i64,
                    at.as_unix_millis(),
                    evaluation_id.get() as i64,
                ],
            )
            .map_err(SqliteStoreError::from_sqlite)?;

            let responses = load_responses(tx, evaluation_id)?;
            let aggregated = aggregate_responses(&template, &responses);
            #[allow(
                clippy::cast_possible_wrap,
                reason = "Row identifiers fit i64 by construction."
            )]
            let source_id = evaluation_id.get() as i64;
            for (key, value) in aggregated {
                let write = SignalWrite {
                    tenant_id: instance.tenant_id,
                    application_id: instance.application_id,
                    key,
                    value,
                    source: SignalSource::Evaluation,
                    source_id: Some(source_id),
                    set_by: user_id,
                    note: None,
                };
                put_signal(tx, &write, at)?;
            }

            Ok(EvaluationInstance {
                status: EvaluationStatus::Completed,
                force_completed: force,
                force_note: force_note.clone(),
                completed_by: Some(user_id),
                completed_at: Some(at),
                ..instance
            })
        })
    }

    /// Returns an evaluation instance by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on tenant mismatch or when absent.
    pub fn evaluation(
        &self,
        tenant_id: TenantId,
        evaluation_id: EvaluationId,
    ) -> StoreResult<EvaluationInstance> {
        let guard = self.lock_connection()?;
        let instance = load_instance(&guard, evaluation_id)?.ok_or_else(|| {
            SqliteStoreError::Engine(EngineError::NotFound(format!(
                "evaluation {evaluation_id} does not exist"
            )))
        })?;
        if instance.tenant_id != tenant_id {
            return Err(SqliteStoreError::Engine(EngineError::TenantMismatch(format!(
                "evaluation {evaluation_id} does not belong to tenant {tenant_id}"
            ))));
        }
        Ok(instance)
    }

    /// Lists the evaluation instances of an application, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on tenant mismatch or query failure.
    pub fn list_evaluations(
        &self,
        tenant_id: TenantId,
        application_id: ApplicationId,
    ) -> StoreResult<Vec<EvaluationInstance>> {
        let guard = self.lock_connection()?;
        assert_application_tenant(&guard, tenant_id, application_id)?;
        let mut stmt = guard
            .prepare(
                "SELECT id FROM evaluation_instances
                 WHERE tenant_id = ?1 AND application_id = ?2 ORDER BY id",
            )
            .map_err(SqliteStoreError::from_sqlite)?;
        let rows = stmt
            .query_map(params![tenant_id.get() as i64, application_id.get() as i64], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(SqliteStoreError::from_sqlite)?;
        let mut instances = Vec::new();
        for row in rows {
            let raw = row.map_err(SqliteStoreError::from_sqlite)? as u64;
            let id = EvaluationId::from_raw(raw)
                .ok_or_else(|| SqliteStoreError::Corrupt("zero instance id".to_string()))?;
            let instance = load_instance(&guard, id)?.ok_or_else(|| {
                SqliteStoreError::Corrupt(format!("instance {id} vanished during listing"))
            })?;
            instances.push(instance);
        }
        Ok(instances)
    }

    /// Returns the participants of an evaluation instance.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on tenant mismatch or when absent.
    pub fn evaluation_participants(
        &self,
        tenant_id: TenantId,
        evaluation_id: EvaluationId,
    ) -> StoreResult<Vec<EvaluationParticipant>> {
        let guard = self.lock_connection()?;
        let instance = load_instance(&guard, evaluation_id)?.ok_or_else(|| {
            SqliteStoreError::Engine(EngineError::NotFound(format!(
                "evaluation {evaluation_id} does not exist"
            )))
        })?;
        if instance.tenant_id != tenant_id {
            return Err(SqliteStoreError::Engine(EngineError::TenantMismatch(format!(
                "evaluation {evaluation_id} does not belong to tenant {tenant_id}"
            ))));
        }
        load_participants(&guard, evaluation_id)
    }
}

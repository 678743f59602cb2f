// crates/hireflow-store-sqlite/src/provision.rs
// ============================================================================
// Module: Tenant Provisioning
// Description: Tenant, identity, job, pipeline, and configuration writes.
// Purpose: Install the persisted rows the decision engine reads but never authors.
// Dependencies: hireflow-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! The outer platform creates tenants, members, jobs, pipelines, and stage
//! configuration before the engine ever runs. These writes live here so the
//! engine surface stays read-only over them. Tenant creation auto-seeds the
//! five default statuses and the default role capability grants;
//! configuration writes are gated on `MANAGE_SETTINGS`, and status
//! deactivation refuses to orphan applications still carrying the status.

// ============================================================================
// SECTION: Imports
// ============================================================================

use hireflow_core::ApplicationId;
use hireflow_core::Capability;
use hireflow_core::EngineError;
use hireflow_core::JobId;
use hireflow_core::OutcomeType;
use hireflow_core::PipelineId;
use hireflow_core::RoleName;
use hireflow_core::StageActionSpec;
use hireflow_core::StageId;
use hireflow_core::StageType;
use hireflow_core::StatusCode;
use hireflow_core::StatusDefinition;
use hireflow_core::TemplateId;
use hireflow_core::TenantId;
use hireflow_core::UserId;
use hireflow_core::default_role_capabilities;
use hireflow_core::default_statuses;
use rusqlite::params;

use crate::catalog::user_has_capability;
use crate::engine::load_state_row;
use crate::store::HireflowStore;
use crate::store::SqliteStoreError;
use crate::store::StoreResult;
use crate::store::now;

// ============================================================================
// SECTION: Identity
// ============================================================================

impl HireflowStore {
    /// Creates a user in the identity store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] with `CONFLICT` for duplicate emails.
    pub fn create_user(&self, email: &str, display_name: &str) -> StoreResult<UserId> {
        self.with_immediate_txn(|tx| {
            tx.execute(
                "INSERT INTO users (email, display_name) VALUES (?1, ?2)",
                params![email, display_name],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            UserId::from_raw(u64::try_from(tx.last_insert_rowid()).unwrap_or(0))
                .ok_or_else(|| SqliteStoreError::Corrupt("zero user rowid".to_string()))
        })
    }

    /// Creates a tenant and seeds its default statuses and role grants.
    ///
    /// The owner becomes an active member with the `OWNER` role.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when any seed insert fails.
    pub fn create_tenant(&self, name: &str, owner: UserId) -> StoreResult<TenantId> {
        let at = now();
        self.with_immediate_txn(|tx| {
            tx.execute(
                "INSERT INTO tenants (name, owner_user_id, created_at) VALUES (?1, ?2, ?3)",
                params![name, owner.get(), at.as_unix_millis()],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            let tenant_id = TenantId::from_raw(u64::try_from(tx.last_insert_rowid()).unwrap_or(0))
                .ok_or_else(|| SqliteStoreError::Corrupt("zero tenant rowid".to_string()))?;

            tx.execute(
                "INSERT INTO tenant_members (tenant_id, user_id, role_name, is_active)
                 VALUES (?1, ?2, 'OWNER', 1)",
                params![tenant_id.get(), owner.get()],
            )
            .map_err(SqliteStoreError::from_sqlite)?;

            for definition in default_statuses(tenant_id) {
                tx.execute(
                    "INSERT INTO tenant_statuses (tenant_id, status_code, display_name, \
                     action_code, is_terminal, outcome_type, sort_order, is_active)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
                    params![
                        tenant_id.get(),
                        definition.status_code.as_str(),
                        definition.display_name,
                        definition.action_code.as_str(),
                        definition.is_terminal,
                        definition.outcome_type.as_str(),
                        definition.sort_order,
                    ],
                )
                .map_err(SqliteStoreError::from_sqlite)?;
            }
            for (role, capability) in default_role_capabilities() {
                tx.execute(
                    "INSERT INTO role_capabilities (tenant_id, role_name, capability)
                     VALUES (?1, ?2, ?3)",
                    params![tenant_id.get(), role.as_str(), capability.as_str()],
                )
                .map_err(SqliteStoreError::from_sqlite)?;
            }
            Ok(tenant_id)
        })
    }

    /// Adds or reactivates a tenant member with a role.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the insert fails.
    pub fn add_member(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        role: &RoleName,
    ) -> StoreResult<()> {
        self.with_immediate_txn(|tx| {
            tx.execute(
                "INSERT INTO tenant_members (tenant_id, user_id, role_name, is_active)
                 VALUES (?1, ?2, ?3, 1)
                 ON CONFLICT (tenant_id, user_id)
                 DO UPDATE SET role_name = excluded.role_name, is_active = 1",
                params![tenant_id.get(), user_id.get(), role.as_str()],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            Ok(())
        })
    }

    /// Deactivates a tenant membership.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the update fails.
    pub fn deactivate_member(&self, tenant_id: TenantId, user_id: UserId) -> StoreResult<()> {
        self.with_immediate_txn(|tx| {
            tx.execute(
                "UPDATE tenant_members SET is_active = 0 WHERE tenant_id = ?1 AND user_id = ?2",
                params![tenant_id.get(), user_id.get()],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            Ok(())
        })
    }

    /// Grants a capability to a role within a tenant.
    ///
    /// Requires `MANAGE_SETTINGS`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on authorization failure.
    pub fn grant_capability(
        &self,
        tenant_id: TenantId,
        caller: UserId,
        role: &RoleName,
        capability: Capability,
    ) -> StoreResult<()> {
        self.with_immediate_txn(|tx| {
            if !user_has_capability(tx, tenant_id, caller, Capability::ManageSettings)? {
                return Err(SqliteStoreError::Engine(EngineError::Forbidden(format!(
                    "capability {} is required to grant capabilities",
                    Capability::ManageSettings.as_str()
                ))));
            }
            tx.execute(
                "INSERT INTO role_capabilities (tenant_id, role_name, capability)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (tenant_id, role_name, capability) DO NOTHING",
                params![tenant_id.get(), role.as_str(), capability.as_str()],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            Ok(())
        })
    }
}

// ============================================================================
// SECTION: Jobs, Pipelines, Applications
// ============================================================================

impl HireflowStore {
    /// Creates a job within a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the insert fails.
    pub fn create_job(
        &self,
        tenant_id: TenantId,
        title: &str,
        created_by: UserId,
    ) -> StoreResult<JobId> {
        self.with_immediate_txn(|tx| {
            tx.execute(
                "INSERT INTO jobs (tenant_id, title, created_by) VALUES (?1, ?2, ?3)",
                params![tenant_id.get(), title, created_by.get()],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            JobId::from_raw(u64::try_from(tx.last_insert_rowid()).unwrap_or(0))
                .ok_or_else(|| SqliteStoreError::Corrupt("zero job rowid".to_string()))
        })
    }

    /// Creates a pipeline within a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the insert fails.
    pub fn create_pipeline(&self, tenant_id: TenantId, name: &str) -> StoreResult<PipelineId> {
        self.with_immediate_txn(|tx| {
            tx.execute(
                "INSERT INTO pipelines (tenant_id, name) VALUES (?1, ?2)",
                params![tenant_id.get(), name],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            PipelineId::from_raw(u64::try_from(tx.last_insert_rowid()).unwrap_or(0))
                .ok_or_else(|| SqliteStoreError::Corrupt("zero pipeline rowid".to_string()))
        })
    }

    /// Adds a stage to a pipeline whose stage list is not yet frozen.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] with `CONFLICT` when any application is
    /// already attached to the pipeline or the order index is taken.
    pub fn add_stage(
        &self,
        tenant_id: TenantId,
        pipeline_id: PipelineId,
        order_index: i64,
        name: &str,
        stage_type: StageType,
        conducted_by: &str,
    ) -> StoreResult<StageId> {
        self.with_immediate_txn(|tx| {
            let frozen: bool = tx
                .query_row(
                    "SELECT EXISTS (SELECT 1 FROM application_pipeline_state \
                     WHERE pipeline_id = ?1)",
                    params![pipeline_id.get()],
                    |row| row.get(0),
                )
                .map_err(SqliteStoreError::from_sqlite)?;
            if frozen {
                return Err(SqliteStoreError::Engine(EngineError::Conflict(format!(
                    "pipeline {pipeline_id} already has attached applications"
                ))));
            }
            tx.execute(
                "INSERT INTO pipeline_stages (tenant_id, pipeline_id, order_index, name, \
                 stage_type, conducted_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    tenant_id.get(),
                    pipeline_id.get(),
                    order_index,
                    name,
                    stage_type.as_str(),
                    conducted_by,
                ],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            StageId::from_raw(u64::try_from(tx.last_insert_rowid()).unwrap_or(0))
                .ok_or_else(|| SqliteStoreError::Corrupt("zero stage rowid".to_string()))
        })
    }

    /// Creates an application for a job.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the insert fails.
    pub fn create_application(
        &self,
        tenant_id: TenantId,
        job_id: JobId,
        candidate_name: &str,
    ) -> StoreResult<ApplicationId> {
        let at = now();
        self.with_immediate_txn(|tx| {
            tx.execute(
                "INSERT INTO applications (tenant_id, job_id, candidate_name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![tenant_id.get(), job_id.get(), candidate_name, at.as_unix_millis()],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            ApplicationId::from_raw(u64::try_from(tx.last_insert_rowid()).unwrap_or(0))
                .ok_or_else(|| SqliteStoreError::Corrupt("zero application rowid".to_string()))
        })
    }
}

// ============================================================================
// SECTION: Stage Configuration
// ============================================================================

impl HireflowStore {
    /// Creates or replaces a stage action definition.
    ///
    /// Requires `MANAGE_SETTINGS` in the action's tenant.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on authorization failure.
    pub fn upsert_stage_action(&self, caller: UserId, spec: &StageActionSpec) -> StoreResult<()> {
        self.with_immediate_txn(|tx| {
            if !user_has_capability(tx, spec.tenant_id, caller, Capability::ManageSettings)? {
                return Err(SqliteStoreError::Engine(EngineError::Forbidden(format!(
                    "capability {} is required to configure stage actions",
                    Capability::ManageSettings.as_str()
                ))));
            }
            let conditions = spec
                .signal_conditions
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
            tx.execute(
                "INSERT INTO stage_actions (tenant_id, stage_id, action_code, outcome_type, \
                 moves_to_next_stage, is_terminal, requires_feedback, requires_notes, \
                 required_capability, signal_conditions, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT (tenant_id, stage_id, action_code) DO UPDATE SET
                   outcome_type = excluded.outcome_type,
                   moves_to_next_stage = excluded.moves_to_next_stage,
                   is_terminal = excluded.is_terminal,
                   requires_feedback = excluded.requires_feedback,
                   requires_notes = excluded.requires_notes,
                   required_capability = excluded.required_capability,
                   signal_conditions = excluded.signal_conditions,
                   is_active = excluded.is_active",
                params![
                    spec.tenant_id.get(),
                    spec.stage_id.get(),
                    spec.action_code.as_str(),
                    spec.outcome_type.map(OutcomeType::as_str),
                    spec.moves_to_next_stage,
                    spec.is_terminal,
                    spec.requires_feedback,
                    spec.requires_notes,
                    spec.required_capability.as_str(),
                    conditions,
                    spec.is_active,
                ],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            Ok(())
        })
    }

    /// Configures an evaluation template for auto-creation on a stage.
    ///
    /// Requires `MANAGE_SETTINGS`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on authorization failure.
    pub fn configure_stage_evaluation(
        &self,
        tenant_id: TenantId,
        caller: UserId,
        stage_id: StageId,
        template_id: TemplateId,
        auto_create: bool,
    ) -> StoreResult<()> {
        self.with_immediate_txn(|tx| {
            if !user_has_capability(tx, tenant_id, caller, Capability::ManageSettings)? {
                return Err(SqliteStoreError::Engine(EngineError::Forbidden(format!(
                    "capability {} is required to configure stage evaluations",
                    Capability::ManageSettings.as_str()
                ))));
            }
            tx.execute(
                "INSERT INTO stage_evaluations (tenant_id, stage_id, template_id, auto_create, \
                 is_active)
                 VALUES (?1, ?2, ?3, ?4, 1)
                 ON CONFLICT (tenant_id, stage_id, template_id)
                 DO UPDATE SET auto_create = excluded.auto_create, is_active = 1",
                params![tenant_id.get(), stage_id.get(), template_id.get(), auto_create],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            Ok(())
        })
    }

    /// Creates a tenant status definition.
    ///
    /// Requires `MANAGE_SETTINGS`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on authorization failure or duplicate
    /// status codes.
    pub fn create_status(&self, caller: UserId, definition: &StatusDefinition) -> StoreResult<()> {
        self.with_immediate_txn(|tx| {
            if !user_has_capability(tx, definition.tenant_id, caller, Capability::ManageSettings)? {
                return Err(SqliteStoreError::Engine(EngineError::Forbidden(format!(
                    "capability {} is required to configure statuses",
                    Capability::ManageSettings.as_str()
                ))));
            }
            tx.execute(
                "INSERT INTO tenant_statuses (tenant_id, status_code, display_name, action_code, \
                 is_terminal, outcome_type, sort_order, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    definition.tenant_id.get(),
                    definition.status_code.as_str(),
                    definition.display_name,
                    definition.action_code.as_str(),
                    definition.is_terminal,
                    definition.outcome_type.as_str(),
                    definition.sort_order,
                    definition.is_active,
                ],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            Ok(())
        })
    }

    /// Deactivates a status that no application currently carries.
    ///
    /// Requires `MANAGE_SETTINGS`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] with `CONFLICT` when any pipeline state
    /// row still carries the status.
    pub fn deactivate_status(
        &self,
        tenant_id: TenantId,
        caller: UserId,
        status_code: &StatusCode,
    ) -> StoreResult<()> {
        self.with_immediate_txn(|tx| {
            if !user_has_capability(tx, tenant_id, caller, Capability::ManageSettings)? {
                return Err(SqliteStoreError::Engine(EngineError::Forbidden(format!(
                    "capability {} is required to configure statuses",
                    Capability::ManageSettings.as_str()
                ))));
            }
            let in_use: bool = tx
                .query_row(
                    "SELECT EXISTS (SELECT 1 FROM application_pipeline_state \
                     WHERE tenant_id = ?1 AND status = ?2)",
                    params![tenant_id.get(), status_code.as_str()],
                    |row| row.get(0),
                )
                .map_err(SqliteStoreError::from_sqlite)?;
            if in_use {
                return Err(SqliteStoreError::Engine(EngineError::Conflict(format!(
                    "status {status_code} is carried by existing applications"
                ))));
            }
            tx.execute(
                "UPDATE tenant_statuses SET is_active = 0 \
                 WHERE tenant_id = ?1 AND status_code = ?2",
                params![tenant_id.get(), status_code.as_str()],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            Ok(())
        })
    }

    /// Records stage feedback for an application on its current stage.
    ///
    /// Requires `PROVIDE_FEEDBACK` (or the blanket feedback grant).
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] on authorization, tenant, or lookup
    /// failure.
    pub fn record_stage_feedback(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        application_id: ApplicationId,
        content: &str,
    ) -> StoreResult<()> {
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
            let allowed = user_has_capability(tx, tenant_id, user_id, Capability::ProvideFeedback)?
                || user_has_capability(tx, tenant_id, user_id, Capability::FeedbackAll)?;
            if !allowed {
                return Err(SqliteStoreError::Engine(EngineError::Forbidden(format!(
                    "capability {} is required to record feedback",
                    Capability::ProvideFeedback.as_str()
                ))));
            }
            let stage_name: String = tx
                .query_row(
                    "SELECT name FROM pipeline_stages WHERE id = ?1",
                    params![state.current_stage_id.get()],
                    |row| row.get(0),
                )
                .map_err(SqliteStoreError::from_sqlite)?;
            tx.execute(
                "INSERT INTO stage_feedback (tenant_id, application_id, stage_name, author_id, \
                 content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    tenant_id.get(),
                    application_id.get(),
                    stage_name,
                    user_id.get(),
                    content,
                    at.as_unix_millis(),
                ],
            )
            .map_err(SqliteStoreError::from_sqlite)?;
            Ok(())
        })
    }
}

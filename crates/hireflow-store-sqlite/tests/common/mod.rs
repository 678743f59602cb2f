// crates/hireflow-store-sqlite/tests/common/mod.rs
// ============================================================================
// Module: Store Test Fixtures
// Description: Shared tenant, pipeline, and action fixtures for store tests.
// Purpose: Build an in-memory store with a seeded three-stage pipeline.
// ============================================================================

//! Shared fixture: one tenant with owner/recruiter/viewer members, one job,
//! and a three-stage pipeline (Screening, Interview, Decision) with the
//! Decision stage conducted by HR.

#![allow(
    dead_code,
    reason = "Each integration test binary uses its own fixture subset."
)]

use hireflow_core::ActionCode;
use hireflow_core::ApplicationId;
use hireflow_core::Capability;
use hireflow_core::JobId;
use hireflow_core::OutcomeType;
use hireflow_core::PipelineId;
use hireflow_core::PipelineStateView;
use hireflow_core::RoleName;
use hireflow_core::SignalGate;
use hireflow_core::SignalKey;
use hireflow_core::SignalType;
use hireflow_core::SignalValue;
use hireflow_core::StageActionSpec;
use hireflow_core::StageId;
use hireflow_core::StageType;
use hireflow_core::TenantId;
use hireflow_core::UserId;
use hireflow_core::runtime::ActionRequest;
use hireflow_store_sqlite::HireflowStore;
use hireflow_store_sqlite::SqliteStoreError;

// ============================================================================
// SECTION: Fixture
// ============================================================================

/// One seeded tenant with users, a job, and a three-stage pipeline.
pub struct Fixture {
    /// In-memory store under test.
    pub store: HireflowStore,
    /// Seeded tenant.
    pub tenant: TenantId,
    /// Tenant owner (OWNER role).
    pub owner: UserId,
    /// Recruiter member (RECRUITER role).
    pub recruiter: UserId,
    /// Viewer member (VIEWER role).
    pub viewer: UserId,
    /// Seeded job created by the owner.
    pub job: JobId,
    /// Seeded pipeline.
    pub pipeline: PipelineId,
    /// First stage (order 0).
    pub screening: StageId,
    /// Second stage (order 1).
    pub interview: StageId,
    /// Third stage (order 2), conducted by HR.
    pub decision: StageId,
}

/// Builds the standard fixture.
pub fn fixture() -> Fixture {
    let store = HireflowStore::in_memory().expect("open in-memory store");
    let owner = store.create_user("owner@northwind.test", "Olive Owner").expect("owner");
    let recruiter =
        store.create_user("recruiter@northwind.test", "Rae Recruiter").expect("recruiter");
    let viewer = store.create_user("viewer@northwind.test", "Vic Viewer").expect("viewer");
    let tenant = store.create_tenant("northwind", owner).expect("tenant");
    store.add_member(tenant, recruiter, &RoleName::new("RECRUITER")).expect("add recruiter");
    store.add_member(tenant, viewer, &RoleName::new("VIEWER")).expect("add viewer");
    let job = store.create_job(tenant, "Staff Engineer", owner).expect("job");
    let pipeline = store.create_pipeline(tenant, "Engineering Default").expect("pipeline");
    let screening = store
        .add_stage(tenant, pipeline, 0, "Screening", StageType::Screening, "RECRUITER")
        .expect("screening stage");
    let interview = store
        .add_stage(tenant, pipeline, 1, "Interview", StageType::Interview, "PANEL")
        .expect("interview stage");
    let decision = store
        .add_stage(tenant, pipeline, 2, "Decision", StageType::Decision, "HR")
        .expect("decision stage");
    Fixture {
        store,
        tenant,
        owner,
        recruiter,
        viewer,
        job,
        pipeline,
        screening,
        interview,
        decision,
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

impl Fixture {
    /// Creates an application and attaches it at the screening stage.
    pub fn attach(&self, candidate: &str) -> ApplicationId {
        let application =
            self.store.create_application(self.tenant, self.job, candidate).expect("application");
        self.store
            .attach_application(
                self.tenant,
                application,
                self.job,
                self.pipeline,
                self.screening,
                Some(self.owner),
            )
            .expect("attach");
        application
    }

    /// Builds an action spec with quiet defaults for a stage.
    pub fn action(&self, stage: StageId, code: &str) -> StageActionSpec {
        StageActionSpec {
            tenant_id: self.tenant,
            stage_id: stage,
            action_code: ActionCode::new(code),
            outcome_type: None,
            moves_to_next_stage: false,
            is_terminal: false,
            requires_feedback: false,
            requires_notes: false,
            required_capability: Capability::AdvanceStage,
            signal_conditions: None,
            is_active: true,
        }
    }

    /// Installs an action definition as the owner.
    pub fn install(&self, spec: &StageActionSpec) {
        self.store.upsert_stage_action(self.owner, spec).expect("install action");
    }

    /// Installs an ADVANCE action on a stage, optionally gated.
    pub fn install_advance(&self, stage: StageId, gate: Option<SignalGate>) {
        let mut spec = self.action(stage, "ADVANCE");
        spec.moves_to_next_stage = true;
        spec.signal_conditions = gate;
        self.install(&spec);
    }

    /// Installs a terminal REJECT action on a stage.
    pub fn install_reject(&self, stage: StageId) {
        let mut spec = self.action(stage, "REJECT");
        spec.outcome_type = Some(OutcomeType::Failure);
        spec.is_terminal = true;
        spec.required_capability = Capability::TerminateApplication;
        self.install(&spec);
    }

    /// Sets a boolean signal as a manual override by the owner.
    pub fn set_bool(&self, application: ApplicationId, key: &str, value: bool) {
        self.store
            .set_manual_signal(
                self.tenant,
                self.owner,
                application,
                SignalKey::new(key),
                SignalType::Boolean,
                SignalValue::Boolean(value),
                None,
            )
            .expect("manual boolean signal");
    }

    /// Sets an integer signal as a manual override by the owner.
    pub fn set_int(&self, application: ApplicationId, key: &str, value: i64) {
        self.store
            .set_manual_signal(
                self.tenant,
                self.owner,
                application,
                SignalKey::new(key),
                SignalType::Integer,
                SignalValue::Integer(value),
                None,
            )
            .expect("manual integer signal");
    }

    /// Builds an action request for this tenant.
    pub fn request(&self, user: UserId, application: ApplicationId, code: &str) -> ActionRequest {
        ActionRequest {
            tenant_id: self.tenant,
            user_id: user,
            application_id: application,
            action_code: ActionCode::new(code),
            notes: None,
            override_reason: None,
            reviewed_by: None,
            approved_by: None,
        }
    }

    /// Executes an action and returns the result.
    pub fn exec(
        &self,
        user: UserId,
        application: ApplicationId,
        code: &str,
    ) -> Result<PipelineStateView, SqliteStoreError> {
        self.store.execute_action(&self.request(user, application, code))
    }
}

/// Extracts the engine error code from a store error.
pub fn engine_code(err: &SqliteStoreError) -> &'static str {
    match err {
        SqliteStoreError::Engine(engine) => engine.code(),
        other => panic!("expected engine error, got {other}"),
    }
}

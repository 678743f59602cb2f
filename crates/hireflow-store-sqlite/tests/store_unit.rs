// crates/hireflow-store-sqlite/tests/store_unit.rs
// ============================================================================
// Module: Store Lifecycle Integration Tests
// Description: Durable open, reopen, and schema-version behavior.
// Purpose: Validate that persisted state survives a store restart intact.
// ============================================================================

//! Store lifecycle tests: opening a durable database, reopening it with the
//! same schema version, and reading back state written before the restart.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use hireflow_core::RoleName;
use hireflow_core::StageType;
use hireflow_store_sqlite::HireflowStore;
use hireflow_store_sqlite::SqliteStoreConfig;
use tempfile::TempDir;

// ============================================================================
// SECTION: Durable Lifecycle
// ============================================================================

#[test]
fn durable_store_survives_reopen() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("hireflow.db");

    let tenant;
    let application;
    let screening;
    {
        let store =
            HireflowStore::open(SqliteStoreConfig::for_path(path.clone())).expect("open");
        let owner = store.create_user("owner@northwind.test", "Olive Owner").expect("owner");
        tenant = store.create_tenant("northwind", owner).expect("tenant");
        let recruiter =
            store.create_user("recruiter@northwind.test", "Rae Recruiter").expect("recruiter");
        store.add_member(tenant, recruiter, &RoleName::new("RECRUITER")).expect("member");
        let job = store.create_job(tenant, "Staff Engineer", owner).expect("job");
        let pipeline = store.create_pipeline(tenant, "Default").expect("pipeline");
        screening = store
            .add_stage(tenant, pipeline, 0, "Screening", StageType::Screening, "RECRUITER")
            .expect("stage");
        application = store.create_application(tenant, job, "Ada").expect("application");
        store
            .attach_application(tenant, application, job, pipeline, screening, Some(owner))
            .expect("attach");
    }

    let reopened = HireflowStore::open(SqliteStoreConfig::for_path(path)).expect("reopen");
    let state = reopened.pipeline_state(tenant, application).expect("state");
    assert_eq!(state.current_stage_id, screening);
    let statuses = reopened.list_statuses(tenant).expect("statuses");
    assert_eq!(statuses.len(), 5);
    let history = reopened.stage_history(tenant, application).expect("history");
    assert_eq!(history.len(), 1);
}

#[test]
fn in_memory_store_seeds_defaults_per_tenant() {
    let store = HireflowStore::in_memory().expect("open");
    let owner = store.create_user("owner@northwind.test", "Olive Owner").expect("owner");
    let tenant = store.create_tenant("northwind", owner).expect("tenant");

    let statuses = store.list_statuses(tenant).expect("statuses");
    let codes: Vec<&str> =
        statuses.iter().map(|definition| definition.status_code.as_str()).collect();
    assert_eq!(codes, vec!["ACTIVE", "ON_HOLD", "HIRED", "REJECTED", "WITHDRAWN"]);

    let other_owner = store.create_user("owner@contoso.test", "Oscar Owner").expect("owner");
    let other = store.create_tenant("contoso", other_owner).expect("tenant");
    assert_eq!(store.list_statuses(other).expect("statuses").len(), 5);
}

// crates/hireflow-store-sqlite/tests/audit_unit.rs
// ============================================================================
// Module: Execution Log Integration Tests
// Description: Audit listings, filters, enrichment, and rejection lookups.
// Purpose: Validate the read-only projections of the execution log.
// ============================================================================

//! Execution log scenarios: snapshot fidelity, listing filters and paging,
//! read-time enrichment, authorization, and the rejection-reason lookup.

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

mod common;

use common::engine_code;
use common::fixture;
use hireflow_core::ActionCode;
use hireflow_core::Capability;
use hireflow_core::OutcomeType;
use hireflow_store_sqlite::DecisionLogFilter;

// ============================================================================
// SECTION: Snapshot Fidelity
// ============================================================================

#[test]
fn log_snapshot_equals_latest_view_at_decision_time() {
    let fx = fixture();
    fx.install_advance(fx.screening, None);
    let app = fx.attach("Ada");
    fx.set_bool(app, "TECH_PASS", true);
    fx.set_int(app, "SCORE", 4);
    let latest_before = fx.store.latest_signals(fx.tenant, app).expect("latest");

    fx.exec(fx.recruiter, app, "ADVANCE").expect("advance");
    // Later writes must not retroactively change the recorded snapshot.
    fx.set_int(app, "SCORE", 1);

    let log = fx
        .store
        .list_decision_log(fx.tenant, fx.owner, app, &DecisionLogFilter::page(10, 0))
        .expect("log");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].record.signal_snapshot, latest_before);
}

// ============================================================================
// SECTION: Filters and Paging
// ============================================================================

#[test]
fn listing_filters_by_action_code_and_outcome() {
    let fx = fixture();
    fx.install_advance(fx.screening, None);
    fx.install_reject(fx.interview);
    let app = fx.attach("Ada");
    fx.exec(fx.recruiter, app, "ADVANCE").expect("advance");
    fx.exec(fx.owner, app, "REJECT").expect("reject");

    let all = fx
        .store
        .list_decision_log(fx.tenant, fx.owner, app, &DecisionLogFilter::page(10, 0))
        .expect("all");
    assert_eq!(all.len(), 2);
    // Newest first.
    assert_eq!(all[0].record.action_code, ActionCode::new("REJECT"));

    let mut by_action = DecisionLogFilter::page(10, 0);
    by_action.action_code = Some(ActionCode::new("ADVANCE"));
    let advances = fx
        .store
        .list_decision_log(fx.tenant, fx.owner, app, &by_action)
        .expect("advances");
    assert_eq!(advances.len(), 1);
    assert_eq!(advances[0].record.action_code, ActionCode::new("ADVANCE"));

    let mut by_outcome = DecisionLogFilter::page(10, 0);
    by_outcome.outcome_type = Some(OutcomeType::Failure);
    let failures = fx
        .store
        .list_decision_log(fx.tenant, fx.owner, app, &by_outcome)
        .expect("failures");
    assert_eq!(failures.len(), 1);
    assert!(failures[0].record.is_terminal);
}

#[test]
fn listing_pages_with_limit_and_offset() {
    let fx = fixture();
    fx.install_advance(fx.screening, None);
    fx.install_advance(fx.interview, None);
    let app = fx.attach("Ada");
    fx.exec(fx.recruiter, app, "ADVANCE").expect("first");
    fx.exec(fx.recruiter, app, "ADVANCE").expect("second");

    let first_page = fx
        .store
        .list_decision_log(fx.tenant, fx.owner, app, &DecisionLogFilter::page(1, 0))
        .expect("page one");
    let second_page = fx
        .store
        .list_decision_log(fx.tenant, fx.owner, app, &DecisionLogFilter::page(1, 1))
        .expect("page two");
    assert_eq!(first_page.len(), 1);
    assert_eq!(second_page.len(), 1);
    assert!(first_page[0].record.id > second_page[0].record.id);
}

// ============================================================================
// SECTION: Enrichment
// ============================================================================

#[test]
fn entries_are_enriched_with_email_and_stage_names() {
    let fx = fixture();
    fx.install_advance(fx.screening, None);
    let app = fx.attach("Ada");
    fx.exec(fx.recruiter, app, "ADVANCE").expect("advance");

    let log = fx
        .store
        .list_decision_log(fx.tenant, fx.owner, app, &DecisionLogFilter::page(10, 0))
        .expect("log");
    let entry = &log[0];
    assert_eq!(entry.executed_by_email.as_deref(), Some("recruiter@northwind.test"));
    assert_eq!(entry.stage_name.as_deref(), Some("Screening"));
    assert_eq!(entry.to_stage_name.as_deref(), Some("Interview"));

    let fetched = fx
        .store
        .get_decision_log_entry(fx.tenant, fx.owner, app, entry.record.id)
        .expect("get");
    assert_eq!(fetched, *entry);
}

#[test]
fn missing_entry_is_not_found() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let err = fx.store.get_decision_log_entry(fx.tenant, fx.owner, app, 999).unwrap_err();
    assert_eq!(engine_code(&err), "NOT_FOUND");
}

// ============================================================================
// SECTION: Authorization
// ============================================================================

#[test]
fn audit_reads_require_view_tracking() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let stranger = fx.store.create_user("nobody@northwind.test", "No Body").expect("user");
    let err = fx
        .store
        .list_decision_log(fx.tenant, stranger, app, &DecisionLogFilter::page(10, 0))
        .unwrap_err();
    assert_eq!(engine_code(&err), "FORBIDDEN");
}

#[test]
fn foreign_tenant_cannot_read_the_log() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let outsider = fx.store.create_user("owner@contoso.test", "Oscar Outsider").expect("user");
    let other_tenant = fx.store.create_tenant("contoso", outsider).expect("tenant");
    let err = fx
        .store
        .list_decision_log(other_tenant, outsider, app, &DecisionLogFilter::page(10, 0))
        .unwrap_err();
    assert_eq!(engine_code(&err), "TENANT_MISMATCH");
}

// ============================================================================
// SECTION: Rejection Reason
// ============================================================================

#[test]
fn rejection_reason_returns_latest_terminal_failure() {
    let fx = fixture();
    fx.install_reject(fx.screening);
    let app = fx.attach("Ada");

    assert!(fx.store.rejection_reason(fx.tenant, fx.owner, app).expect("none").is_none());

    let mut request = fx.request(fx.owner, app, "REJECT");
    request.notes = Some("score below bar".to_string());
    fx.store.execute_action(&request).expect("reject");

    let rejection = fx
        .store
        .rejection_reason(fx.tenant, fx.owner, app)
        .expect("lookup")
        .expect("present");
    assert_eq!(rejection.record.outcome_type, OutcomeType::Failure);
    assert!(rejection.record.is_terminal);
    assert_eq!(rejection.record.decision_note.as_deref(), Some("score below bar"));
    assert_eq!(rejection.executed_by_email.as_deref(), Some("owner@northwind.test"));
}

#[test]
fn withdrawn_applications_have_no_rejection_reason() {
    let fx = fixture();
    let mut withdraw = fx.action(fx.screening, "WITHDRAW");
    withdraw.outcome_type = Some(OutcomeType::Neutral);
    withdraw.is_terminal = true;
    withdraw.required_capability = Capability::TerminateApplication;
    fx.install(&withdraw);
    let app = fx.attach("Ada");
    fx.exec(fx.owner, app, "WITHDRAW").expect("withdraw");

    assert!(fx.store.rejection_reason(fx.tenant, fx.owner, app).expect("lookup").is_none());
}

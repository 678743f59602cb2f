// crates/hireflow-store-sqlite/tests/engine_unit.rs
// ============================================================================
// Module: Action Engine Integration Tests
// Description: End-to-end decision scenarios over the SQLite store.
// Purpose: Validate gates, transitions, idempotency, and tenant isolation.
// ============================================================================

//! Action engine scenarios: signal-gated advancement, missing-signal
//! policies, hold/activate guards, terminal locking, idempotent retries,
//! stage moves, status changes, and cross-tenant rejection.

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
use hireflow_core::Capability;
use hireflow_core::ConditionOperator;
use hireflow_core::GateLogic;
use hireflow_core::MissingPolicy;
use hireflow_core::OutcomeType;
use hireflow_core::RoleName;
use hireflow_core::SignalCondition;
use hireflow_core::SignalGate;
use hireflow_core::SignalKey;
use hireflow_core::SignalValue;
use hireflow_core::StatusCode;
use hireflow_store_sqlite::DecisionLogFilter;

// ============================================================================
// SECTION: Gate Fixtures
// ============================================================================

fn advance_gate() -> SignalGate {
    SignalGate {
        logic: GateLogic::All,
        conditions: vec![
            SignalCondition {
                signal: SignalKey::new("TECH_PASS"),
                operator: ConditionOperator::Eq,
                value: "true".to_string(),
                on_missing: MissingPolicy::Block,
            },
            SignalCondition {
                signal: SignalKey::new("SCORE"),
                operator: ConditionOperator::Ge,
                value: "3".to_string(),
                on_missing: MissingPolicy::Block,
            },
        ],
    }
}

// ============================================================================
// SECTION: Signal-Gated Advancement
// ============================================================================

#[test]
fn advance_passes_when_signals_hold() {
    let fx = fixture();
    fx.install_advance(fx.screening, Some(advance_gate()));
    let app = fx.attach("Ada");
    fx.set_bool(app, "TECH_PASS", true);
    fx.set_int(app, "SCORE", 4);

    let view = fx.exec(fx.recruiter, app, "ADVANCE").expect("advance");
    assert_eq!(view.current_stage_id, fx.interview);
    assert_eq!(view.outcome_type, OutcomeType::Active);
    assert!(!view.is_terminal);

    let log = fx
        .store
        .list_decision_log(fx.tenant, fx.owner, app, &DecisionLogFilter::page(10, 0))
        .expect("log");
    assert_eq!(log.len(), 1);
    let entry = &log[0];
    assert_eq!(entry.record.conditions_evaluated.len(), 2);
    assert!(entry.record.conditions_evaluated.iter().all(|trace| trace.met));
    assert_eq!(
        entry.record.signal_snapshot.get(&SignalKey::new("TECH_PASS")),
        Some(&SignalValue::Boolean(true))
    );
    assert_eq!(
        entry.record.signal_snapshot.get(&SignalKey::new("SCORE")),
        Some(&SignalValue::Integer(4))
    );
    assert_eq!(entry.record.to_stage_id, Some(fx.interview));
}

#[test]
fn advance_blocked_names_the_failing_condition() {
    let fx = fixture();
    fx.install_advance(fx.screening, Some(advance_gate()));
    let app = fx.attach("Ada");
    fx.set_bool(app, "TECH_PASS", true);
    fx.set_int(app, "SCORE", 2);

    let err = fx.exec(fx.recruiter, app, "ADVANCE").unwrap_err();
    assert_eq!(engine_code(&err), "SIGNALS_NOT_MET");
    assert!(err.to_string().contains("SCORE >= 3 (actual: 2)"));

    let view = fx.store.pipeline_state(fx.tenant, app).expect("state");
    assert_eq!(view.current_stage_id, fx.screening);
    let log = fx
        .store
        .list_decision_log(fx.tenant, fx.owner, app, &DecisionLogFilter::page(10, 0))
        .expect("log");
    assert!(log.is_empty());
}

#[test]
fn missing_signals_block_with_reason() {
    let fx = fixture();
    fx.install_advance(fx.screening, Some(advance_gate()));
    let app = fx.attach("Ada");

    let err = fx.exec(fx.recruiter, app, "ADVANCE").unwrap_err();
    assert_eq!(engine_code(&err), "SIGNALS_NOT_MET");
    assert!(err.to_string().contains("TECH_PASS = true (actual: missing)"));
    assert!(err.to_string().contains("SCORE >= 3 (actual: missing)"));
}

#[test]
fn warn_policy_requires_note_then_succeeds() {
    let fx = fixture();
    let mut spec = fx.action(fx.screening, "EXPEDITE");
    spec.moves_to_next_stage = true;
    spec.signal_conditions = Some(SignalGate {
        logic: GateLogic::All,
        conditions: vec![SignalCondition {
            signal: SignalKey::new("VIP_FLAG"),
            operator: ConditionOperator::Eq,
            value: "true".to_string(),
            on_missing: MissingPolicy::Warn,
        }],
    });
    fx.install(&spec);
    let app = fx.attach("Ada");

    let err = fx.exec(fx.recruiter, app, "EXPEDITE").unwrap_err();
    assert_eq!(engine_code(&err), "VALIDATION");

    let mut request = fx.request(fx.recruiter, app, "EXPEDITE");
    request.notes = Some("VIP via CEO".to_string());
    let view = fx.store.execute_action(&request).expect("expedite");
    assert_eq!(view.current_stage_id, fx.interview);

    let log = fx
        .store
        .list_decision_log(fx.tenant, fx.owner, app, &DecisionLogFilter::page(10, 0))
        .expect("log");
    assert_eq!(log.len(), 1);
    let trace = &log[0].record.conditions_evaluated[0];
    assert!(trace.warning);
    assert!(trace.met);
}

// ============================================================================
// SECTION: Validation Gates
// ============================================================================

#[test]
fn notes_gate_rejects_blank_notes() {
    let fx = fixture();
    let mut spec = fx.action(fx.screening, "ANNOTATE");
    spec.requires_notes = true;
    fx.install(&spec);
    let app = fx.attach("Ada");

    let err = fx.exec(fx.recruiter, app, "ANNOTATE").unwrap_err();
    assert_eq!(engine_code(&err), "VALIDATION");
}

#[test]
fn feedback_gate_counts_current_stage_feedback() {
    let fx = fixture();
    let mut spec = fx.action(fx.screening, "ADVANCE");
    spec.moves_to_next_stage = true;
    spec.requires_feedback = true;
    fx.install(&spec);
    let app = fx.attach("Ada");

    let err = fx.exec(fx.recruiter, app, "ADVANCE").unwrap_err();
    assert_eq!(engine_code(&err), "FEEDBACK_REQUIRED");

    fx.store
        .record_stage_feedback(fx.tenant, fx.recruiter, app, "strong communicator")
        .expect("feedback");
    let view = fx.exec(fx.recruiter, app, "ADVANCE").expect("advance");
    assert_eq!(view.current_stage_id, fx.interview);
}

#[test]
fn capability_is_resolved_from_persisted_role() {
    let fx = fixture();
    fx.install_advance(fx.screening, None);
    let app = fx.attach("Ada");

    let err = fx.exec(fx.viewer, app, "ADVANCE").unwrap_err();
    assert_eq!(engine_code(&err), "FORBIDDEN");

    let view = fx.exec(fx.recruiter, app, "ADVANCE").expect("advance");
    assert_eq!(view.current_stage_id, fx.interview);
}

#[test]
fn unknown_action_is_invalid() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let err = fx.exec(fx.recruiter, app, "TELEPORT").unwrap_err();
    assert_eq!(engine_code(&err), "INVALID_ACTION");
}

// ============================================================================
// SECTION: Hold / Activate and Terminal Transitions
// ============================================================================

#[test]
fn hold_and_activate_swap_on_the_same_stage() {
    let fx = fixture();
    let mut hold = fx.action(fx.screening, "HOLD");
    hold.outcome_type = Some(OutcomeType::Hold);
    hold.required_capability = Capability::ChangeStatus;
    fx.install(&hold);
    let mut activate = fx.action(fx.screening, "ACTIVATE");
    activate.outcome_type = Some(OutcomeType::Active);
    activate.required_capability = Capability::ChangeStatus;
    fx.install(&activate);
    let app = fx.attach("Ada");

    let err = fx.exec(fx.recruiter, app, "ACTIVATE").unwrap_err();
    assert_eq!(engine_code(&err), "INVALID_ACTION");

    let held = fx.exec(fx.recruiter, app, "HOLD").expect("hold");
    assert_eq!(held.outcome_type, OutcomeType::Hold);
    assert_eq!(held.status, StatusCode::new("ON_HOLD"));
    assert_eq!(held.current_stage_id, fx.screening);

    let err = fx.exec(fx.recruiter, app, "HOLD").unwrap_err();
    assert_eq!(engine_code(&err), "INVALID_ACTION");

    let active = fx.exec(fx.recruiter, app, "ACTIVATE").expect("activate");
    assert_eq!(active.outcome_type, OutcomeType::Active);
    assert_eq!(active.status, StatusCode::new("ACTIVE"));
}

#[test]
fn terminal_reject_locks_the_application() {
    let fx = fixture();
    fx.install_reject(fx.screening);
    fx.install_advance(fx.screening, None);
    let app = fx.attach("Ada");

    let rejected = fx.exec(fx.owner, app, "REJECT").expect("reject");
    assert!(rejected.is_terminal);
    assert_eq!(rejected.outcome_type, OutcomeType::Failure);
    assert_eq!(rejected.status, StatusCode::new("REJECTED"));

    let err = fx.exec(fx.owner, app, "ADVANCE").unwrap_err();
    assert_eq!(engine_code(&err), "TERMINAL_STATUS");
    let err = fx.exec(fx.owner, app, "REJECT").unwrap_err();
    assert_eq!(engine_code(&err), "TERMINAL_STATUS");
}

#[test]
fn advance_at_last_stage_is_invalid() {
    let fx = fixture();
    fx.install_advance(fx.screening, None);
    fx.install_advance(fx.interview, None);
    fx.install_advance(fx.decision, None);
    let app = fx.attach("Ada");
    fx.exec(fx.recruiter, app, "ADVANCE").expect("to interview");
    fx.exec(fx.recruiter, app, "ADVANCE").expect("to decision");
    let err = fx.exec(fx.recruiter, app, "ADVANCE").unwrap_err();
    assert_eq!(engine_code(&err), "INVALID_ACTION");
    assert!(err.to_string().contains("last stage"));
}

// ============================================================================
// SECTION: Idempotency
// ============================================================================

#[test]
fn noop_action_writes_no_history_or_log() {
    let fx = fixture();
    fx.install(&fx.action(fx.screening, "REVISIT"));
    let app = fx.attach("Ada");
    let history_before = fx.store.stage_history(fx.tenant, app).expect("history").len();

    let first = fx.exec(fx.recruiter, app, "REVISIT").expect("first");
    let second = fx.exec(fx.recruiter, app, "REVISIT").expect("second");
    assert_eq!(first, second);

    let history_after = fx.store.stage_history(fx.tenant, app).expect("history").len();
    assert_eq!(history_before, history_after);
    let log = fx
        .store
        .list_decision_log(fx.tenant, fx.owner, app, &DecisionLogFilter::page(10, 0))
        .expect("log");
    assert!(log.is_empty());
}

#[test]
fn successful_decision_writes_one_history_and_one_log_row() {
    let fx = fixture();
    fx.install_advance(fx.screening, None);
    let app = fx.attach("Ada");
    let history_before = fx.store.stage_history(fx.tenant, app).expect("history").len();

    fx.exec(fx.recruiter, app, "ADVANCE").expect("advance");

    let history_after = fx.store.stage_history(fx.tenant, app).expect("history");
    assert_eq!(history_after.len(), history_before + 1);
    assert_eq!(history_after[0].event_code.as_str(), "ADVANCE");
    let log = fx
        .store
        .list_decision_log(fx.tenant, fx.owner, app, &DecisionLogFilter::page(10, 0))
        .expect("log");
    assert_eq!(log.len(), 1);
}

#[test]
fn duplicate_attach_conflicts() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let err = fx
        .store
        .attach_application(fx.tenant, app, fx.job, fx.pipeline, fx.screening, Some(fx.owner))
        .unwrap_err();
    assert_eq!(engine_code(&err), "CONFLICT");
}

// ============================================================================
// SECTION: Tenant Isolation
// ============================================================================

#[test]
fn foreign_tenant_cannot_execute_actions() {
    let fx = fixture();
    fx.install_advance(fx.screening, None);
    let app = fx.attach("Ada");

    let outsider = fx.store.create_user("owner@contoso.test", "Oscar Outsider").expect("user");
    let other_tenant = fx.store.create_tenant("contoso", outsider).expect("tenant");

    let mut request = fx.request(outsider, app, "ADVANCE");
    request.tenant_id = other_tenant;
    let err = fx.store.execute_action(&request).unwrap_err();
    assert_eq!(engine_code(&err), "TENANT_MISMATCH");

    let view = fx.store.pipeline_state(fx.tenant, app).expect("state");
    assert_eq!(view.current_stage_id, fx.screening);
    let history = fx.store.stage_history(fx.tenant, app).expect("history");
    assert_eq!(history.len(), 1);
}

// ============================================================================
// SECTION: Stage Moves and Status Changes
// ============================================================================

#[test]
fn move_stage_requires_override_flow_and_is_idempotent() {
    let fx = fixture();
    let app = fx.attach("Ada");

    let err = fx
        .store
        .move_stage(fx.tenant, fx.recruiter, app, fx.decision, None)
        .unwrap_err();
    assert_eq!(engine_code(&err), "FORBIDDEN");

    let moved = fx
        .store
        .move_stage(fx.tenant, fx.owner, app, fx.decision, Some("panel skipped".to_string()))
        .expect("move");
    assert_eq!(moved.current_stage_id, fx.decision);

    let again = fx
        .store
        .move_stage(fx.tenant, fx.owner, app, fx.decision, None)
        .expect("idempotent move");
    assert_eq!(again.current_stage_id, fx.decision);
    assert_eq!(again.entered_stage_at, moved.entered_stage_at);
}

#[test]
fn update_status_validates_catalog_and_terminal_source() {
    let fx = fixture();
    let app = fx.attach("Ada");

    let err = fx
        .store
        .update_status(fx.tenant, fx.owner, app, StatusCode::new("IMAGINARY"), None)
        .unwrap_err();
    assert_eq!(engine_code(&err), "INVALID_STATUS");

    let withdrawn = fx
        .store
        .update_status(fx.tenant, fx.owner, app, StatusCode::new("WITHDRAWN"), None)
        .expect("withdraw");
    assert!(withdrawn.is_terminal);
    assert_eq!(withdrawn.outcome_type, OutcomeType::Neutral);

    let err = fx
        .store
        .update_status(fx.tenant, fx.owner, app, StatusCode::new("ACTIVE"), None)
        .unwrap_err();
    assert_eq!(engine_code(&err), "TERMINAL_STATUS");
}

#[test]
fn viewer_cannot_change_status() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let err = fx
        .store
        .update_status(fx.tenant, fx.viewer, app, StatusCode::new("ON_HOLD"), None)
        .unwrap_err();
    assert_eq!(engine_code(&err), "FORBIDDEN");
}

// ============================================================================
// SECTION: Membership Roles
// ============================================================================

#[test]
fn deactivated_member_loses_capabilities() {
    let fx = fixture();
    fx.install_advance(fx.screening, None);
    let app = fx.attach("Ada");
    fx.store.deactivate_member(fx.tenant, fx.recruiter).expect("deactivate");
    let err = fx.exec(fx.recruiter, app, "ADVANCE").unwrap_err();
    assert_eq!(engine_code(&err), "FORBIDDEN");
}

#[test]
fn granted_capability_takes_effect() {
    let fx = fixture();
    fx.install_advance(fx.screening, None);
    let app = fx.attach("Ada");
    fx.store
        .grant_capability(fx.tenant, fx.owner, &RoleName::new("VIEWER"), Capability::AdvanceStage)
        .expect("grant");
    let view = fx.exec(fx.viewer, app, "ADVANCE").expect("advance");
    assert_eq!(view.current_stage_id, fx.interview);
}

// crates/hireflow-store-sqlite/tests/evaluation_unit.rs
// ============================================================================
// Module: Evaluation Engine Integration Tests
// Description: Evaluation lifecycle, aggregation, and auto-creation.
// Purpose: Validate submissions, completion policies, and signal hand-off.
// ============================================================================

//! Evaluation scenarios: panel submission and aggregation into signals,
//! immutable responses, forced completion, participant management, template
//! versioning, and idempotent stage-entry auto-creation with HR resolution.

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

use common::Fixture;
use common::engine_code;
use common::fixture;
use hireflow_core::Aggregation;
use hireflow_core::ApplicationId;
use hireflow_core::EvaluationId;
use hireflow_core::EvaluationStatus;
use hireflow_core::ParticipantStatus;
use hireflow_core::ParticipantType;
use hireflow_core::ResponseData;
use hireflow_core::ResponseValue;
use hireflow_core::RoleName;
use hireflow_core::SignalField;
use hireflow_core::SignalKey;
use hireflow_core::SignalType;
use hireflow_core::SignalValue;
use hireflow_core::TemplateId;
use hireflow_core::UserId;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn panel_schema() -> Vec<SignalField> {
    vec![
        SignalField {
            key: SignalKey::new("GO"),
            signal_type: SignalType::Boolean,
            label: "Hire recommendation".to_string(),
            aggregation: Some(Aggregation::Majority),
            min: None,
            max: None,
            required: true,
        },
        SignalField {
            key: SignalKey::new("SCORE"),
            signal_type: SignalType::Integer,
            label: "Overall score".to_string(),
            aggregation: Some(Aggregation::Average),
            min: Some(1.0),
            max: Some(5.0),
            required: false,
        },
    ]
}

fn panel_template(fx: &Fixture) -> TemplateId {
    fx.store
        .create_template(
            fx.tenant,
            fx.owner,
            "panel-review",
            ParticipantType::Panel,
            None,
            panel_schema(),
        )
        .expect("template")
        .id
}

fn panelists(fx: &Fixture) -> [UserId; 3] {
    let a = fx.store.create_user("ivy@northwind.test", "Ivy Interviewer").expect("user");
    let b = fx.store.create_user("ian@northwind.test", "Ian Interviewer").expect("user");
    let c = fx.store.create_user("ida@northwind.test", "Ida Interviewer").expect("user");
    for user in [a, b, c] {
        fx.store.add_member(fx.tenant, user, &RoleName::new("INTERVIEWER")).expect("member");
    }
    [a, b, c]
}

fn response(go: bool, score: i64) -> ResponseData {
    [
        (SignalKey::new("GO"), ResponseValue::Boolean(go)),
        (SignalKey::new("SCORE"), ResponseValue::Integer(score)),
    ]
    .into_iter()
    .collect()
}

fn panel_instance(fx: &Fixture, app: ApplicationId) -> (EvaluationId, [UserId; 3]) {
    let template = panel_template(fx);
    let instance =
        fx.store.create_instance(fx.tenant, app, template, None).expect("instance");
    let users = panelists(fx);
    for user in users {
        fx.store.add_participant(fx.tenant, instance.id, user).expect("participant");
    }
    (instance.id, users)
}

// ============================================================================
// SECTION: Panel Aggregation
// ============================================================================

#[test]
fn panel_majority_and_average_become_signals() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let (evaluation, [a, b, c]) = panel_instance(&fx, app);

    fx.store.submit_response(a, evaluation, &response(true, 5)).expect("submit a");
    fx.store.submit_response(b, evaluation, &response(true, 4)).expect("submit b");
    fx.store.submit_response(c, evaluation, &response(false, 3)).expect("submit c");

    let completed =
        fx.store.complete_evaluation(fx.owner, evaluation, false, None).expect("complete");
    assert_eq!(completed.status, EvaluationStatus::Completed);
    assert!(!completed.force_completed);

    let signals = fx.store.latest_signals(fx.tenant, app).expect("signals");
    assert_eq!(signals.get(&SignalKey::new("GO")), Some(&SignalValue::Boolean(true)));
    assert_eq!(signals.get(&SignalKey::new("SCORE")), Some(&SignalValue::Float(4.0)));
}

#[test]
fn responses_are_immutable() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let (evaluation, [a, _, _]) = panel_instance(&fx, app);

    fx.store.submit_response(a, evaluation, &response(true, 5)).expect("submit");
    let err = fx.store.submit_response(a, evaluation, &response(false, 1)).unwrap_err();
    assert_eq!(engine_code(&err), "CONFLICT");

    let participants = fx.store.evaluation_participants(fx.tenant, evaluation).expect("list");
    let submitted = participants.iter().find(|row| row.user_id == a).expect("row");
    assert_eq!(submitted.status, ParticipantStatus::Submitted);
}

#[test]
fn non_participant_cannot_submit() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let (evaluation, _) = panel_instance(&fx, app);
    let err = fx.store.submit_response(fx.viewer, evaluation, &response(true, 3)).unwrap_err();
    assert_eq!(engine_code(&err), "FORBIDDEN");
}

#[test]
fn first_submission_moves_instance_in_progress() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let (evaluation, [a, _, _]) = panel_instance(&fx, app);
    assert_eq!(
        fx.store.evaluation(fx.tenant, evaluation).expect("instance").status,
        EvaluationStatus::Pending
    );
    fx.store.submit_response(a, evaluation, &response(true, 4)).expect("submit");
    assert_eq!(
        fx.store.evaluation(fx.tenant, evaluation).expect("instance").status,
        EvaluationStatus::InProgress
    );
}

// ============================================================================
// SECTION: Completion Policies
// ============================================================================

#[test]
fn panel_completion_requires_every_submission() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let (evaluation, [a, b, _]) = panel_instance(&fx, app);
    fx.store.submit_response(a, evaluation, &response(true, 4)).expect("submit a");
    fx.store.submit_response(b, evaluation, &response(true, 4)).expect("submit b");

    let err = fx.store.complete_evaluation(fx.owner, evaluation, false, None).unwrap_err();
    assert_eq!(engine_code(&err), "EVALUATION_INCOMPLETE");
}

#[test]
fn forced_completion_requires_note_and_records_it() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let (evaluation, [a, _, _]) = panel_instance(&fx, app);
    fx.store.submit_response(a, evaluation, &response(true, 4)).expect("submit");

    let err = fx
        .store
        .complete_evaluation(fx.owner, evaluation, true, Some("  ".to_string()))
        .unwrap_err();
    assert_eq!(engine_code(&err), "VALIDATION");

    let completed = fx
        .store
        .complete_evaluation(fx.owner, evaluation, true, Some("deadline".to_string()))
        .expect("force complete");
    assert!(completed.force_completed);
    assert_eq!(completed.force_note.as_deref(), Some("deadline"));
    assert_eq!(completed.completed_by, Some(fx.owner));

    let signals = fx.store.latest_signals(fx.tenant, app).expect("signals");
    assert_eq!(signals.get(&SignalKey::new("GO")), Some(&SignalValue::Boolean(true)));
}

#[test]
fn single_completion_needs_one_submission() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let template = fx
        .store
        .create_template(
            fx.tenant,
            fx.owner,
            "solo-review",
            ParticipantType::Single,
            None,
            panel_schema(),
        )
        .expect("template")
        .id;
    let instance = fx.store.create_instance(fx.tenant, app, template, None).expect("instance");
    let err = fx.store.complete_evaluation(fx.owner, instance.id, false, None).unwrap_err();
    assert_eq!(engine_code(&err), "EVALUATION_INCOMPLETE");
}

#[test]
fn completed_instances_reject_further_lifecycle() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let (evaluation, [a, b, c]) = panel_instance(&fx, app);
    for (user, go) in [(a, true), (b, true), (c, false)] {
        fx.store.submit_response(user, evaluation, &response(go, 3)).expect("submit");
    }
    fx.store.complete_evaluation(fx.owner, evaluation, false, None).expect("complete");

    let err = fx.store.complete_evaluation(fx.owner, evaluation, false, None).unwrap_err();
    assert_eq!(engine_code(&err), "INVALID_ACTION");
    let err = fx.store.cancel_instance(fx.tenant, evaluation).unwrap_err();
    assert_eq!(engine_code(&err), "INVALID_ACTION");
}

// ============================================================================
// SECTION: Participant Management
// ============================================================================

#[test]
fn duplicate_participant_conflicts() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let (evaluation, [a, _, _]) = panel_instance(&fx, app);
    let err = fx.store.add_participant(fx.tenant, evaluation, a).unwrap_err();
    assert_eq!(engine_code(&err), "CONFLICT");
}

#[test]
fn submitted_participant_cannot_be_removed() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let (evaluation, [a, b, _]) = panel_instance(&fx, app);
    fx.store.submit_response(a, evaluation, &response(true, 4)).expect("submit");

    let err = fx.store.remove_participant(fx.tenant, evaluation, a).unwrap_err();
    assert_eq!(engine_code(&err), "VALIDATION");
    fx.store.remove_participant(fx.tenant, evaluation, b).expect("remove pending");
}

// ============================================================================
// SECTION: Template Versioning
// ============================================================================

#[test]
fn referenced_template_updates_create_a_new_version() {
    let fx = fixture();
    let app = fx.attach("Ada");
    let template = panel_template(&fx);
    fx.store.create_instance(fx.tenant, app, template, None).expect("instance");

    let updated = fx
        .store
        .update_template(
            fx.tenant,
            fx.owner,
            template,
            ParticipantType::Panel,
            Some(Aggregation::Majority),
            panel_schema(),
        )
        .expect("update");
    assert_ne!(updated.id, template);
    assert_eq!(updated.version, 2);
    assert!(updated.is_latest);
}

#[test]
fn unreferenced_template_updates_in_place() {
    let fx = fixture();
    let template = panel_template(&fx);
    let updated = fx
        .store
        .update_template(
            fx.tenant,
            fx.owner,
            template,
            ParticipantType::Sequential,
            None,
            panel_schema(),
        )
        .expect("update");
    assert_eq!(updated.id, template);
    assert_eq!(updated.version, 1);
    assert_eq!(updated.participant_type, ParticipantType::Sequential);
}

#[test]
fn template_writes_require_manage_settings() {
    let fx = fixture();
    let err = fx
        .store
        .create_template(
            fx.tenant,
            fx.viewer,
            "panel-review",
            ParticipantType::Panel,
            None,
            panel_schema(),
        )
        .unwrap_err();
    assert_eq!(engine_code(&err), "FORBIDDEN");
}

// ============================================================================
// SECTION: Auto-Creation
// ============================================================================

#[test]
fn stage_entry_auto_creates_configured_evaluations_once() {
    let fx = fixture();
    let template = panel_template(&fx);
    fx.store
        .configure_stage_evaluation(fx.tenant, fx.owner, fx.interview, template, true)
        .expect("configure");
    fx.install_advance(fx.screening, None);
    let app = fx.attach("Ada");

    fx.exec(fx.recruiter, app, "ADVANCE").expect("advance");
    let err = fx.store.create_instance(fx.tenant, app, template, Some(fx.interview)).unwrap_err();
    assert_eq!(engine_code(&err), "CONFLICT");

    // Re-entering the stage must not duplicate the instance.
    fx.store.move_stage(fx.tenant, fx.owner, app, fx.screening, None).expect("back");
    fx.store.move_stage(fx.tenant, fx.owner, app, fx.interview, None).expect("forth");
    let err = fx.store.create_instance(fx.tenant, app, template, Some(fx.interview)).unwrap_err();
    assert_eq!(engine_code(&err), "CONFLICT");
}

#[test]
fn hr_stage_resolves_job_creator_as_participant() {
    let fx = fixture();
    let template = panel_template(&fx);
    fx.store
        .configure_stage_evaluation(fx.tenant, fx.owner, fx.decision, template, true)
        .expect("configure");
    let app = fx.attach("Ada");

    fx.store.move_stage(fx.tenant, fx.owner, app, fx.decision, None).expect("move");

    // The decision stage is HR-conducted and the job creator is the owner.
    let instances = fx.store.list_evaluations(fx.tenant, app).expect("instances");
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].template_id, template);
    let participants =
        fx.store.evaluation_participants(fx.tenant, instances[0].id).expect("list");
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0].user_id, fx.owner);
    assert_eq!(participants[0].status, ParticipantStatus::Pending);
}

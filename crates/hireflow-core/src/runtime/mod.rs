// crates/hireflow-core/src/runtime/mod.rs
// ============================================================================
// Module: Hireflow Runtime
// Description: Pure decision-time logic for gates, planning, and aggregation.
// Purpose: Expose the deterministic evaluation helpers used by the store layer.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The runtime is the pure half of the engine: comparators turn signal
//! values into met/unmet outcomes, gates fold conditions with missing-signal
//! policies, planners compute transitions, and aggregation reduces panel
//! responses. Everything here is deterministic and I/O-free; the store layer
//! supplies rows and applies plans under its transaction.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod aggregate;
pub mod comparator;
pub mod decision;
pub mod gate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use aggregate::aggregate_responses;
pub use aggregate::validate_response;
pub use comparator::evaluate_condition;
pub use decision::ATTACH_EVENT;
pub use decision::ActionRequest;
pub use decision::DecisionContext;
pub use decision::DecisionPlan;
pub use decision::MOVE_STAGE_EVENT;
pub use decision::STATUS_CHANGE_EVENT;
pub use decision::is_blank;
pub use decision::plan_action;
pub use decision::plan_stage_move;
pub use decision::plan_status_change;
pub use gate::GateEvaluation;
pub use gate::evaluate_gate;

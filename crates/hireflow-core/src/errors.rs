// crates/hireflow-core/src/errors.rs
// ============================================================================
// Module: Hireflow Error Taxonomy
// Description: Closed decision-engine error set with stable short codes.
// Purpose: Give the outer layer a fixed surface to map onto transport errors.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every engine failure carries one of eleven stable codes plus a human
//! message. Failures inside a decision abort its transaction, so no partial
//! effect is observable; nothing is retried inside the core.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Engine Errors
// ============================================================================

/// Decision-engine error taxonomy.
///
/// # Invariants
/// - The variant set is closed; `code()` values are stable for transport
///   mapping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Addressed entity absent (application, stage, instance).
    #[error("not found: {0}")]
    NotFound(String),
    /// Persisted tenant disagrees with the caller's tenant.
    #[error("tenant mismatch: {0}")]
    TenantMismatch(String),
    /// Missing capability or non-participant submission.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Action not configured for the stage, or illegal transition.
    #[error("invalid action: {0}")]
    InvalidAction(String),
    /// Missing required notes or other argument-shape failure.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Stage feedback absent when the gate demands it.
    #[error("feedback required: {0}")]
    FeedbackRequired(String),
    /// Signal gate rejected the action.
    #[error("signal conditions not met: {0}")]
    SignalsNotMet(String),
    /// Completion refused due to missing submissions.
    #[error("evaluation incomplete: {0}")]
    EvaluationIncomplete(String),
    /// No catalog status matches the required outcome/terminal pair.
    #[error("invalid status: {0}")]
    InvalidStatus(String),
    /// Attempt to mutate a terminal application.
    #[error("terminal status: {0}")]
    TerminalStatus(String),
    /// Uniqueness violation (duplicate attach, participant, or signal race).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl EngineError {
    /// Returns the stable short code for the error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::TenantMismatch(_) => "TENANT_MISMATCH",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InvalidAction(_) => "INVALID_ACTION",
            Self::Validation(_) => "VALIDATION",
            Self::FeedbackRequired(_) => "FEEDBACK_REQUIRED",
            Self::SignalsNotMet(_) => "SIGNALS_NOT_MET",
            Self::EvaluationIncomplete(_) => "EVALUATION_INCOMPLETE",
            Self::InvalidStatus(_) => "INVALID_STATUS",
            Self::TerminalStatus(_) => "TERMINAL_STATUS",
            Self::Conflict(_) => "CONFLICT",
        }
    }
}

// crates/hireflow-core/src/core/stage.rs
// ============================================================================
// Module: Hireflow Pipeline Stages
// Description: Ordered pipeline stage references and stage classifications.
// Purpose: Provide the frozen stage topology the engine navigates.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! A pipeline owns an ordered sequence of stages. Stage authoring is an
//! external concern; the engine treats the stage list as frozen once any
//! application is attached and navigates it purely by `order_index`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::PipelineId;
use crate::core::identifiers::StageId;
use crate::core::identifiers::TenantId;

// ============================================================================
// SECTION: Stage Classification
// ============================================================================

/// Classification of a pipeline stage.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageType {
    /// Resume or phone screening.
    Screening,
    /// Interview round.
    Interview,
    /// Hiring decision point.
    Decision,
    /// Outcome communication.
    Outcome,
    /// Internal review.
    Review,
    /// Final sign-off review.
    FinalReview,
}

impl StageType {
    /// Returns the stable wire label for the stage type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Screening => "screening",
            Self::Interview => "interview",
            Self::Decision => "decision",
            Self::Outcome => "outcome",
            Self::Review => "review",
            Self::FinalReview => "final_review",
        }
    }

    /// Parses a stage type from its stable wire label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "screening" => Some(Self::Screening),
            "interview" => Some(Self::Interview),
            "decision" => Some(Self::Decision),
            "outcome" => Some(Self::Outcome),
            "review" => Some(Self::Review),
            "final_review" => Some(Self::FinalReview),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Stage References
// ============================================================================

/// One stage of a pipeline, addressed by stable identifier.
///
/// # Invariants
/// - `(pipeline_id, order_index)` is unique within the pipeline.
/// - The stage list is frozen once any application exists on the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRef {
    /// Stage identifier.
    pub id: StageId,
    /// Tenant owning the pipeline.
    pub tenant_id: TenantId,
    /// Pipeline the stage belongs to.
    pub pipeline_id: PipelineId,
    /// Zero-based position within the pipeline.
    pub order_index: i64,
    /// Human-facing stage name (also the feedback scope label).
    pub name: String,
    /// Stage classification.
    pub stage_type: StageType,
    /// Label of the party conducting the stage (for example `HR`).
    pub conducted_by: String,
}

impl StageRef {
    /// Returns whether the stage is conducted by HR (case-insensitive).
    #[must_use]
    pub fn is_hr_conducted(&self) -> bool {
        self.conducted_by.eq_ignore_ascii_case("HR")
    }
}

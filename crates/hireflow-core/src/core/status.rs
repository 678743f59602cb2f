// crates/hireflow-core/src/core/status.rs
// ============================================================================
// Module: Hireflow Status Catalog
// Description: Tenant-scoped application statuses and outcome mapping.
// Purpose: Resolve presentation statuses from outcome/terminal pairs deterministically.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! Every tenant owns a configurable catalog of application statuses. Each
//! status maps to an outcome family and a terminal flag; the engine resolves
//! the presentation status for a computed `(outcome_type, is_terminal)` pair
//! by picking the active definition with the lowest sort order. Tenants are
//! auto-seeded with five defaults at creation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ActionCode;
use crate::core::identifiers::StatusCode;
use crate::core::identifiers::TenantId;

// ============================================================================
// SECTION: Outcome Types
// ============================================================================

/// High-level outcome family of an application.
///
/// # Invariants
/// - Variants are stable for serialization and status resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeType {
    /// Application is progressing through the pipeline.
    Active,
    /// Application is paused at its current stage.
    Hold,
    /// Application reached a successful terminal outcome.
    Success,
    /// Application reached a failed terminal outcome.
    Failure,
    /// Application reached a neutral terminal outcome (for example withdrawal).
    Neutral,
}

impl OutcomeType {
    /// Returns the stable wire label for the outcome type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Hold => "HOLD",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Neutral => "NEUTRAL",
        }
    }

    /// Parses an outcome type from its stable wire label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "ACTIVE" => Some(Self::Active),
            "HOLD" => Some(Self::Hold),
            "SUCCESS" => Some(Self::Success),
            "FAILURE" => Some(Self::Failure),
            "NEUTRAL" => Some(Self::Neutral),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Status Definitions
// ============================================================================

/// One tenant-configured application status.
///
/// # Invariants
/// - `(tenant_id, status_code)` is unique within the catalog.
/// - A status referenced by any pipeline state row must not be deactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDefinition {
    /// Tenant owning the status.
    pub tenant_id: TenantId,
    /// Stable presentation code (for example `ON_HOLD`).
    pub status_code: StatusCode,
    /// Human-facing display name.
    pub display_name: String,
    /// Action code conventionally producing this status.
    pub action_code: ActionCode,
    /// Whether the status is terminal.
    pub is_terminal: bool,
    /// Outcome family the status belongs to.
    pub outcome_type: OutcomeType,
    /// Resolution priority; lower sorts first.
    pub sort_order: i64,
    /// Whether the status participates in resolution.
    pub is_active: bool,
}

/// Tenant status catalog loaded from persisted state.
///
/// # Invariants
/// - Definitions belong to a single tenant.
/// - Resolution considers active definitions only.
#[derive(Debug, Clone, Default)]
pub struct StatusCatalog {
    /// Status definitions ordered by `sort_order`.
    definitions: Vec<StatusDefinition>,
}

impl StatusCatalog {
    /// Creates a catalog from persisted definitions, sorting by priority.
    #[must_use]
    pub fn new(mut definitions: Vec<StatusDefinition>) -> Self {
        definitions.sort_by(|a, b| {
            a.sort_order.cmp(&b.sort_order).then_with(|| a.status_code.cmp(&b.status_code))
        });
        Self {
            definitions,
        }
    }

    /// Returns all definitions in resolution order.
    #[must_use]
    pub fn definitions(&self) -> &[StatusDefinition] {
        &self.definitions
    }

    /// Resolves the status for an outcome/terminal pair.
    ///
    /// Picks the active definition with the lowest sort order whose
    /// `(outcome_type, is_terminal)` matches, or `None` when the tenant has
    /// not configured a matching status.
    #[must_use]
    pub fn resolve_for_outcome(
        &self,
        outcome: OutcomeType,
        terminal: bool,
    ) -> Option<&StatusDefinition> {
        self.definitions
            .iter()
            .find(|def| def.is_active && def.outcome_type == outcome && def.is_terminal == terminal)
    }

    /// Returns the definition for a status code when present.
    #[must_use]
    pub fn get(&self, code: &StatusCode) -> Option<&StatusDefinition> {
        self.definitions.iter().find(|def| &def.status_code == code)
    }

    /// Returns whether a status code is terminal (false when unknown).
    #[must_use]
    pub fn is_terminal(&self, code: &StatusCode) -> bool {
        self.get(code).is_some_and(|def| def.is_terminal)
    }

    /// Returns whether a status code exists and is active.
    #[must_use]
    pub fn contains_active(&self, code: &StatusCode) -> bool {
        self.get(code).is_some_and(|def| def.is_active)
    }
}

// ============================================================================
// SECTION: Default Seeds
// ============================================================================

/// Seed tuple for a default status: code, display name, action code,
/// terminal flag, outcome type, and sort order.
type StatusSeed = (&'static str, &'static str, &'static str, bool, OutcomeType, i64);

/// Default statuses seeded for every new tenant.
const DEFAULT_STATUS_SEEDS: [StatusSeed; 5] = [
    ("ACTIVE", "Active", "ACTIVATE", false, OutcomeType::Active, 10),
    ("ON_HOLD", "On Hold", "HOLD", false, OutcomeType::Hold, 20),
    ("HIRED", "Hired", "HIRE", true, OutcomeType::Success, 30),
    ("REJECTED", "Rejected", "REJECT", true, OutcomeType::Failure, 40),
    ("WITHDRAWN", "Withdrawn", "WITHDRAW", true, OutcomeType::Neutral, 50),
];

/// Builds the default status definitions for a tenant.
#[must_use]
pub fn default_statuses(tenant_id: TenantId) -> Vec<StatusDefinition> {
    DEFAULT_STATUS_SEEDS
        .iter()
        .map(|(code, display, action, terminal, outcome, sort)| StatusDefinition {
            tenant_id,
            status_code: StatusCode::new(*code),
            display_name: (*display).to_string(),
            action_code: ActionCode::new(*action),
            is_terminal: *terminal,
            outcome_type: *outcome,
            sort_order: *sort,
            is_active: true,
        })
        .collect()
}

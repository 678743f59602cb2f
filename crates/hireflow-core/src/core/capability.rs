// crates/hireflow-core/src/core/capability.rs
// ============================================================================
// Module: Hireflow Capabilities
// Description: Tenant-scoped permission tokens and default role grants.
// Purpose: Model the closed capability set gating engine operations.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! Capabilities are tenant-scoped permission tokens owned by roles. The set
//! is closed: configuration writes reject unknown tokens, and the resolver
//! answers membership questions from persisted `(tenant, role, capability)`
//! grants only. Role names themselves are tenant data; the defaults below
//! are seeded at tenant creation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde::de;

use crate::core::identifiers::RoleName;

// ============================================================================
// SECTION: Capability Tokens
// ============================================================================

/// Permission token gating one class of engine operation.
///
/// # Invariants
/// - Wire labels are stable; unknown labels are rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// Execute actions that move an application to the next stage.
    AdvanceStage,
    /// Execute actions that produce a terminal outcome.
    TerminateApplication,
    /// Change an application's presentation status directly.
    ChangeStatus,
    /// Record stage feedback for an application.
    ProvideFeedback,
    /// Read pipeline state, history, and the decision log.
    ViewTracking,
    /// Administer tenant configuration (statuses, actions, manual signals).
    ManageSettings,
    /// Move an application to an arbitrary stage of its pipeline.
    OverrideFlow,
    /// Blanket feedback grant covering all feedback scopes.
    FeedbackAll,
}

impl Capability {
    /// Returns the stable wire label for the capability.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AdvanceStage => "ADVANCE_STAGE",
            Self::TerminateApplication => "TERMINATE_APPLICATION",
            Self::ChangeStatus => "CHANGE_STATUS",
            Self::ProvideFeedback => "PROVIDE_FEEDBACK",
            Self::ViewTracking => "VIEW_TRACKING",
            Self::ManageSettings => "MANAGE_SETTINGS",
            Self::OverrideFlow => "OVERRIDE_FLOW",
            Self::FeedbackAll => "feedback:*",
        }
    }

    /// Parses a capability from its stable wire label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "ADVANCE_STAGE" => Some(Self::AdvanceStage),
            "TERMINATE_APPLICATION" => Some(Self::TerminateApplication),
            "CHANGE_STATUS" => Some(Self::ChangeStatus),
            "PROVIDE_FEEDBACK" => Some(Self::ProvideFeedback),
            "VIEW_TRACKING" => Some(Self::ViewTracking),
            "MANAGE_SETTINGS" => Some(Self::ManageSettings),
            "OVERRIDE_FLOW" => Some(Self::OverrideFlow),
            "feedback:*" => Some(Self::FeedbackAll),
            _ => None,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Capability {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Capability {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Self::parse(&label)
            .ok_or_else(|| de::Error::custom(format!("unknown capability: {label}")))
    }
}

// ============================================================================
// SECTION: Default Role Grants
// ============================================================================

/// Seed tuple for a default role grant: role name and granted capabilities.
type RoleSeed = (&'static str, &'static [Capability]);

/// Default role capability grants seeded for every new tenant.
const DEFAULT_ROLE_SEEDS: [RoleSeed; 5] = [
    (
        "OWNER",
        &[
            Capability::AdvanceStage,
            Capability::TerminateApplication,
            Capability::ChangeStatus,
            Capability::ProvideFeedback,
            Capability::ViewTracking,
            Capability::ManageSettings,
            Capability::OverrideFlow,
            Capability::FeedbackAll,
        ],
    ),
    (
        "ADMIN",
        &[
            Capability::AdvanceStage,
            Capability::TerminateApplication,
            Capability::ChangeStatus,
            Capability::ProvideFeedback,
            Capability::ViewTracking,
            Capability::ManageSettings,
            Capability::OverrideFlow,
            Capability::FeedbackAll,
        ],
    ),
    (
        "RECRUITER",
        &[
            Capability::AdvanceStage,
            Capability::TerminateApplication,
            Capability::ChangeStatus,
            Capability::ProvideFeedback,
            Capability::ViewTracking,
            Capability::FeedbackAll,
        ],
    ),
    (
        "INTERVIEWER",
        &[Capability::ProvideFeedback, Capability::ViewTracking],
    ),
    ("VIEWER", &[Capability::ViewTracking]),
];

/// Builds the default `(role, capability)` grants for a tenant.
#[must_use]
pub fn default_role_capabilities() -> Vec<(RoleName, Capability)> {
    let mut grants = Vec::new();
    for (role, capabilities) in DEFAULT_ROLE_SEEDS {
        for capability in capabilities {
            grants.push((RoleName::new(role), *capability));
        }
    }
    grants
}

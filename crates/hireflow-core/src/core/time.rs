// crates/hireflow-core/src/core/time.rs
// ============================================================================
// Module: Hireflow Time Model
// Description: Canonical timestamp representation for pipeline state and logs.
// Purpose: Provide deterministic, host-supplied time values across Hireflow records.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Hireflow stamps every mutation with an explicit timestamp supplied by the
//! host (the store layer). The core engine never reads wall-clock time
//! directly, which keeps decision planning deterministic and replayable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical timestamp used in Hireflow state, history, and log records.
///
/// # Invariants
/// - Unix epoch milliseconds; values are explicitly provided by callers.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// crates/hireflow-store-sqlite/src/lib.rs
// ============================================================================
// Module: Hireflow SQLite Store Library
// Description: Public API surface for the SQLite-backed decision store.
// Purpose: Expose the transactional engine operations over persisted state.
// Dependencies: hireflow-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate persists the Hireflow decision engine in `SQLite` and drives
//! every contracted operation as a single immediate transaction: action
//! execution, stage moves, status changes, the evaluation lifecycle with
//! signal aggregation, manual signal overrides, and the read-only execution
//! log projections. Pure decision logic lives in `hireflow-core`; this crate
//! loads rows, delegates planning, and applies the plans atomically.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod audit;
mod catalog;
mod engine;
mod evaluations;
mod provision;
mod schema;
mod signals;
mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::DecisionLogEntry;
pub use audit::DecisionLogFilter;
pub use schema::SCHEMA_VERSION;
pub use store::HireflowStore;
pub use store::SqliteJournalMode;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteSyncMode;
pub use store::StoreResult;

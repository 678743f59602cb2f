// crates/hireflow-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Decision Store
// Description: Durable Hireflow store backed by SQLite WAL.
// Purpose: Own the connection, transactions, and error mapping for the engine.
// Dependencies: hireflow-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module owns the store plumbing: configuration, connection pragmas,
//! and the single writer connection every operation serializes through.
//! Each engine operation runs as one `BEGIN IMMEDIATE` transaction, which
//! takes the write lock up front and linearizes all decisions touching the
//! same application; any error aborts the transaction, so partial effects
//! are impossible. Constraint violations surface as the engine's `CONFLICT`
//! error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use hireflow_core::EngineError;
use hireflow_core::Timestamp;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::TransactionBehavior;
use serde::Deserialize;
use thiserror::Error;

use crate::schema::initialize_schema;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` decision store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a configuration with defaults for the provided path.
    #[must_use]
    pub fn for_path(path: PathBuf) -> Self {
        Self {
            path,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - `Engine` wraps the closed decision-engine taxonomy unchanged; the
///   remaining variants are store plumbing.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Decision-engine failure with a stable short code.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// `SQLite` engine error.
    #[error("store db error: {0}")]
    Db(String),
    /// Persisted data failed to parse back into domain types.
    #[error("store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("store version mismatch: {0}")]
    VersionMismatch(String),
    /// Connection mutex poisoned by a panicking holder.
    #[error("store mutex poisoned")]
    Poisoned,
}

impl SqliteStoreError {
    /// Maps a `rusqlite` error, surfacing uniqueness violations as `CONFLICT`.
    #[must_use]
    pub fn from_sqlite(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &err {
            if failure.code == rusqlite::ErrorCode::ConstraintViolation {
                let detail = message.clone().unwrap_or_else(|| "uniqueness violation".to_string());
                return Self::Engine(EngineError::Conflict(detail));
            }
        }
        Self::Db(err.to_string())
    }
}

/// Store result alias.
pub type StoreResult<T> = Result<T, SqliteStoreError>;

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed Hireflow decision store.
///
/// # Invariants
/// - All access is serialized through the single mutexed connection.
/// - Every operation is one transaction; no partial effect survives an error.
pub struct HireflowStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Writer connection guarded by a mutex.
    connection: Mutex<Connection>,
}

impl HireflowStore {
    /// Opens a durable store at the configured path.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or the
    /// schema cannot be initialized.
    pub fn open(config: SqliteStoreConfig) -> StoreResult<Self> {
        let connection = Connection::open_with_flags(
            &config.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Self::apply_pragmas(&connection, &config)?;
        initialize_schema(&connection)?;
        Ok(Self {
            config,
            connection: Mutex::new(connection),
        })
    }

    /// Opens an in-memory store for tests and ephemeral use.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the schema cannot be initialized.
    pub fn in_memory() -> StoreResult<Self> {
        let connection = Connection::open_in_memory()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        connection
            .pragma_update(None, "foreign_keys", "on")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        initialize_schema(&connection)?;
        Ok(Self {
            config: SqliteStoreConfig::for_path(PathBuf::from(":memory:")),
            connection: Mutex::new(connection),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Applies connection pragmas from the configuration.
    fn apply_pragmas(connection: &Connection, config: &SqliteStoreConfig) -> StoreResult<()> {
        connection
            .pragma_update(None, "journal_mode", config.journal_mode.pragma_value())
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        connection
            .pragma_update(None, "synchronous", config.sync_mode.pragma_value())
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        connection
            .pragma_update(None, "foreign_keys", "on")
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        connection
            .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Locks the writer connection.
    pub(crate) fn lock_connection(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|_| SqliteStoreError::Poisoned)
    }

    /// Runs one operation inside an immediate (write-locking) transaction.
    ///
    /// # Errors
    ///
    /// Propagates the operation's error after rolling the transaction back.
    pub(crate) fn with_immediate_txn<T>(
        &self,
        op: impl FnOnce(&rusqlite::Transaction<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut guard = self.lock_connection()?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(SqliteStoreError::from_sqlite)?;
        let value = op(&tx)?;
        tx.commit().map_err(SqliteStoreError::from_sqlite)?;
        Ok(value)
    }
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Returns the current wall-clock time as a store timestamp.
///
/// The core never reads the clock; every mutation is stamped here, at the
/// store boundary.
#[must_use]
pub fn now() -> Timestamp {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));
    Timestamp::from_unix_millis(millis)
}

// crates/squid-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Quota Store
// Description: Durable QuotaStateStore backed by SQLite.
// Purpose: Persist the quota tracker so daily accounting survives restarts.
// Dependencies: squid-gate-core, rusqlite, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements [`QuotaStateStore`] on a single-row `SQLite` table.
//! Every save replaces the row inside a transaction, so a reader sees either
//! the previous tracker or the new one. Payloads are size-capped in both
//! directions and undecodable rows surface as [`SqliteStoreError::Corrupt`],
//! which hosts treat as "start fresh".
//!
//! Concurrent helper processes sharing one database serialize their writes
//! through `SQLite` locking, but each process keeps its own in-memory tracker,
//! so the last writer wins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use squid_gate_core::QuotaStateStore;
use squid_gate_core::QuotaTracker;
use squid_gate_core::StoreError;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Schema version written to `store_meta`.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout for `SQLite` connections (milliseconds).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum serialized tracker size in bytes.
pub const MAX_STATE_BYTES: usize = 64 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Row key of the tracker record.
const TRACKER_KEY: &str = "quota_tracker";
/// Journal and durability settings applied to every connection.
const STORE_PRAGMAS: &str = "PRAGMA journal_mode = WAL; PRAGMA synchronous = FULL;";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for the `SQLite` quota store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
}

impl SqliteStoreConfig {
    /// Creates a configuration for `path` with the default busy timeout.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding raw tracker payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Persisted tracker cannot be decoded.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store configuration or data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Tracker payload exceeded the size limit.
    #[error("sqlite store payload too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) | SqliteStoreError::Invalid(message) => {
                Self::Invalid(message)
            }
            SqliteStoreError::TooLarge {
                max_bytes,
                actual_bytes,
            } => Self::Corrupt(format!(
                "state_json exceeds size limit: {actual_bytes} bytes (max {max_bytes})"
            )),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed quota tracker store.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - At most one tracker row exists.
pub struct SqliteQuotaStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared connection.
    connection: Mutex<Connection>,
}

impl SqliteQuotaStore {
    /// Opens (or creates) the store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is unusable, the database
    /// cannot be opened, or the schema version is unknown.
    pub fn open(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Mutex::new(connection),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Loads the persisted tracker.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Corrupt`] or [`SqliteStoreError::TooLarge`]
    /// when the stored row cannot be used.
    pub fn load_tracker(&self) -> Result<Option<QuotaTracker>, SqliteStoreError> {
        let connection = self.lock()?;
        let payload: Option<Vec<u8>> = connection
            .query_row(
                "SELECT state_json FROM quota_state WHERE state_key = ?1",
                params![TRACKER_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        drop(connection);
        let Some(payload) = payload else {
            return Ok(None);
        };
        if payload.len() > MAX_STATE_BYTES {
            return Err(SqliteStoreError::TooLarge {
                max_bytes: MAX_STATE_BYTES,
                actual_bytes: payload.len(),
            });
        }
        serde_json::from_slice(&payload)
            .map(Some)
            .map_err(|err| SqliteStoreError::Corrupt(err.to_string()))
    }

    /// Replaces the persisted tracker.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when serialization or the write fails.
    pub fn save_tracker(&self, tracker: &QuotaTracker) -> Result<(), SqliteStoreError> {
        let payload =
            serde_json::to_vec(tracker).map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if payload.len() > MAX_STATE_BYTES {
            return Err(SqliteStoreError::TooLarge {
                max_bytes: MAX_STATE_BYTES,
                actual_bytes: payload.len(),
            });
        }
        let mut connection = self.lock()?;
        let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        tx.execute(
            "INSERT OR REPLACE INTO quota_state (state_key, state_json, saved_at)
             VALUES (?1, ?2, ?3)",
            params![TRACKER_KEY, payload, unix_millis()],
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("connection mutex poisoned".to_string()))
    }
}

impl QuotaStateStore for SqliteQuotaStore {
    fn load(&self) -> Result<Option<QuotaTracker>, StoreError> {
        self.load_tracker().map_err(StoreError::from)
    }

    fn save(&self, tracker: &QuotaTracker) -> Result<(), StoreError> {
        self.save_tracker(tracker).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Creates the parent directory of `path` when missing.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(SqliteStoreError::Invalid(
            "store path contains an overlong component".to_string(),
        ));
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection and applies pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies WAL journaling, full sync, and the busy timeout.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(STORE_PRAGMAS)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS quota_state (
                    state_key TEXT PRIMARY KEY,
                    state_json BLOB NOT NULL,
                    saved_at INTEGER NOT NULL
                );",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(SCHEMA_VERSION) => {}
        Some(other) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "expected schema version {SCHEMA_VERSION}, found {other}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

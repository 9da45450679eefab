// crates/squid-gate-store-sqlite/tests/sqlite_store_unit.rs
// ============================================================================
// Module: SQLite Quota Store Unit Tests
// Description: Persistence, path safety, and corruption tests for the quota store.
// Purpose: Ensure tracker state survives restarts and bad rows fail closed.
// ============================================================================

//! ## Overview
//! Unit-level tests for the `SQLite` quota store:
//! - Round trips and persistence across reopen
//! - Empty databases load as `None`
//! - Corrupt, oversized, and version-mismatched data is reported
//! - Directory paths are rejected

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

use std::path::Path;
use std::path::PathBuf;

use rusqlite::Connection;
use rusqlite::params;
use squid_gate_core::QuotaStateStore;
use squid_gate_core::QuotaTracker;
use squid_gate_core::StoreError;
use squid_gate_store_sqlite::MAX_STATE_BYTES;
use squid_gate_store_sqlite::SqliteQuotaStore;
use squid_gate_store_sqlite::SqliteStoreConfig;
use squid_gate_store_sqlite::SqliteStoreError;
use tempfile::TempDir;
use time::Duration;
use time::macros::datetime;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("state").join("quota.sqlite3")
}

fn open(path: &Path) -> SqliteQuotaStore {
    SqliteQuotaStore::open(SqliteStoreConfig::new(path)).unwrap()
}

fn charged_tracker() -> QuotaTracker {
    let mut tracker = QuotaTracker::new(120);
    let start = datetime!(2024-05-01 09:00 +9);
    tracker.update(start);
    tracker.update(start + Duration::minutes(11));
    tracker
}

fn overwrite_row(path: &Path, payload: &[u8]) {
    let connection = Connection::open(path).unwrap();
    connection
        .execute(
            "INSERT OR REPLACE INTO quota_state (state_key, state_json, saved_at)
             VALUES ('quota_tracker', ?1, 0)",
            params![payload],
        )
        .unwrap();
}

// ============================================================================
// SECTION: Persistence
// ============================================================================

#[test]
fn empty_store_loads_none() {
    let dir = TempDir::new().unwrap();
    let store = open(&db_path(&dir));
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn saved_tracker_round_trips() {
    let dir = TempDir::new().unwrap();
    let store = open(&db_path(&dir));
    let tracker = charged_tracker();
    store.save(&tracker).unwrap();

    let loaded = store.load().unwrap().unwrap();
    assert_eq!(loaded, tracker);
    assert_eq!(loaded.accumulated_minutes(), 20);
    assert_eq!(loaded.last_event(), tracker.last_event());
}

#[test]
fn tracker_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let tracker = charged_tracker();
    {
        let store = open(&path);
        store.save(&QuotaTracker::new(120)).unwrap();
        store.save(&tracker).unwrap();
    }
    let reopened = open(&path);
    assert_eq!(reopened.load().unwrap(), Some(tracker));
}

#[test]
fn store_uses_wal_journal_and_configured_timeout() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let config = SqliteStoreConfig {
        busy_timeout_ms: 100,
        ..SqliteStoreConfig::new(&path)
    };
    let store = SqliteQuotaStore::open(config).unwrap();
    store.save(&charged_tracker()).unwrap();
    assert_eq!(store.config().busy_timeout_ms, 100);

    let connection = Connection::open(&path).unwrap();
    let journal: String =
        connection.pragma_query_value(None, "journal_mode", |row| row.get(0)).unwrap();
    assert_eq!(journal, "wal");
}

// ============================================================================
// SECTION: Failure Handling
// ============================================================================

#[test]
fn corrupt_row_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let store = open(&path);
    overwrite_row(&path, b"{not a tracker");

    assert!(matches!(store.load_tracker(), Err(SqliteStoreError::Corrupt(_))));
    assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
}

#[test]
fn corrupt_row_is_replaced_by_next_save() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let store = open(&path);
    overwrite_row(&path, b"[]");
    assert!(store.load().is_err());

    let tracker = charged_tracker();
    store.save(&tracker).unwrap();
    assert_eq!(store.load().unwrap(), Some(tracker));
}

#[test]
fn oversized_row_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let store = open(&path);
    overwrite_row(&path, &vec![b' '; MAX_STATE_BYTES + 1]);

    assert!(matches!(store.load_tracker(), Err(SqliteStoreError::TooLarge { .. })));
}

#[test]
fn unknown_schema_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    drop(open(&path));
    let connection = Connection::open(&path).unwrap();
    connection.execute("UPDATE store_meta SET version = 99", params![]).unwrap();
    drop(connection);

    let result = SqliteQuotaStore::open(SqliteStoreConfig::new(&path));
    assert!(matches!(result, Err(SqliteStoreError::VersionMismatch(_))));
}

#[test]
fn directory_path_is_rejected() {
    let dir = TempDir::new().unwrap();
    let result = SqliteQuotaStore::open(SqliteStoreConfig::new(dir.path()));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

#[test]
fn empty_path_is_rejected() {
    let result = SqliteQuotaStore::open(SqliteStoreConfig::new(""));
    assert!(matches!(result, Err(SqliteStoreError::Invalid(_))));
}

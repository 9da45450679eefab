// crates/squid-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: Squid Gate SQLite Store
// Description: SQLite-backed persistence for the quota tracker.
// Purpose: Keep daily quota accounting across helper restarts.
// Dependencies: squid-gate-core, rusqlite, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Durable [`squid_gate_core::QuotaStateStore`] implementation. The database
//! holds a single tracker row that is replaced on every save.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::DEFAULT_BUSY_TIMEOUT_MS;
pub use store::MAX_STATE_BYTES;
pub use store::SqliteQuotaStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;

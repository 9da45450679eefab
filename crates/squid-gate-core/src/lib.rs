// crates/squid-gate-core/src/lib.rs
// ============================================================================
// Module: Squid Gate Core
// Description: Quota-tracked gating engine for proxy redirector helpers.
// Purpose: Decide whether a requested video may play, given quality and quota.
// Dependencies: chrono, serde, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! Squid Gate core owns the gating model: a persistent daily time-budget
//! tracker ([`QuotaTracker`]), a pure quality predicate ([`is_acceptable`]),
//! and the [`DecisionEngine`] that combines both with external content
//! metadata into a [`Verdict`].
//!
//! The core never talks to the network or to disk directly. Metadata lookups,
//! quota persistence, and audit output are reached through the traits in
//! [`interfaces`] and [`audit`], so hosts decide how those concerns are backed.
//! Invariants:
//! - Wall-clock time enters only through a [`Clock`] implementation.
//! - A request mutates the quota tracker at most once.
//! - Metadata failures never surface as errors; they become
//!   [`MetadataLookup::Unresolved`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::audit::FileAuditSink;
pub use crate::audit::GateAuditEvent;
pub use crate::audit::GateAuditKind;
pub use crate::audit::GateAuditSink;
pub use crate::audit::NoopAuditSink;
pub use crate::audit::StderrAuditSink;
#[cfg(unix)]
pub use crate::audit::SyslogAuditSink;
pub use crate::core::identifiers::ContentId;
pub use crate::core::metadata::MetadataLookup;
pub use crate::core::metadata::MetadataRecord;
pub use crate::core::quality::QualityThresholds;
pub use crate::core::quality::good_ratio_percent;
pub use crate::core::quality::is_acceptable;
pub use crate::core::quota::QUOTA_QUANTUM_MINUTES;
pub use crate::core::quota::QuotaTracker;
pub use crate::core::quota::QuotaTransition;
pub use crate::core::time::Clock;
pub use crate::core::time::ClockError;
pub use crate::core::time::HostZone;
pub use crate::core::time::LocalZone;
pub use crate::core::time::ManualClock;
pub use crate::core::time::SystemClock;
pub use crate::core::time::unix_millis;
pub use crate::core::verdict::Verdict;
pub use crate::core::verdict::VerdictKind;
pub use crate::core::verdict::VerdictReason;
pub use crate::interfaces::DisabledMetadataSource;
pub use crate::interfaces::InMemoryQuotaStore;
pub use crate::interfaces::MetadataError;
pub use crate::interfaces::MetadataSource;
pub use crate::interfaces::QuotaStateStore;
pub use crate::interfaces::StoreError;
pub use crate::interfaces::lookup_from_result;
pub use crate::runtime::DecisionEngine;
pub use crate::runtime::GateRequest;

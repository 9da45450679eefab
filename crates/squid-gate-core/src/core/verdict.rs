// crates/squid-gate-core/src/core/verdict.rs
// ============================================================================
// Module: Gate Verdicts
// Description: Decision output of the gating engine.
// Purpose: Carry the accept/reject outcome plus the facts behind it.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Verdict`] is either [`VerdictKind::Accept`] or
//! [`VerdictKind::RewriteReject`]. It keeps the requester token, the lookup
//! outcome, and the accumulated quota so hosts can log why it was reached.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ContentId;
use crate::core::metadata::MetadataLookup;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Gating outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    /// Let the request through unchanged.
    Accept,
    /// Rewrite the request to the safe destination.
    RewriteReject,
}

/// Reason attached to a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    /// Quality and quota checks passed.
    Accepted,
    /// Resolved metadata failed the quality gate.
    QualityCheckFailed,
    /// The daily time budget is spent.
    TimeLimitExceeded,
}

impl VerdictReason {
    /// Returns the human-readable reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::QualityCheckFailed => "quality check failed",
            Self::TimeLimitExceeded => "time limit exceeded",
        }
    }

    /// Returns the verdict kind implied by the reason.
    #[must_use]
    pub const fn kind(self) -> VerdictKind {
        match self {
            Self::Accepted => VerdictKind::Accept,
            Self::QualityCheckFailed | Self::TimeLimitExceeded => VerdictKind::RewriteReject,
        }
    }
}

/// Decision reached for one gated request.
///
/// # Invariants
/// - `kind` always equals `reason.kind()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Gating outcome.
    pub kind: VerdictKind,
    /// Why the outcome was reached.
    pub reason: VerdictReason,
    /// Requester token taken from the request line.
    pub requester: String,
    /// Content the request asked for.
    pub content_id: ContentId,
    /// Metadata lookup outcome.
    pub metadata: MetadataLookup,
    /// Minutes credited to the quota window after the update.
    pub accumulated_minutes: u64,
}

impl Verdict {
    /// Builds a verdict whose kind follows from `reason`.
    #[must_use]
    pub fn new(
        reason: VerdictReason,
        requester: String,
        content_id: ContentId,
        metadata: MetadataLookup,
        accumulated_minutes: u64,
    ) -> Self {
        Self {
            kind: reason.kind(),
            reason,
            requester,
            content_id,
            metadata,
            accumulated_minutes,
        }
    }

    /// Returns true for an accepting verdict.
    #[must_use]
    pub const fn is_accept(&self) -> bool {
        matches!(self.kind, VerdictKind::Accept)
    }
}

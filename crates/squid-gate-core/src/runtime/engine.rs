// crates/squid-gate-core/src/runtime/engine.rs
// ============================================================================
// Module: Decision Engine
// Description: Per-request pipeline combining quota, metadata, and quality.
// Purpose: Produce a verdict for a recognized content request.
// Dependencies: crate::core, crate::interfaces, crate::audit
// ============================================================================

//! ## Overview
//! [`DecisionEngine::evaluate`] runs the gating pipeline for one request:
//! 1. charge the quota tracker and persist it right away, so a crash later in
//!    the request cannot lose the charge;
//! 2. look up content metadata;
//! 3. reject when resolved metadata fails the quality gate;
//! 4. reject when the quota is spent;
//! 5. accept otherwise.
//!
//! Quality runs before quota, and an unresolved lookup skips the quality
//! check entirely; the lookup failure cause is audited. Persistence failures
//! are audited and do not change the verdict; the in-memory tracker stays
//! authoritative.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::audit::GateAuditEvent;
use crate::audit::GateAuditKind;
use crate::audit::GateAuditSink;
use crate::core::identifiers::ContentId;
use crate::core::metadata::MetadataLookup;
use crate::core::quality::QualityThresholds;
use crate::core::quota::QuotaTracker;
use crate::core::time::Clock;
use crate::core::verdict::Verdict;
use crate::core::verdict::VerdictReason;
use crate::interfaces::MetadataSource;
use crate::interfaces::QuotaStateStore;
use crate::interfaces::lookup_from_result;

// ============================================================================
// SECTION: Request
// ============================================================================

/// A request that carries a recognized content identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRequest {
    /// Requested content.
    pub content_id: ContentId,
    /// Opaque requester token, used for logging only.
    pub requester: String,
}

impl GateRequest {
    /// Creates a gate request.
    #[must_use]
    pub fn new(content_id: ContentId, requester: impl Into<String>) -> Self {
        Self {
            content_id,
            requester: requester.into(),
        }
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Gating pipeline over a metadata source and a clock.
pub struct DecisionEngine<M, C> {
    /// Metadata lookup backend.
    metadata: M,
    /// Time source, read once per request.
    clock: C,
    /// Quality gate thresholds.
    thresholds: QualityThresholds,
    /// Audit sink for quota and verdict events.
    audit: Arc<dyn GateAuditSink>,
}

impl<M: MetadataSource, C: Clock> DecisionEngine<M, C> {
    /// Creates a decision engine.
    #[must_use]
    pub fn new(
        metadata: M,
        clock: C,
        thresholds: QualityThresholds,
        audit: Arc<dyn GateAuditSink>,
    ) -> Self {
        Self {
            metadata,
            clock,
            thresholds,
            audit,
        }
    }

    /// Returns the engine clock.
    #[must_use]
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Returns the audit sink.
    #[must_use]
    pub fn audit(&self) -> &Arc<dyn GateAuditSink> {
        &self.audit
    }

    /// Returns the quality thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> QualityThresholds {
        self.thresholds
    }

    /// Evaluates one gated request against the quota tracker.
    ///
    /// The tracker is charged and saved to `store` before the metadata lookup.
    pub fn evaluate(
        &self,
        tracker: &mut QuotaTracker,
        store: &dyn QuotaStateStore,
        request: &GateRequest,
    ) -> Verdict {
        let now = self.clock.now();

        let transition = tracker.update(now);
        self.audit.record(
            &GateAuditEvent::new(GateAuditKind::from_transition(transition), now)
                .with_request(&request.requester, &request.content_id)
                .with_quota(tracker),
        );
        if let Err(err) = store.save(tracker) {
            self.audit.record(
                &GateAuditEvent::new(GateAuditKind::StoreSaveFailed, now)
                    .with_quota(tracker)
                    .with_reason(err.to_string()),
            );
        }

        let result = self.metadata.try_fetch(&request.content_id);
        if let Err(err) = &result {
            self.audit.record(
                &GateAuditEvent::new(GateAuditKind::MetadataUnresolved, now)
                    .with_request(&request.requester, &request.content_id)
                    .with_reason(err.to_string()),
            );
        }
        let metadata = lookup_from_result(result);

        let reason = decide(&metadata, &self.thresholds, tracker.is_ok(now));
        let verdict = Verdict::new(
            reason,
            request.requester.clone(),
            request.content_id.clone(),
            metadata,
            tracker.accumulated_minutes(),
        );
        self.audit.record(&GateAuditEvent::for_verdict(&verdict, tracker, now));
        verdict
    }
}

/// Orders the quality and quota checks into a verdict reason.
fn decide(
    metadata: &MetadataLookup,
    thresholds: &QualityThresholds,
    within_budget: bool,
) -> VerdictReason {
    if let Some(record) = metadata.record()
        && !thresholds.accepts(record)
    {
        return VerdictReason::QualityCheckFailed;
    }
    if !within_budget {
        return VerdictReason::TimeLimitExceeded;
    }
    VerdictReason::Accepted
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::MetadataRecord;

    fn record(views: u64) -> MetadataLookup {
        MetadataLookup::Resolved(MetadataRecord {
            title: "clip".to_string(),
            view_count: views,
            like_count: 80,
            dislike_count: 5,
        })
    }

    #[test]
    fn quality_failure_wins_over_quota() {
        let reason = decide(&record(10), &QualityThresholds::default(), false);
        assert_eq!(reason, VerdictReason::QualityCheckFailed);
    }

    #[test]
    fn unresolved_metadata_skips_quality() {
        let thresholds = QualityThresholds::default();
        assert_eq!(decide(&MetadataLookup::Unresolved, &thresholds, true), VerdictReason::Accepted);
        assert_eq!(
            decide(&MetadataLookup::Unresolved, &thresholds, false),
            VerdictReason::TimeLimitExceeded
        );
    }

    #[test]
    fn passing_quality_defers_to_quota() {
        let thresholds = QualityThresholds::default();
        assert_eq!(decide(&record(2_000), &thresholds, true), VerdictReason::Accepted);
        assert_eq!(decide(&record(2_000), &thresholds, false), VerdictReason::TimeLimitExceeded);
    }
}

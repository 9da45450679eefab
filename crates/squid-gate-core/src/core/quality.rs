// crates/squid-gate-core/src/core/quality.rs
// ============================================================================
// Module: Quality Gate
// Description: Engagement-based quality predicate for content.
// Purpose: Reject low-reach or poorly rated content before playback.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The quality gate is a pure predicate over integer engagement counters.
//! Content fails when its view count is below a watermark, or when its
//! like percentage `likes * 100 / (likes + dislikes + 1)` is below the
//! configured threshold. The `+1` keeps the division defined and pushes
//! vote-less content to a ratio of zero.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::metadata::MetadataRecord;

// ============================================================================
// SECTION: Thresholds
// ============================================================================

/// Default minimum view count.
pub const DEFAULT_MIN_VIEWS: u64 = 1_000;
/// Default minimum like percentage.
pub const DEFAULT_MIN_GOOD_RATIO: u64 = 70;

/// Thresholds applied by the quality gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityThresholds {
    /// Minimum number of views.
    pub min_views: u64,
    /// Minimum like percentage (0-100).
    pub min_good_ratio: u64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_views: DEFAULT_MIN_VIEWS,
            min_good_ratio: DEFAULT_MIN_GOOD_RATIO,
        }
    }
}

impl QualityThresholds {
    /// Returns true when the record passes the quality gate.
    #[must_use]
    pub fn accepts(&self, record: &MetadataRecord) -> bool {
        is_acceptable(
            record.view_count,
            record.like_count,
            record.dislike_count,
            self.min_views,
            self.min_good_ratio,
        )
    }
}

// ============================================================================
// SECTION: Predicate
// ============================================================================

/// Returns the truncated like percentage with a `+1` denominator offset.
///
/// Arithmetic is widened to `u128`, so no input can overflow.
#[must_use]
pub fn good_ratio_percent(likes: u64, dislikes: u64) -> u128 {
    let likes = u128::from(likes);
    let dislikes = u128::from(dislikes);
    likes * 100 / (likes + dislikes + 1)
}

/// Decides whether engagement metrics meet the quality thresholds.
#[must_use]
pub fn is_acceptable(
    views: u64,
    likes: u64,
    dislikes: u64,
    min_views: u64,
    min_good_ratio: u64,
) -> bool {
    if views < min_views {
        return false;
    }
    good_ratio_percent(likes, dislikes) >= u128::from(min_good_ratio)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

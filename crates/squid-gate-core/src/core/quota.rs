// crates/squid-gate-core/src/core/quota.rs
// ============================================================================
// Module: Quota Tracker
// Description: Daily time-budget state machine charged in fixed quanta.
// Purpose: Track viewing time per calendar day across process restarts.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! [`QuotaTracker`] is a small state machine over one daily accounting window.
//! Budget is consumed in discrete [`QUOTA_QUANTUM_MINUTES`] slices that are
//! credited by activity, not by a ticking clock:
//! - the first update on a new calendar day resets the window and credits one
//!   quantum, whatever the previous day consumed;
//! - a later update on the same day credits one more quantum only when more
//!   than one quantum has elapsed since the last credited event and the
//!   window is still under its limit;
//! - every other update leaves the tracker untouched.
//!
//! The quantum is credited flat: a two-hour gap still counts as one slice.
//! Invariants:
//! - Within a window `accumulated_minutes` never decreases.
//! - `last_event` and `start_day` are only set together with a credit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::Date;
use time::Duration;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minutes credited per qualifying activity event.
pub const QUOTA_QUANTUM_MINUTES: u64 = 10;
/// Quantum as a duration, used for the burst window comparison.
const QUOTA_QUANTUM: Duration = Duration::minutes(10);

// ============================================================================
// SECTION: Transitions
// ============================================================================

/// Branch taken by [`QuotaTracker::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaTransition {
    /// A new calendar day started a fresh window with one quantum.
    Reset,
    /// Another quantum was credited to the current window.
    Credited,
    /// The event fell inside the current slice; nothing was charged.
    Absorbed,
    /// The window is already at or over its limit; nothing was charged.
    Exhausted,
}

// ============================================================================
// SECTION: Tracker
// ============================================================================

/// Accounting window for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct QuotaWindow {
    /// Calendar day the window began.
    start_day: Date,
    /// Time of the last credited event.
    #[serde(with = "time::serde::rfc3339")]
    last_event: OffsetDateTime,
}

/// Persistent daily time-budget tracker.
///
/// # Invariants
/// - A tracker without a window has never been charged and is within budget.
/// - `accumulated_minutes` belongs to the window's calendar day only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaTracker {
    /// Current accounting window, absent until the first charge.
    window: Option<QuotaWindow>,
    /// Minutes credited to the current window.
    accumulated_minutes: u64,
    /// Maximum minutes allowed per day.
    limit_minutes: u64,
}

impl QuotaTracker {
    /// Creates a fresh tracker with the given daily limit in minutes.
    #[must_use]
    pub const fn new(limit_minutes: u64) -> Self {
        Self {
            window: None,
            accumulated_minutes: 0,
            limit_minutes,
        }
    }

    /// Returns the tracker with its daily limit replaced.
    ///
    /// Accumulated time is kept, so lowering the limit can put the current
    /// window over budget immediately.
    #[must_use]
    pub const fn with_limit(mut self, limit_minutes: u64) -> Self {
        self.limit_minutes = limit_minutes;
        self
    }

    /// Records one gated request observed at `now`.
    pub fn update(&mut self, now: OffsetDateTime) -> QuotaTransition {
        let today = now.date();
        match &mut self.window {
            Some(window) if window.start_day == today => {
                if self.accumulated_minutes >= self.limit_minutes {
                    return QuotaTransition::Exhausted;
                }
                if now - window.last_event > QUOTA_QUANTUM {
                    window.last_event = now;
                    self.accumulated_minutes =
                        self.accumulated_minutes.saturating_add(QUOTA_QUANTUM_MINUTES);
                    QuotaTransition::Credited
                } else {
                    QuotaTransition::Absorbed
                }
            }
            _ => {
                self.window = Some(QuotaWindow {
                    start_day: today,
                    last_event: now,
                });
                self.accumulated_minutes = QUOTA_QUANTUM_MINUTES;
                QuotaTransition::Reset
            }
        }
    }

    /// Returns true when playback is within budget at `now`.
    ///
    /// A day other than the window's day counts as within budget, because
    /// the next update will roll the window over.
    #[must_use]
    pub fn is_ok(&self, now: OffsetDateTime) -> bool {
        match &self.window {
            Some(window) if window.start_day == now.date() => {
                self.accumulated_minutes < self.limit_minutes
            }
            _ => true,
        }
    }

    /// Returns the time credited to the current window.
    #[must_use]
    pub fn total_accumulated(&self) -> Duration {
        let seconds = self.accumulated_minutes.saturating_mul(60);
        Duration::seconds(i64::try_from(seconds).unwrap_or(i64::MAX))
    }

    /// Returns the minutes credited to the current window.
    #[must_use]
    pub const fn accumulated_minutes(&self) -> u64 {
        self.accumulated_minutes
    }

    /// Returns the configured daily limit in minutes.
    #[must_use]
    pub const fn limit_minutes(&self) -> u64 {
        self.limit_minutes
    }

    /// Returns the calendar day the current window began.
    #[must_use]
    pub fn window_start_day(&self) -> Option<Date> {
        self.window.map(|window| window.start_day)
    }

    /// Returns the time of the last credited event.
    #[must_use]
    pub fn last_event(&self) -> Option<OffsetDateTime> {
        self.window.map(|window| window.last_event)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

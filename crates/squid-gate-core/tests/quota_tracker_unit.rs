// crates/squid-gate-core/tests/quota_tracker_unit.rs
// ============================================================================
// Module: Quota Tracker Unit Tests
// Description: Branch-by-branch checks of the daily quota state machine.
// Purpose: Pin quantum crediting, burst absorption, exhaustion, and rollover.
// Dependencies: squid-gate-core, time
// ============================================================================

//! ## Overview
//! Exercises every branch of [`QuotaTracker::update`] and [`QuotaTracker::is_ok`]:
//! - fresh day rollover credits exactly one quantum;
//! - spaced activity credits one quantum per event;
//! - bursts inside a slice are absorbed;
//! - an exhausted window is frozen until the next day;
//! - local midnight still resets the window across daylight-saving changes.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use squid_gate_core::LocalZone;
use squid_gate_core::QuotaTracker;
use squid_gate_core::QuotaTransition;
use squid_gate_core::SystemClock;
use time::Duration;
use time::OffsetDateTime;
use time::UtcOffset;
use time::macros::date;
use time::macros::datetime;
use time::macros::offset;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const fn day_start() -> OffsetDateTime {
    datetime!(2024-05-01 09:00 UTC)
}

/// US Eastern rules for 2024: daylight time from March 10 to November 3.
struct Eastern2024;

impl LocalZone for Eastern2024 {
    fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset {
        let daylight = datetime!(2024-03-10 07:00 UTC)..datetime!(2024-11-03 06:00 UTC);
        if daylight.contains(&instant) { offset!(-4) } else { offset!(-5) }
    }
}

/// Charges the tracker `count` times, eleven minutes apart, starting at `start`.
fn charge_spaced(tracker: &mut QuotaTracker, start: OffsetDateTime, count: i64) -> OffsetDateTime {
    let mut now = start;
    for index in 0..count {
        now = start + Duration::minutes(11 * index);
        tracker.update(now);
    }
    now
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn five_spaced_updates_reach_fifty_minutes() {
    let mut tracker = QuotaTracker::new(120);
    let last = charge_spaced(&mut tracker, day_start(), 5);
    assert_eq!(tracker.accumulated_minutes(), 50);

    let transition = tracker.update(last + Duration::minutes(9));
    assert_eq!(transition, QuotaTransition::Absorbed);
    assert_eq!(tracker.accumulated_minutes(), 50);
    assert_eq!(tracker.last_event(), Some(last));
}

#[test]
fn exhausted_window_never_changes_same_day() {
    let mut tracker = QuotaTracker::new(120);
    let last = charge_spaced(&mut tracker, day_start(), 12);
    assert_eq!(tracker.accumulated_minutes(), 120);
    assert!(!tracker.is_ok(last));

    for hours in 1..=10 {
        let now = last + Duration::hours(hours);
        if now.date() != last.date() {
            break;
        }
        assert_eq!(tracker.update(now), QuotaTransition::Exhausted);
        assert_eq!(tracker.accumulated_minutes(), 120);
        assert!(!tracker.is_ok(now));
    }
}

#[test]
fn new_day_resets_to_one_quantum() {
    let mut tracker = QuotaTracker::new(120);
    charge_spaced(&mut tracker, day_start(), 12);
    assert_eq!(tracker.accumulated_minutes(), 120);

    let next_day = datetime!(2024-05-02 00:01 UTC);
    assert!(tracker.is_ok(next_day));
    assert_eq!(tracker.update(next_day), QuotaTransition::Reset);
    assert_eq!(tracker.accumulated_minutes(), 10);
    assert_eq!(tracker.window_start_day(), Some(next_day.date()));
    assert!(tracker.is_ok(next_day));
}

#[test]
fn rollover_grants_quantum_even_with_zero_limit() {
    let mut tracker = QuotaTracker::new(0);
    let now = day_start();
    assert!(tracker.is_ok(now));
    assert_eq!(tracker.update(now), QuotaTransition::Reset);
    assert_eq!(tracker.accumulated_minutes(), 10);
    assert!(!tracker.is_ok(now));
}

#[test]
fn same_day_of_month_in_another_month_rolls_over() {
    let mut tracker = QuotaTracker::new(20);
    charge_spaced(&mut tracker, day_start(), 2);
    assert!(!tracker.is_ok(day_start() + Duration::minutes(30)));

    let next_month = datetime!(2024-06-01 09:00 UTC);
    assert!(tracker.is_ok(next_month));
    assert_eq!(tracker.update(next_month), QuotaTransition::Reset);
}

#[test]
fn limit_not_multiple_of_quantum_overshoots_once() {
    let mut tracker = QuotaTracker::new(15);
    let last = charge_spaced(&mut tracker, day_start(), 3);
    assert_eq!(tracker.accumulated_minutes(), 20);
    assert!(!tracker.is_ok(last));
}

#[test]
fn spring_forward_rolls_over_at_local_midnight() {
    let clock = SystemClock::new(Eastern2024);
    let mut tracker = QuotaTracker::new(20);
    let evening = clock.reading_at(datetime!(2024-03-11 02:00 UTC));
    assert_eq!(evening.date(), date!(2024-03-10));
    charge_spaced(&mut tracker, evening, 2);
    assert!(!tracker.is_ok(evening + Duration::minutes(30)));

    let after_midnight = clock.reading_at(datetime!(2024-03-11 04:30 UTC));
    assert_eq!(after_midnight.date(), date!(2024-03-11));
    assert_eq!(after_midnight.offset(), offset!(-4));
    assert!(tracker.is_ok(after_midnight));
    assert_eq!(tracker.update(after_midnight), QuotaTransition::Reset);
    assert_eq!(tracker.accumulated_minutes(), 10);
}

#[test]
fn fall_back_keeps_the_day_until_local_midnight() {
    let clock = SystemClock::new(Eastern2024);
    let mut tracker = QuotaTracker::new(10);
    let morning = clock.reading_at(datetime!(2024-11-03 14:00 UTC));
    assert_eq!(tracker.update(morning), QuotaTransition::Reset);

    let late_evening = clock.reading_at(datetime!(2024-11-04 04:30 UTC));
    assert_eq!(late_evening.date(), date!(2024-11-03));
    assert!(!tracker.is_ok(late_evening));
    assert_eq!(tracker.update(late_evening), QuotaTransition::Exhausted);
}

// crates/squid-gate-core/src/core/time.rs
// ============================================================================
// Module: Squid Gate Time Source
// Description: Clock abstraction used by the decision engine.
// Purpose: Keep wall-clock reads at the edge so quota logic stays replayable.
// Dependencies: chrono, thiserror, time
// ============================================================================

//! ## Overview
//! The quota tracker never reads wall-clock time itself; the decision engine
//! asks a [`Clock`] once per request and passes the value down.
//! [`SystemClock`] places every reading on the local calendar using the
//! [`LocalZone`] rules in effect at that instant, so a helper that runs across
//! a daylight-saving change still rolls its quota window at local midnight.
//! [`HostZone`] reads the host rules through `chrono` on each call; when the
//! host has no zone configuration those rules degrade to UTC, which
//! [`HostZone::verify`] reports so the host can audit it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use chrono::DateTime;
use chrono::Local;
use thiserror::Error;
use time::Duration;
use time::OffsetDateTime;
use time::UtcOffset;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Zone link consulted by the host rules when `TZ` is unset.
const HOST_ZONE_FILE: &str = "/etc/localtime";

// ============================================================================
// SECTION: Clock Trait
// ============================================================================

/// Source of the current time.
pub trait Clock {
    /// Returns the current time in the clock's local offset.
    fn now(&self) -> OffsetDateTime;
}

// ============================================================================
// SECTION: Zones
// ============================================================================

/// Time zone rules mapping an instant to the UTC offset in effect there.
pub trait LocalZone {
    /// Returns the offset in effect at `instant`.
    fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset;
}

/// A fixed offset is a zone without transitions.
impl LocalZone for UtcOffset {
    fn offset_at(&self, _instant: OffsetDateTime) -> UtcOffset {
        *self
    }
}

/// Host time zone rules, re-read on every lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostZone;

impl HostZone {
    /// Checks that the host exposes time zone configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::ZoneUnavailable`] when `TZ` is unset and the
    /// zone link cannot be read; lookups then follow UTC.
    pub fn verify(&self) -> Result<(), ClockError> {
        check_host_zone(std::env::var_os("TZ").as_deref(), Path::new(HOST_ZONE_FILE))
    }
}

impl LocalZone for HostZone {
    fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset {
        DateTime::from_timestamp(instant.unix_timestamp(), 0)
            .map(|utc| utc.with_timezone(&Local).offset().local_minus_utc())
            .and_then(|seconds| UtcOffset::from_whole_seconds(seconds).ok())
            .unwrap_or(UtcOffset::UTC)
    }
}

/// Clock and zone errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// The host has no readable time zone configuration.
    #[error("local time zone unavailable: {0}")]
    ZoneUnavailable(String),
}

// ============================================================================
// SECTION: System Clock
// ============================================================================

/// Wall clock reporting time on the local calendar of its zone.
///
/// # Invariants
/// - The offset is resolved per reading; calendar days follow the zone's
///   rules at the instant read, not at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemClock<Z = HostZone> {
    /// Rules applied to every reading.
    zone: Z,
}

impl SystemClock<HostZone> {
    /// Creates a clock following the host time zone.
    #[must_use]
    pub const fn local() -> Self {
        Self::new(HostZone)
    }
}

impl<Z> SystemClock<Z> {
    /// Creates a clock following `zone`.
    #[must_use]
    pub const fn new(zone: Z) -> Self {
        Self {
            zone,
        }
    }

    /// Returns the zone rules applied to readings.
    #[must_use]
    pub const fn zone(&self) -> &Z {
        &self.zone
    }
}

impl<Z: LocalZone> SystemClock<Z> {
    /// Expresses `instant` in the offset the zone uses at that instant.
    #[must_use]
    pub fn reading_at(&self, instant: OffsetDateTime) -> OffsetDateTime {
        instant.to_offset(self.zone.offset_at(instant))
    }
}

impl<Z: LocalZone> Clock for SystemClock<Z> {
    fn now(&self) -> OffsetDateTime {
        self.reading_at(OffsetDateTime::now_utc())
    }
}

// ============================================================================
// SECTION: Manual Clock
// ============================================================================

/// Manually advanced clock for deterministic hosts and tests.
///
/// Clones share the same reading, so a caller can keep a handle and advance
/// a clock that was moved into an engine.
#[derive(Debug, Clone)]
pub struct ManualClock {
    /// Shared current reading.
    current: Arc<Mutex<OffsetDateTime>>,
}

impl ManualClock {
    /// Creates a clock stopped at `start`.
    #[must_use]
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock to `value`.
    pub fn set(&self, value: OffsetDateTime) {
        if let Ok(mut current) = self.current.lock() {
            *current = value;
        }
    }

    /// Advances the clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        if let Ok(mut current) = self.current.lock() {
            *current += delta;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        self.current.lock().map_or(OffsetDateTime::UNIX_EPOCH, |current| *current)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Fails when neither a non-empty `TZ` nor the zone link is available.
fn check_host_zone(tz: Option<&OsStr>, zone_file: &Path) -> Result<(), ClockError> {
    if tz.is_some_and(|value| !value.is_empty()) || !cfg!(unix) {
        return Ok(());
    }
    if std::fs::metadata(zone_file).is_err() {
        return Err(ClockError::ZoneUnavailable(format!(
            "TZ is unset and {} is unreadable",
            zone_file.display()
        )));
    }
    Ok(())
}

/// Returns the instant as unix epoch milliseconds, saturating on overflow.
#[must_use]
pub fn unix_millis(value: OffsetDateTime) -> i64 {
    let millis = value.unix_timestamp_nanos() / 1_000_000;
    i64::try_from(millis).unwrap_or(if millis < 0 { i64::MIN } else { i64::MAX })
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use time::macros::datetime;
    use time::macros::offset;

    use super::*;

    #[test]
    fn manual_clock_clones_share_reading() {
        let clock = ManualClock::new(datetime!(2024-05-01 08:00 UTC));
        let handle = clock.clone();
        handle.advance(Duration::minutes(15));
        assert_eq!(clock.now(), datetime!(2024-05-01 08:15 UTC));
        handle.set(datetime!(2024-05-02 00:00 UTC));
        assert_eq!(clock.now(), datetime!(2024-05-02 00:00 UTC));
    }

    #[test]
    fn fixed_zone_clock_reports_its_offset() {
        let clock = SystemClock::new(offset!(+9));
        assert_eq!(clock.now().offset(), offset!(+9));
        assert_eq!(clock.zone(), &offset!(+9));
    }

    #[test]
    fn reading_keeps_the_instant() {
        let instant = datetime!(2024-07-01 12:00 UTC);
        let reading = SystemClock::local().reading_at(instant);
        assert_eq!(reading, instant);
        assert_eq!(reading.offset(), HostZone.offset_at(instant));
    }

    #[test]
    fn zone_from_tz_variable_is_available() {
        let missing = Path::new("/nonexistent/squid-gate/localtime");
        assert!(check_host_zone(Some(OsStr::new("America/New_York")), missing).is_ok());
    }

    #[test]
    fn zone_link_is_enough_without_tz() {
        let present = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
        assert!(check_host_zone(None, &present).is_ok());
        assert!(check_host_zone(Some(OsStr::new("")), &present).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn missing_zone_configuration_is_reported() {
        let missing = Path::new("/nonexistent/squid-gate/localtime");
        let err = check_host_zone(None, missing).unwrap_err();
        assert!(matches!(err, ClockError::ZoneUnavailable(_)));
        assert!(err.to_string().contains("TZ is unset"));
    }

    #[test]
    fn unix_millis_truncates_sub_millisecond() {
        assert_eq!(unix_millis(datetime!(1970-01-01 00:00:01.0015 UTC)), 1_001);
    }
}

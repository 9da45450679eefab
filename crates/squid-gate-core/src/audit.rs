// crates/squid-gate-core/src/audit.rs
// ============================================================================
// Module: Gate Audit Logging
// Description: Structured audit events for gating decisions and quota changes.
// Purpose: Emit one human-readable JSON line per gate event without hard deps.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every accept, reject, quota reset, and quota credit produces a
//! [`GateAuditEvent`]. Sinks serialize events as JSON lines; the stderr sink
//! suits proxies that collect helper stderr into their own log, and the
//! syslog sink hands events to the host's system logger. Audit output
//! is best effort and never blocks a reply: serialization or write failures
//! are dropped.
//! Invariants:
//! - Events never carry the metadata API key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::net::UnixDatagram;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;
use time::OffsetDateTime;

use crate::core::identifiers::ContentId;
use crate::core::metadata::MetadataLookup;
use crate::core::quota::QuotaTracker;
use crate::core::quota::QuotaTransition;
use crate::core::time::unix_millis;
use crate::core::verdict::Verdict;
use crate::core::verdict::VerdictKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Syslog priority for user-level informational messages.
#[cfg(unix)]
const SYSLOG_PRIORITY: u8 = 14;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Audit event classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateAuditKind {
    /// Helper process started.
    Startup,
    /// Quota window rolled over to a new day.
    QuotaReset,
    /// Quota window credited one quantum.
    QuotaCredit,
    /// Request fell inside the current quota slice.
    QuotaAbsorbed,
    /// Quota window already at its limit.
    QuotaExhausted,
    /// Metadata lookup did not resolve.
    MetadataUnresolved,
    /// Request accepted.
    Accept,
    /// Request rewritten to the safe destination.
    Reject,
    /// Persisted quota state was replaced by a fresh tracker.
    StoreRecovered,
    /// Persisting the quota tracker failed.
    StoreSaveFailed,
}

impl GateAuditKind {
    /// Returns the audit kind for a quota transition.
    #[must_use]
    pub const fn from_transition(transition: QuotaTransition) -> Self {
        match transition {
            QuotaTransition::Reset => Self::QuotaReset,
            QuotaTransition::Credited => Self::QuotaCredit,
            QuotaTransition::Absorbed => Self::QuotaAbsorbed,
            QuotaTransition::Exhausted => Self::QuotaExhausted,
        }
    }
}

/// Gate audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateAuditEvent {
    /// Event identifier.
    pub event: GateAuditKind,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Requester token from the request line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,
    /// Requested content identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<ContentId>,
    /// Content title when metadata resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// View count when metadata resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    /// Like count when metadata resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
    /// Dislike count when metadata resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dislike_count: Option<u64>,
    /// Minutes credited to the quota window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accumulated_minutes: Option<u64>,
    /// Daily quota limit in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_minutes: Option<u64>,
    /// Human-readable reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl GateAuditEvent {
    /// Creates an event of `kind` stamped at `at`.
    #[must_use]
    pub fn new(kind: GateAuditKind, at: OffsetDateTime) -> Self {
        Self {
            event: kind,
            timestamp_ms: unix_millis(at),
            requester: None,
            content_id: None,
            title: None,
            view_count: None,
            like_count: None,
            dislike_count: None,
            accumulated_minutes: None,
            limit_minutes: None,
            reason: None,
        }
    }

    /// Builds the accept/reject event describing `verdict`.
    #[must_use]
    pub fn for_verdict(verdict: &Verdict, tracker: &QuotaTracker, at: OffsetDateTime) -> Self {
        let kind = match verdict.kind {
            VerdictKind::Accept => GateAuditKind::Accept,
            VerdictKind::RewriteReject => GateAuditKind::Reject,
        };
        Self::new(kind, at)
            .with_request(&verdict.requester, &verdict.content_id)
            .with_metadata(&verdict.metadata)
            .with_quota(tracker)
            .with_reason(verdict.reason.as_str())
    }

    /// Attaches the requester and content identifier.
    #[must_use]
    pub fn with_request(mut self, requester: &str, content_id: &ContentId) -> Self {
        self.requester = Some(requester.to_string());
        self.content_id = Some(content_id.clone());
        self
    }

    /// Attaches title and counters when the lookup resolved.
    #[must_use]
    pub fn with_metadata(mut self, lookup: &MetadataLookup) -> Self {
        if let Some(record) = lookup.record() {
            self.title = Some(record.title.clone());
            self.view_count = Some(record.view_count);
            self.like_count = Some(record.like_count);
            self.dislike_count = Some(record.dislike_count);
        }
        self
    }

    /// Attaches the quota totals.
    #[must_use]
    pub fn with_quota(mut self, tracker: &QuotaTracker) -> Self {
        self.accumulated_minutes = Some(tracker.accumulated_minutes());
        self.limit_minutes = Some(tracker.limit_minutes());
        self
    }

    /// Attaches a human-readable reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for gate events.
pub trait GateAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &GateAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl GateAuditSink for StderrAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl GateAuditSink for FileAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Audit sink that sends JSON events to a local syslog datagram socket.
#[cfg(unix)]
pub struct SyslogAuditSink {
    /// Socket connected to the syslog daemon.
    socket: UnixDatagram,
    /// Priority and tag prepended to every message.
    prefix: String,
}

#[cfg(unix)]
impl SyslogAuditSink {
    /// Connects to the syslog socket at `path`, tagging messages with `ident`.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be created or connected.
    pub fn connect(path: &Path, ident: &str) -> io::Result<Self> {
        let socket = UnixDatagram::unbound()?;
        socket.connect(path)?;
        Ok(Self {
            socket,
            prefix: format!("<{SYSLOG_PRIORITY}>{ident}[{}]: ", std::process::id()),
        })
    }
}

#[cfg(unix)]
impl GateAuditSink for SyslogAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = self.socket.send(format!("{}{payload}", self.prefix).as_bytes());
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl GateAuditSink for NoopAuditSink {
    fn record(&self, _event: &GateAuditEvent) {}
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

    use super::*;
    use crate::core::metadata::MetadataRecord;
    use crate::core::verdict::VerdictReason;

    #[test]
    fn reject_event_serializes_quality_details() {
        let at = datetime!(2024-05-01 08:00 UTC);
        let mut tracker = QuotaTracker::new(120);
        tracker.update(at);
        let verdict = Verdict::new(
            VerdictReason::QualityCheckFailed,
            "client1".to_string(),
            ContentId::new("ABC123"),
            MetadataLookup::Resolved(MetadataRecord {
                title: "clip".to_string(),
                view_count: 500,
                like_count: 1,
                dislike_count: 2,
            }),
            tracker.accumulated_minutes(),
        );
        let event = GateAuditEvent::for_verdict(&verdict, &tracker, at);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "reject");
        assert_eq!(value["reason"], "quality check failed");
        assert_eq!(value["content_id"], "ABC123");
        assert_eq!(value["view_count"], 500);
        assert_eq!(value["accumulated_minutes"], 10);
        assert_eq!(value["timestamp_ms"], 1_714_550_400_000_i64);
    }

    #[test]
    fn unresolved_metadata_omits_counters() {
        let event = GateAuditEvent::new(GateAuditKind::Accept, datetime!(2024-05-01 08:00 UTC))
            .with_metadata(&MetadataLookup::Unresolved);
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("title").is_none());
        assert!(value.get("view_count").is_none());
    }

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = std::env::temp_dir().join(format!(
            "squid-gate-audit-{}",
            OffsetDateTime::now_utc().unix_timestamp_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("audit.jsonl");
        let sink = FileAuditSink::new(&path).unwrap();
        let at = datetime!(2024-05-01 08:00 UTC);
        sink.record(&GateAuditEvent::new(GateAuditKind::Startup, at));
        sink.record(&GateAuditEvent::new(GateAuditKind::QuotaReset, at));
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("\"quota_reset\""));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn syslog_sink_sends_tagged_datagrams() {
        let path = std::env::temp_dir().join(format!(
            "squid-gate-syslog-{}.sock",
            OffsetDateTime::now_utc().unix_timestamp_nanos()
        ));
        let receiver = UnixDatagram::bind(&path).unwrap();
        let sink = SyslogAuditSink::connect(&path, "squid-gate").unwrap();
        sink.record(&GateAuditEvent::new(GateAuditKind::Startup, datetime!(2024-05-01 08:00 UTC)));

        let mut buffer = [0_u8; 1024];
        let length = receiver.recv(&mut buffer).unwrap();
        let message = String::from_utf8_lossy(&buffer[..length]).into_owned();
        assert!(message.starts_with("<14>squid-gate["));
        assert!(message.ends_with(r#"{"event":"startup","timestamp_ms":1714550400000}"#));
        let _ = std::fs::remove_file(&path);
    }

    #[cfg(unix)]
    #[test]
    fn syslog_sink_requires_a_listening_socket() {
        let path = std::env::temp_dir().join("squid-gate-missing-syslog.sock");
        assert!(SyslogAuditSink::connect(&path, "squid-gate").is_err());
    }
}

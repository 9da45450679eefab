// crates/squid-gate-cli/src/redirector.rs
// ============================================================================
// Module: Squid Redirector Protocol Loop
// Description: Line-oriented URL-rewrite helper protocol over stdin/stdout.
// Purpose: Route matching requests through the decision engine and reply to the proxy.
// Dependencies: squid-gate-core, thiserror, url
// ============================================================================

//! ## Overview
//! The proxy writes one request per line: the URL first, then the client
//! token and other fields. The helper answers each line with exactly one
//! reply, `OK` to pass the request through or `OK rewrite-url="..."` to send
//! the client to the safe destination, and flushes before reading again.
//!
//! Lines that are too short, carry an unparsable URL, name a host without the
//! provider marker, or lack the content parameter pass through untouched:
//! no metadata call and no quota charge.
//!
//! The tracker is loaded once at startup. A missing record starts a fresh
//! tracker; an unreadable record is audited and replaced. The configured limit
//! always overrides the persisted one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io;
use std::io::BufRead;
use std::io::Write;

use squid_gate_core::Clock;
use squid_gate_core::ContentId;
use squid_gate_core::DecisionEngine;
use squid_gate_core::GateAuditEvent;
use squid_gate_core::GateAuditKind;
use squid_gate_core::GateRequest;
use squid_gate_core::MetadataSource;
use squid_gate_core::QuotaStateStore;
use squid_gate_core::QuotaTracker;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Request matching and reply settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectorConfig {
    /// Lowercase substring of the host that marks a gated request.
    pub provider_marker: String,
    /// Query parameter carrying the content identifier.
    pub content_param: String,
    /// Destination substituted for rejected requests.
    pub safe_url: String,
}

impl Default for RedirectorConfig {
    fn default() -> Self {
        Self {
            provider_marker: "youtube".to_string(),
            content_param: "v".to_string(),
            safe_url: "https://www.google.com".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Replies
// ============================================================================

/// Reply line sent back to the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Pass the request through unchanged.
    Accept,
    /// Rewrite the request to the given URL.
    Rewrite(String),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => f.write_str("OK"),
            Self::Rewrite(url) => write!(f, "OK rewrite-url=\"{url}\""),
        }
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Extracts a gated request from one protocol line.
///
/// Returns `None` when the line should pass through without evaluation.
#[must_use]
pub fn parse_request_line(line: &str, config: &RedirectorConfig) -> Option<GateRequest> {
    let mut tokens = line.split_whitespace();
    let raw_url = tokens.next()?;
    let requester = tokens.next()?;
    let url = Url::parse(raw_url).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    if !host.contains(config.provider_marker.as_str()) {
        return None;
    }
    let content_id = url
        .query_pairs()
        .find(|(key, value)| key == config.content_param.as_str() && !value.is_empty())
        .map(|(_, value)| value.into_owned())?;
    Some(GateRequest::new(ContentId::new(content_id), requester))
}

// ============================================================================
// SECTION: Redirector
// ============================================================================

/// Protocol loop owning the quota tracker and its store.
pub struct Redirector<M, C, S> {
    /// Gating pipeline.
    engine: DecisionEngine<M, C>,
    /// Durable tracker store.
    store: S,
    /// In-memory tracker; authoritative for this process.
    tracker: QuotaTracker,
    /// Matching and reply settings.
    config: RedirectorConfig,
}

impl<M: MetadataSource, C: Clock, S: QuotaStateStore> Redirector<M, C, S> {
    /// Creates a redirector, loading the tracker from `store`.
    ///
    /// The loaded tracker adopts `limit_minutes`. A missing or unreadable
    /// record is replaced by a fresh tracker and written back.
    pub fn new(
        engine: DecisionEngine<M, C>,
        store: S,
        config: RedirectorConfig,
        limit_minutes: u64,
    ) -> Self {
        let tracker = load_or_initialize(&engine, &store, limit_minutes);
        Self {
            engine,
            store,
            tracker,
            config,
        }
    }

    /// Returns the current tracker.
    #[must_use]
    pub const fn tracker(&self) -> &QuotaTracker {
        &self.tracker
    }

    /// Returns the matching and reply settings.
    #[must_use]
    pub const fn config(&self) -> &RedirectorConfig {
        &self.config
    }

    /// Processes one protocol line and returns its reply.
    pub fn handle_line(&mut self, line: &str) -> Reply {
        let Some(request) = parse_request_line(line, &self.config) else {
            return Reply::Accept;
        };
        let verdict = self.engine.evaluate(&mut self.tracker, &self.store, &request);
        if verdict.is_accept() {
            Reply::Accept
        } else {
            Reply::Rewrite(self.config.safe_url.clone())
        }
    }

    /// Serves lines from `reader` until end of input, replying on `writer`.
    ///
    /// Returns the number of lines answered.
    ///
    /// # Errors
    ///
    /// Returns [`RedirectorError`] when input cannot be read or a reply cannot
    /// be written.
    pub fn serve<R: BufRead, W: Write>(
        &mut self,
        mut reader: R,
        mut writer: W,
    ) -> Result<u64, RedirectorError> {
        let mut buf = Vec::new();
        let mut answered = 0_u64;
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => return Ok(answered),
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(RedirectorError::Read(err.to_string())),
            }
            let line = String::from_utf8_lossy(&buf);
            let reply = self.handle_line(&line);
            write_reply(&mut writer, &reply)?;
            answered = answered.saturating_add(1);
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Protocol loop errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedirectorError {
    /// Reading from the proxy failed.
    #[error("stdin read failed: {0}")]
    Read(String),
    /// Writing a reply to the proxy failed.
    #[error("stdout write failed: {0}")]
    Write(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads the persisted tracker or starts a fresh one.
fn load_or_initialize<M: MetadataSource, C: Clock, S: QuotaStateStore>(
    engine: &DecisionEngine<M, C>,
    store: &S,
    limit_minutes: u64,
) -> QuotaTracker {
    let audit = engine.audit();
    let now = engine.clock().now();
    match store.load() {
        Ok(Some(tracker)) => return tracker.with_limit(limit_minutes),
        Ok(None) => {}
        Err(err) => audit.record(
            &GateAuditEvent::new(GateAuditKind::StoreRecovered, now)
                .with_reason(format!("discarding unreadable quota state: {err}")),
        ),
    }
    let tracker = QuotaTracker::new(limit_minutes);
    if let Err(err) = store.save(&tracker) {
        audit.record(
            &GateAuditEvent::new(GateAuditKind::StoreSaveFailed, now)
                .with_quota(&tracker)
                .with_reason(err.to_string()),
        );
    }
    tracker
}

/// Writes and flushes one reply line.
fn write_reply(writer: &mut impl Write, reply: &Reply) -> Result<(), RedirectorError> {
    let payload = format!("{reply}\n");
    writer
        .write_all(payload.as_bytes())
        .map_err(|err| RedirectorError::Write(err.to_string()))?;
    writer.flush().map_err(|err| RedirectorError::Write(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

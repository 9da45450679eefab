// crates/squid-gate-cli/src/main.rs
// ============================================================================
// Module: Squid Gate CLI Entry Point
// Description: URL-rewrite helper process for a caching proxy.
// Purpose: Wire configuration, stores, and metadata sources into the protocol loop.
// Dependencies: clap, squid-gate-cli, squid-gate-core, squid-gate-providers,
//               squid-gate-store-sqlite, thiserror
// ============================================================================

//! ## Overview
//! `squid-gate` is started by the proxy and lives as long as the proxy keeps
//! its stdin open. Startup failures (invalid settings, an unusable audit log
//! or syslog socket, a metadata client that cannot be built) exit with a
//! failure code before any request is read. An unusable quota database does not stop the helper:
//! it falls back to in-memory accounting and audits the fallback.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use squid_gate_cli::GateArgs;
use squid_gate_cli::Redirector;
use squid_gate_core::Clock;
use squid_gate_core::DecisionEngine;
use squid_gate_core::DisabledMetadataSource;
use squid_gate_core::FileAuditSink;
use squid_gate_core::GateAuditEvent;
use squid_gate_core::GateAuditKind;
use squid_gate_core::GateAuditSink;
use squid_gate_core::InMemoryQuotaStore;
use squid_gate_core::MetadataSource;
use squid_gate_core::QuotaStateStore;
use squid_gate_core::StderrAuditSink;
use squid_gate_core::SystemClock;
#[cfg(unix)]
use squid_gate_core::SyslogAuditSink;
use squid_gate_providers::YouTubeMetadataClient;
use squid_gate_store_sqlite::SqliteQuotaStore;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for fatal startup and serving errors.
#[derive(Debug, Error)]
#[error("squid-gate: {message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Builds the helper and serves the proxy until end of input.
fn run() -> CliResult<ExitCode> {
    let args = GateArgs::parse();
    let clock = SystemClock::local();
    args.validate().map_err(|err| CliError::new(err.to_string()))?;

    let audit = build_audit_sink(&args)?;
    let started_at = clock.now();
    let lookups = if args.metadata_enabled() {
        "metadata lookups enabled"
    } else {
        "metadata lookups disabled: no api key configured"
    };
    audit.record(&GateAuditEvent::new(GateAuditKind::Startup, started_at).with_reason(lookups));
    if let Err(err) = clock.zone().verify() {
        audit.record(
            &GateAuditEvent::new(GateAuditKind::Startup, started_at)
                .with_reason(format!("{err}; calendar days follow UTC")),
        );
    }

    let metadata = build_metadata_source(&args)?;
    let store = open_store(&args, audit.as_ref(), &clock);
    let engine = DecisionEngine::new(metadata, clock, args.thresholds(), audit);
    let mut redirector =
        Redirector::new(engine, store, args.redirector_config(), args.limit_minutes);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    redirector
        .serve(stdin.lock(), stdout.lock())
        .map_err(|err| CliError::new(err.to_string()))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Wiring
// ============================================================================

/// Opens the audit sink: syslog, the configured file, or stderr.
fn build_audit_sink(args: &GateArgs) -> CliResult<Arc<dyn GateAuditSink>> {
    if args.syslog {
        return open_syslog(&args.syslog_socket);
    }
    match args.audit_log.as_deref() {
        Some(path) => FileAuditSink::new(path)
            .map(|sink| Arc::new(sink) as Arc<dyn GateAuditSink>)
            .map_err(|err| {
                CliError::new(format!("cannot open audit log {}: {err}", path.display()))
            }),
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

/// Connects the syslog audit sink.
#[cfg(unix)]
fn open_syslog(socket: &Path) -> CliResult<Arc<dyn GateAuditSink>> {
    SyslogAuditSink::connect(socket, "squid-gate")
        .map(|sink| Arc::new(sink) as Arc<dyn GateAuditSink>)
        .map_err(|err| {
            CliError::new(format!("cannot connect to syslog {}: {err}", socket.display()))
        })
}

/// Syslog output needs a unix datagram socket.
#[cfg(not(unix))]
fn open_syslog(socket: &Path) -> CliResult<Arc<dyn GateAuditSink>> {
    Err(CliError::new(format!(
        "syslog socket {} is not supported on this host",
        socket.display()
    )))
}

/// Builds the metadata source; lookups are disabled without an API key.
fn build_metadata_source(args: &GateArgs) -> CliResult<Box<dyn MetadataSource>> {
    let Some(config) = args.metadata_config() else {
        return Ok(Box::new(DisabledMetadataSource));
    };
    let client = YouTubeMetadataClient::new(config).map_err(|err| CliError::new(err.to_string()))?;
    Ok(Box::new(client))
}

/// Opens the durable quota store, falling back to memory when unusable.
fn open_store(
    args: &GateArgs,
    audit: &dyn GateAuditSink,
    clock: &SystemClock,
) -> Box<dyn QuotaStateStore> {
    match SqliteQuotaStore::open(args.store_config()) {
        Ok(store) => Box::new(store),
        Err(err) => {
            audit.record(
                &GateAuditEvent::new(GateAuditKind::StoreRecovered, clock.now()).with_reason(
                    format!("quota database unavailable, using in-memory state: {err}"),
                ),
            );
            Box::new(InMemoryQuotaStore::new())
        }
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

// crates/squid-gate-cli/src/lib.rs
// ============================================================================
// Module: Squid Gate CLI Library
// Description: Configuration and protocol loop behind the `squid-gate` binary.
// Purpose: Expose the helper's moving parts for the binary and its tests.
// Dependencies: clap, squid-gate-core, squid-gate-providers, squid-gate-store-sqlite
// ============================================================================

//! ## Overview
//! The `squid-gate` binary wires [`config::GateArgs`] into a
//! [`redirector::Redirector`] and serves the proxy over stdin/stdout.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod redirector;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::GateArgs;
pub use redirector::Redirector;
pub use redirector::RedirectorConfig;
pub use redirector::RedirectorError;
pub use redirector::Reply;
pub use redirector::parse_request_line;

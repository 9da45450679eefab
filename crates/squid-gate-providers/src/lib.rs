// crates/squid-gate-providers/src/lib.rs
// ============================================================================
// Module: Squid Gate Providers
// Description: Metadata sources for the squid gate decision engine.
// Purpose: Provide the HTTP-backed content metadata client.
// Dependencies: squid-gate-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! This crate ships the metadata sources consulted by the decision engine.
//! Provider responses are untrusted: bodies are size-capped, redirects are
//! refused, and any failure collapses to an unresolved lookup at the
//! [`squid_gate_core::MetadataSource`] boundary.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod youtube;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use youtube::DEFAULT_MAX_RESPONSE_BYTES;
pub use youtube::DEFAULT_METADATA_ENDPOINT;
pub use youtube::DEFAULT_TIMEOUT_MS;
pub use youtube::YouTubeMetadataClient;
pub use youtube::YouTubeMetadataConfig;

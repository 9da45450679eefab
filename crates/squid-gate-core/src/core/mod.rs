// crates/squid-gate-core/src/core/mod.rs
// ============================================================================
// Module: Squid Gate Core Model
// Description: Data model for quota tracking, quality checks, and verdicts.
// Purpose: Group the pure, serializable building blocks of the gating engine.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Core model types. Everything here is deterministic given its inputs; the
//! only time source is the caller-supplied `now`.

pub mod identifiers;
pub mod metadata;
pub mod quality;
pub mod quota;
pub mod time;
pub mod verdict;

// crates/squid-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Squid Gate Runtime
// Description: Request-time orchestration of the gating engine.
// Purpose: Expose the decision engine and its request type.
// Dependencies: crate::core, crate::interfaces, crate::audit
// ============================================================================

//! ## Overview
//! Runtime orchestration for gated requests.

pub mod engine;

pub use engine::DecisionEngine;
pub use engine::GateRequest;

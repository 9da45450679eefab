// crates/squid-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Squid Gate Identifiers
// Description: Strongly typed identifiers used by the gating engine.
// Purpose: Keep content identifiers distinct from free-form strings.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Content identifiers are extracted from untrusted request URLs. They are
//! carried verbatim and never interpreted beyond equality.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Content Identifier
// ============================================================================

/// Identifier of a piece of content at the metadata provider (a video id).
///
/// # Invariants
/// - Values are opaque; no normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    /// Creates a new content identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

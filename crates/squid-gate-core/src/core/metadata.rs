// crates/squid-gate-core/src/core/metadata.rs
// ============================================================================
// Module: Content Metadata
// Description: Title and engagement counters reported by the metadata provider.
// Purpose: Represent resolved and unresolved lookups without magic values.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A metadata lookup either resolves to a [`MetadataRecord`] or is
//! [`MetadataLookup::Unresolved`]. An unresolved lookup is distinct from a
//! genuine record whose counters happen to be zero.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Engagement metadata for one piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Content title.
    pub title: String,
    /// Total view count.
    pub view_count: u64,
    /// Like count.
    pub like_count: u64,
    /// Dislike count.
    pub dislike_count: u64,
}

/// Outcome of a metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "record", rename_all = "snake_case")]
pub enum MetadataLookup {
    /// The provider returned a record for the content.
    Resolved(MetadataRecord),
    /// The lookup failed or the provider had no match.
    Unresolved,
}

impl MetadataLookup {
    /// Returns the resolved record, if any.
    #[must_use]
    pub const fn record(&self) -> Option<&MetadataRecord> {
        match self {
            Self::Resolved(record) => Some(record),
            Self::Unresolved => None,
        }
    }

    /// Returns true when the lookup resolved.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

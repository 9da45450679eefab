// crates/squid-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Squid Gate Interfaces
// Description: Backend-agnostic interfaces for metadata lookups and quota storage.
// Purpose: Define the contract surfaces used by the decision engine.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the gating engine reaches external systems without
//! embedding backend details. Metadata sources report typed failures, and the
//! engine folds every failure into [`MetadataLookup::Unresolved`]. Quota stores
//! report failures as [`StoreError`] and leave the recovery policy to hosts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use thiserror::Error;

use crate::core::identifiers::ContentId;
use crate::core::metadata::MetadataLookup;
use crate::core::metadata::MetadataRecord;
use crate::core::quota::QuotaTracker;

// ============================================================================
// SECTION: Metadata Source
// ============================================================================

/// Metadata lookup errors.
///
/// # Invariants
/// - Messages never embed the API key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// Client construction or configuration failure.
    #[error("metadata config error: {0}")]
    Config(String),
    /// Network or transport failure.
    #[error("metadata transport error: {0}")]
    Transport(String),
    /// Provider returned a non-success status code.
    #[error("metadata provider returned status {0}")]
    Status(u16),
    /// Response body could not be decoded.
    #[error("metadata decode error: {0}")]
    Decode(String),
    /// Response exceeded the configured size limit.
    #[error("metadata response exceeds {max_bytes} bytes")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
    },
    /// Provider has no record for the content.
    #[error("no metadata for content {0}")]
    NotFound(String),
}

/// Source of content metadata.
///
/// Backends implement [`MetadataSource::try_fetch`]; the engine consumes the
/// infallible [`MetadataSource::fetch`] view, where transport errors, decode
/// errors, and empty results all map to [`MetadataLookup::Unresolved`].
pub trait MetadataSource {
    /// Looks up metadata for `content_id`, keeping the failure cause.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the lookup does not produce a record.
    fn try_fetch(&self, content_id: &ContentId) -> Result<MetadataRecord, MetadataError>;

    /// Looks up metadata for `content_id`, folding failures into
    /// [`MetadataLookup::Unresolved`].
    fn fetch(&self, content_id: &ContentId) -> MetadataLookup {
        lookup_from_result(self.try_fetch(content_id))
    }
}

impl<T: MetadataSource + ?Sized> MetadataSource for Box<T> {
    fn try_fetch(&self, content_id: &ContentId) -> Result<MetadataRecord, MetadataError> {
        (**self).try_fetch(content_id)
    }
}

impl<T: MetadataSource + ?Sized> MetadataSource for &T {
    fn try_fetch(&self, content_id: &ContentId) -> Result<MetadataRecord, MetadataError> {
        (**self).try_fetch(content_id)
    }
}

/// Metadata source used when lookups are disabled (no API key).
///
/// # Invariants
/// - Every lookup is unresolved; no network traffic is produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledMetadataSource;

impl MetadataSource for DisabledMetadataSource {
    fn try_fetch(&self, _content_id: &ContentId) -> Result<MetadataRecord, MetadataError> {
        Err(MetadataError::Config("metadata lookups disabled".to_string()))
    }
}

/// Folds a fallible lookup into the infallible metadata contract.
#[must_use]
pub fn lookup_from_result(result: Result<MetadataRecord, MetadataError>) -> MetadataLookup {
    result.map_or(MetadataLookup::Unresolved, MetadataLookup::Resolved)
}

// ============================================================================
// SECTION: Quota State Store
// ============================================================================

/// Quota store errors.
///
/// # Invariants
/// - Error messages avoid embedding raw state payloads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("quota store io error: {0}")]
    Io(String),
    /// Store backend error.
    #[error("quota store error: {0}")]
    Store(String),
    /// Persisted state is unreadable.
    #[error("quota store corruption: {0}")]
    Corrupt(String),
    /// Invalid store configuration or data.
    #[error("quota store invalid data: {0}")]
    Invalid(String),
}

/// Persistent storage for the single quota tracker record.
pub trait QuotaStateStore {
    /// Loads the persisted tracker, or `None` when nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable or corrupt.
    fn load(&self) -> Result<Option<QuotaTracker>, StoreError>;

    /// Replaces the persisted tracker.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the tracker cannot be written.
    fn save(&self, tracker: &QuotaTracker) -> Result<(), StoreError>;
}

impl<T: QuotaStateStore + ?Sized> QuotaStateStore for Box<T> {
    fn load(&self) -> Result<Option<QuotaTracker>, StoreError> {
        (**self).load()
    }

    fn save(&self, tracker: &QuotaTracker) -> Result<(), StoreError> {
        (**self).save(tracker)
    }
}

/// In-memory quota store.
///
/// Used when the durable store cannot be opened, and by tests.
#[derive(Debug, Default)]
pub struct InMemoryQuotaStore {
    /// Last saved tracker.
    tracker: Mutex<Option<QuotaTracker>>,
}

impl InMemoryQuotaStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `tracker`.
    #[must_use]
    pub fn with_tracker(tracker: QuotaTracker) -> Self {
        Self {
            tracker: Mutex::new(Some(tracker)),
        }
    }
}

impl QuotaStateStore for InMemoryQuotaStore {
    fn load(&self) -> Result<Option<QuotaTracker>, StoreError> {
        let guard =
            self.tracker.lock().map_err(|_| StoreError::Store("mutex poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn save(&self, tracker: &QuotaTracker) -> Result<(), StoreError> {
        let mut guard =
            self.tracker.lock().map_err(|_| StoreError::Store("mutex poisoned".to_string()))?;
        *guard = Some(tracker.clone());
        Ok(())
    }
}

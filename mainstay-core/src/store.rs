//! Cache store collaborator contract.

use async_trait::async_trait;
use thiserror::Error;

use crate::entry::CacheEntry;
use crate::key::CacheKey;

/// Error type for cache store operations.
///
/// Splits internal failures from network interaction so callers can decide
/// whether a failed read should degrade to a miss or surface.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Internal store error, state or computation error.
    ///
    /// Any error not related to network interaction.
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send>),

    /// Network interaction error.
    ///
    /// Errors occurring during communication with remote stores.
    #[error(transparent)]
    Connection(Box<dyn std::error::Error + Send>),
}

/// Result of a delete operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Number of deleted records.
    Deleted(u32),
    /// The key was not present.
    Missing,
}

/// Keyed entry storage with per-key atomicity.
///
/// Implementations must support concurrent reads and serialized (or
/// otherwise race-safe) writes per key. No multi-key transactional
/// guarantees are required: a foreground miss-triggered write and a
/// background revalidation write for the same key may race, and
/// last-writer-wins by timestamp is acceptable because both carry
/// legitimate fresh data.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads the entry for a key, if present.
    async fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError>;

    /// Writes an entry, replacing any existing one for the key.
    async fn write(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), StoreError>;

    /// Removes the entry for a key.
    async fn remove(&self, key: &CacheKey) -> Result<DeleteStatus, StoreError>;

    /// Removes all entries.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Current aggregate size of stored entries in bytes.
    async fn size_bytes(&self) -> usize;
}

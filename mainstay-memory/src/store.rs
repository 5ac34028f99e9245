//! In-memory store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use mainstay_core::{CacheEntry, CacheKey, CacheStore, DeleteStatus, StoreError};

/// Shared state behind the store's clones.
struct Inner {
    entries: DashMap<CacheKey, CacheEntry>,
    /// Approximate aggregate size of keys and entries in bytes.
    size: AtomicUsize,
    max_size_bytes: usize,
    /// Fraction of `max_size_bytes` eviction shrinks usage down to.
    headroom: f64,
    /// Entries older than this are expired and swept.
    lifetime: Option<Duration>,
}

/// In-memory cache store with size-bounded oldest-first eviction.
///
/// Entries live in a [`DashMap`] keyed by [`CacheKey`], with an atomic
/// counter tracking the approximate aggregate size. Exceeding the size
/// limit evicts entries oldest-`stored_at`-first until usage drops to the
/// headroom fraction of the limit.
///
/// # Caveats
///
/// - Data is **not persisted** - the cache is lost on process exit
/// - Data is **not shared** across processes
/// - Size accounting is **approximate** - concurrent writes may briefly
///   overshoot the limit before eviction catches up
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.inner.entries.len())
            .field("size", &self.inner.size.load(Ordering::Relaxed))
            .field("max_size_bytes", &self.inner.max_size_bytes)
            .field("headroom", &self.inner.headroom)
            .field("lifetime", &self.inner.lifetime)
            .finish()
    }
}

fn entry_cost(key: &CacheKey, entry: &CacheEntry) -> usize {
    key.memory_size() + entry.memory_size()
}

impl MemoryStore {
    /// Creates a new builder with the given maximum aggregate size.
    pub fn builder(max_size_bytes: usize) -> crate::builder::MemoryStoreBuilder {
        crate::builder::MemoryStoreBuilder::new(max_size_bytes)
    }

    pub(crate) fn from_parts(
        max_size_bytes: usize,
        headroom: f64,
        lifetime: Option<Duration>,
    ) -> Self {
        MemoryStore {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                size: AtomicUsize::new(0),
                max_size_bytes,
                headroom,
                lifetime,
            }),
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns true if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    fn remove_entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        let (removed_key, removed) = self.inner.entries.remove(key)?;
        self.inner
            .size
            .fetch_sub(entry_cost(&removed_key, &removed), Ordering::Relaxed);
        Some(removed)
    }

    /// Removes entries past their lifetime.
    ///
    /// Called opportunistically from read and write paths.
    fn sweep_expired(&self, now: DateTime<Utc>) {
        let Some(lifetime) = self.inner.lifetime else {
            return;
        };
        let expired: Vec<CacheKey> = self
            .inner
            .entries
            .iter()
            .filter(|item| item.value().is_expired(now, lifetime))
            .map(|item| item.key().clone())
            .collect();
        for key in expired {
            debug!(key = %key, "sweeping expired entry");
            self.remove_entry(&key);
        }
    }

    /// Evicts oldest-timestamp-first until usage drops to the headroom
    /// fraction of the limit.
    fn evict_to_headroom(&self) {
        let target = (self.inner.max_size_bytes as f64 * self.inner.headroom) as usize;
        if self.inner.size.load(Ordering::Relaxed) <= self.inner.max_size_bytes {
            return;
        }

        let mut by_age: Vec<(CacheKey, DateTime<Utc>)> = self
            .inner
            .entries
            .iter()
            .map(|item| (item.key().clone(), item.value().stored_at))
            .collect();
        by_age.sort_by_key(|(_, stored_at)| *stored_at);

        for (key, _) in by_age {
            if self.inner.size.load(Ordering::Relaxed) <= target {
                break;
            }
            warn!(key = %key, "evicting entry under size pressure");
            self.remove_entry(&key);
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn read(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        self.sweep_expired(Utc::now());
        Ok(self.inner.entries.get(key).map(|item| item.value().clone()))
    }

    async fn write(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), StoreError> {
        self.sweep_expired(Utc::now());

        let cost = entry_cost(key, &entry);
        if let Some((old_key, old)) = self.inner.entries.remove(key) {
            self.inner
                .size
                .fetch_sub(entry_cost(&old_key, &old), Ordering::Relaxed);
        }
        self.inner.entries.insert(key.clone(), entry);
        self.inner.size.fetch_add(cost, Ordering::Relaxed);

        self.evict_to_headroom();
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<DeleteStatus, StoreError> {
        match self.remove_entry(key) {
            Some(_) => Ok(DeleteStatus::Deleted(1)),
            None => Ok(DeleteStatus::Missing),
        }
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.inner.entries.clear();
        self.inner.size.store(0, Ordering::Relaxed);
        Ok(())
    }

    async fn size_bytes(&self) -> usize {
        self.inner.size.load(Ordering::Relaxed)
    }
}

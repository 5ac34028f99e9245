//! Builder for [`MemoryStore`].

use std::time::Duration;

use crate::MemoryStore;

/// Default eviction headroom: shrink to 80% of the limit under pressure.
const DEFAULT_HEADROOM: f64 = 0.8;

/// Builder for [`MemoryStore`].
///
/// # Example
///
/// ```
/// use mainstay_memory::MemoryStore;
/// use std::time::Duration;
///
/// let store = MemoryStore::builder(4 * 1024 * 1024)
///     .eviction_headroom(0.75)
///     .entry_lifetime(Duration::from_secs(300))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStoreBuilder {
    max_size_bytes: usize,
    headroom: f64,
    lifetime: Option<Duration>,
}

impl MemoryStoreBuilder {
    /// Creates a builder with the given maximum aggregate size in bytes.
    pub fn new(max_size_bytes: usize) -> Self {
        MemoryStoreBuilder {
            max_size_bytes,
            headroom: DEFAULT_HEADROOM,
            lifetime: None,
        }
    }

    /// Sets the eviction headroom fraction.
    ///
    /// When a write pushes usage over the limit, eviction removes entries
    /// oldest-first until usage drops to `headroom * max_size_bytes`.
    /// Values are clamped to `(0.0, 1.0]`.
    pub fn eviction_headroom(mut self, headroom: f64) -> Self {
        self.headroom = headroom.clamp(f64::EPSILON, 1.0);
        self
    }

    /// Sets the entry lifetime after which entries are swept as expired.
    ///
    /// Callers typically pass their `stale_time` window here so the store
    /// never retains data the pipeline would refuse to serve anyway.
    pub fn entry_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Builds the store.
    pub fn build(self) -> MemoryStore {
        MemoryStore::from_parts(self.max_size_bytes, self.headroom, self.lifetime)
    }
}

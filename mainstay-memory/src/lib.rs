#![warn(missing_docs)]
//! In-memory [`CacheStore`](mainstay_core::CacheStore) implementation.
//!
//! [`MemoryStore`] keeps entries in a concurrent map with an aggregate size
//! bound. When a write pushes usage over the bound, entries are evicted
//! oldest-timestamp-first until usage drops to a configured headroom
//! fraction of the limit. Entries past their lifetime are swept
//! opportunistically during reads and writes.
//!
//! # Example
//!
//! ```
//! use mainstay_memory::MemoryStore;
//! use std::time::Duration;
//!
//! let store = MemoryStore::builder(8 * 1024 * 1024)
//!     .eviction_headroom(0.8)
//!     .entry_lifetime(Duration::from_secs(600))
//!     .build();
//! ```

mod builder;
mod store;

pub use builder::MemoryStoreBuilder;
pub use store::MemoryStore;

//! Offload trait for background task execution.
//!
//! This module provides the [`Offload`] trait which abstracts over
//! different implementations for spawning background tasks.

use std::future::Future;

use smol_str::SmolStr;

use crate::key::CacheKey;

/// Trait for spawning background tasks.
///
/// The cache stage uses this to run stale-entry revalidations off the
/// request path: the foreground response returns immediately while the
/// spawned task refreshes the store.
///
/// # Implementations
///
/// The primary implementation is `OffloadManager` in the `mainstay` crate,
/// which tracks in-flight tasks and collapses concurrent revalidations for
/// the same cache key into one.
///
/// # Clone bound
///
/// Implementors should use `Arc` internally so all cloned instances share
/// the same task registry.
pub trait Offload: Send + Sync + Clone {
    /// Spawn a future to be executed in the background.
    ///
    /// # Arguments
    ///
    /// * `kind` - A label categorizing the task type (e.g., "revalidate").
    ///   Used for tracing.
    /// * `future` - The future to execute in the background. Must be
    ///   `Send + 'static` as it may run on a different thread.
    fn spawn<F>(&self, kind: impl Into<SmolStr>, future: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Spawn a background task identified by a cache key.
    ///
    /// Implementations that track in-flight tasks use the key to collapse
    /// concurrent revalidations for the same entry into one. Returns
    /// `true` if the task was spawned, `false` if it was skipped.
    ///
    /// The default implementation spawns unconditionally.
    fn spawn_keyed<F>(&self, _key: CacheKey, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn("revalidate", future);
        true
    }
}

/// An [`Offload`] that drops every task without running it.
///
/// Disables stale-while-revalidate: stale entries are still served, but no
/// background refresh happens.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledOffload;

impl Offload for DisabledOffload {
    fn spawn<F>(&self, _kind: impl Into<SmolStr>, _future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
    }

    fn spawn_keyed<F>(&self, _key: CacheKey, _future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        false
    }
}

//! Connectivity probe collaborator contract.

use async_trait::async_trait;

/// Reports network reachability.
///
/// External collaborator queried by the retry stage before each retry
/// attempt, so that retries are not burned on a device that is known to be
/// offline.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Returns true if the network is currently reachable.
    async fn is_connected(&self) -> bool;
}

/// A probe that always reports connectivity.
///
/// Useful for environments without a reachability signal and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConnected;

#[async_trait]
impl ConnectivityProbe for AlwaysConnected {
    async fn is_connected(&self) -> bool {
        true
    }
}

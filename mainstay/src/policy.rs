//! Pipeline policy configuration.
//!
//! All recognized options from the configuration surface live here, split
//! per stage. Durations deserialize from humantime strings ("500ms", "30s",
//! "5m").

use std::collections::BTreeSet;
use std::time::Duration;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Freshness windows and size bound for the cache stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachePolicy {
    /// Window during which an entry is fresh and served without a network
    /// call (e.g., "30s").
    #[serde(default = "default_max_age", with = "humantime_serde")]
    pub max_age: Duration,
    /// Window during which a no-longer-fresh entry can still be served
    /// while revalidating in the background (e.g., "10m").
    ///
    /// `max_age <= stale_time` is assumed; violating it makes the stale
    /// branch unreachable.
    #[serde(default = "default_stale_time", with = "humantime_serde")]
    pub stale_time: Duration,
    /// Maximum aggregate size of the cache store in bytes.
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,
    /// Fraction of `max_cache_size` eviction shrinks usage down to.
    #[serde(default = "default_eviction_headroom")]
    pub eviction_headroom: f64,
    /// Namespace prefix baked into every cache key.
    #[serde(default)]
    pub key_prefix: SmolStr,
    /// Version baked into every cache key; bump to invalidate everything.
    #[serde(default)]
    pub key_version: u32,
}

fn default_max_age() -> Duration {
    Duration::from_secs(30)
}

fn default_stale_time() -> Duration {
    Duration::from_secs(600)
}

fn default_max_cache_size() -> usize {
    8 * 1024 * 1024
}

fn default_eviction_headroom() -> f64 {
    0.8
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy {
            max_age: default_max_age(),
            stale_time: default_stale_time(),
            max_cache_size: default_max_cache_size(),
            eviction_headroom: default_eviction_headroom(),
            key_prefix: SmolStr::default(),
            key_version: 0,
        }
    }
}

/// Retry budget, backoff base, and retryable condition set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for the exponential backoff (e.g., "500ms").
    #[serde(default = "default_base_delay", with = "humantime_serde")]
    pub base_delay: Duration,
    /// Status codes classified as transient.
    #[serde(default = "default_retryable_status_codes")]
    pub retryable_status_codes: BTreeSet<u16>,
    /// How long to wait before the single connectivity re-check when the
    /// probe reports offline.
    #[serde(default = "default_recheck_delay", with = "humantime_serde")]
    pub connectivity_recheck_delay: Duration,
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_retryable_status_codes() -> BTreeSet<u16> {
    BTreeSet::from([408, 429, 500, 502, 503, 504])
}

fn default_recheck_delay() -> Duration {
    Duration::from_secs(1)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: default_max_retries(),
            base_delay: default_base_delay(),
            retryable_status_codes: default_retryable_status_codes(),
            connectivity_recheck_delay: default_recheck_delay(),
        }
    }
}

impl RetryPolicy {
    /// Returns true if the status code is in the retryable set.
    pub fn is_retryable_status(&self, status: StatusCode) -> bool {
        self.retryable_status_codes.contains(&status.as_u16())
    }
}

/// Paths exempt from bearer token injection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AuthPolicy {
    /// Auth-exempt paths. An entry ending in `*` matches as a prefix,
    /// otherwise the match is exact.
    #[serde(default)]
    pub exempt_paths: BTreeSet<String>,
}

impl AuthPolicy {
    /// Returns true if the path is exempt from token injection.
    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|pattern| {
            match pattern.strip_suffix('*') {
                Some(prefix) => path.starts_with(prefix),
                None => path == pattern,
            }
        })
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PipelineConfig {
    /// Cache stage policy.
    #[serde(default)]
    pub cache: CachePolicy,
    /// Retry stage policy.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Auth stage policy.
    #[serde(default)]
    pub auth: AuthPolicy,
}

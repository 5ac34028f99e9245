//! Response type and origin tracking.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use std::time::Duration;

use crate::entry::CacheEntry;

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    /// Response came from the network (cache miss or bypass).
    #[default]
    Network,
    /// Response was served from a fresh cache entry; no network call
    /// occurred.
    CacheFresh,
    /// Response was served from a stale cache entry while a background
    /// revalidation was scheduled.
    CacheStale,
}

impl Origin {
    /// Returns the origin as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Origin::Network => "network",
            Origin::CacheFresh => "cache-fresh",
            Origin::CacheStale => "cache-stale",
        }
    }
}

/// A response returned to the caller.
///
/// Immutable once constructed. Carries the [`Origin`] flag and, for
/// cache-served responses, the age of the entry at serve time.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
    /// Where the response came from.
    pub origin: Origin,
    /// Seconds since the backing cache entry was stored, if cache-served.
    pub age: Option<Duration>,
}

impl Response {
    /// Creates a network-origin response.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Response {
            status,
            headers,
            body,
            origin: Origin::Network,
            age: None,
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Snapshots this response into a cache entry stored at the current
    /// instant.
    pub fn to_entry(&self) -> CacheEntry {
        CacheEntry::new(self.status, self.headers.clone(), self.body.clone())
    }

    /// Rebuilds a response from a cache entry with the given origin and
    /// age annotation.
    pub fn from_entry(entry: &CacheEntry, origin: Origin, age: Duration) -> Self {
        Response {
            status: entry.status,
            headers: entry.headers.clone(),
            body: entry.body.clone(),
            origin,
            age: Some(age),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn entry_round_trip_preserves_parts() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        let response = Response::new(StatusCode::OK, headers, Bytes::from_static(b"{}"));

        let entry = response.to_entry();
        let served = Response::from_entry(&entry, Origin::CacheFresh, entry.age(Utc::now()));

        assert_eq!(served.status, StatusCode::OK);
        assert_eq!(served.body, response.body);
        assert_eq!(served.origin, Origin::CacheFresh);
        assert!(served.age.is_some());
    }

    #[test]
    fn origin_labels() {
        assert_eq!(Origin::Network.as_str(), "network");
        assert_eq!(Origin::CacheFresh.as_str(), "cache-fresh");
        assert_eq!(Origin::CacheStale.as_str(), "cache-stale");
    }
}

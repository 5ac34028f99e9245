//! Cached response snapshots with freshness metadata.
//!
//! This module provides [`CacheEntry`], the stored form of a successful
//! response, and [`Freshness`], the result of evaluating an entry against
//! the configured freshness windows.
//!
//! ## Freshness vs Staleness
//!
//! Cache entries move through three time-based states relative to their
//! stored timestamp:
//!
//! - **Fresh** - within `max_age`; servable with no network call
//! - **Stale** - past `max_age` but within `stale_time`; servable
//!   immediately while fresh data is fetched in the background
//! - **Expired** - past `stale_time`; ignored and eligible for eviction
//!
//! This is what enables the "stale-while-revalidate" pattern: stale data is
//! served synchronously while a detached refresh overwrites the entry.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use std::mem::size_of;
use std::time::Duration;

/// Time-based state of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Entry is within `max_age` - servable with no network call.
    Fresh,
    /// Entry is past `max_age` but within `stale_time` - servable while
    /// revalidating in the background.
    Stale,
    /// Entry is past `stale_time` - must not be served.
    Expired,
}

impl Freshness {
    /// Returns the state as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Freshness::Fresh => "fresh",
            Freshness::Stale => "stale",
            Freshness::Expired => "expired",
        }
    }
}

/// A stored snapshot of a successful response.
///
/// Entries are created from 2xx GET responses and keep the status, headers,
/// and body together with the instant they were stored. Freshness is always
/// evaluated against the *caller's* windows rather than baked into the
/// entry, so the same stored data can be judged under different policies.
///
/// # Persisted layout
///
/// Serializes as `{statusCode, headers, body, timestamp}` via serde, with
/// `http-serde` handling the status code and header map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Status code of the stored response.
    #[serde(rename = "statusCode", with = "http_serde::status_code")]
    pub status: StatusCode,
    /// Headers of the stored response.
    #[serde(with = "http_serde::header_map")]
    pub headers: HeaderMap,
    /// Body bytes of the stored response.
    pub body: Bytes,
    /// When the entry was stored.
    #[serde(rename = "timestamp")]
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry stored at the current instant.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        CacheEntry {
            status,
            headers,
            body,
            stored_at: Utc::now(),
        }
    }

    /// Creates an entry with an explicit stored timestamp.
    ///
    /// Mostly useful in tests and for backdating entries during replay.
    pub fn with_stored_at(
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
        stored_at: DateTime<Utc>,
    ) -> Self {
        CacheEntry {
            status,
            headers,
            body,
            stored_at,
        }
    }

    /// Seconds elapsed since the entry was stored, as a [`Duration`].
    ///
    /// Saturates at zero if the stored timestamp is in the future
    /// (clock skew between writer and reader).
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.stored_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Evaluates the entry against the given freshness windows.
    ///
    /// `max_age <= stale_time` is assumed; violating it simply makes the
    /// [`Freshness::Stale`] state unreachable.
    pub fn freshness(
        &self,
        now: DateTime<Utc>,
        max_age: Duration,
        stale_time: Duration,
    ) -> Freshness {
        let age = self.age(now);
        if age <= max_age {
            Freshness::Fresh
        } else if age <= stale_time {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }

    /// Returns true if the entry is past `stale_time` at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, stale_time: Duration) -> bool {
        self.age(now) > stale_time
    }

    /// Returns the estimated memory usage of this entry in bytes.
    ///
    /// This includes:
    /// - Fixed struct overhead (entry fields)
    /// - The body bytes
    /// - Header names and values
    pub fn memory_size(&self) -> usize {
        let fixed_overhead = size_of::<Self>();

        let headers = self
            .headers
            .iter()
            .map(|(name, value)| name.as_str().len() + value.len())
            .sum::<usize>();

        fixed_overhead + self.body.len() + headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn entry_aged(seconds: i64) -> CacheEntry {
        CacheEntry::with_stored_at(
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from_static(b"body"),
            Utc::now() - ChronoDuration::seconds(seconds),
        )
    }

    #[test]
    fn fresh_within_max_age() {
        let entry = entry_aged(10);
        let state = entry.freshness(
            Utc::now(),
            Duration::from_secs(30),
            Duration::from_secs(120),
        );
        assert_eq!(state, Freshness::Fresh);
    }

    #[test]
    fn stale_between_windows() {
        let entry = entry_aged(60);
        let state = entry.freshness(
            Utc::now(),
            Duration::from_secs(30),
            Duration::from_secs(120),
        );
        assert_eq!(state, Freshness::Stale);
    }

    #[test]
    fn expired_past_stale_time() {
        let entry = entry_aged(300);
        let state = entry.freshness(
            Utc::now(),
            Duration::from_secs(30),
            Duration::from_secs(120),
        );
        assert_eq!(state, Freshness::Expired);
        assert!(entry.is_expired(Utc::now(), Duration::from_secs(120)));
    }

    #[test]
    fn age_saturates_on_future_timestamp() {
        let entry = CacheEntry::with_stored_at(
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::new(),
            Utc::now() + ChronoDuration::seconds(30),
        );
        assert_eq!(entry.age(Utc::now()), Duration::ZERO);
    }

    #[test]
    fn persisted_layout_field_names() {
        let entry = entry_aged(0);
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("statusCode").is_some());
        assert!(json.get("headers").is_some());
        assert!(json.get("body").is_some());
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn memory_size_counts_body_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-test", "value".parse().unwrap());
        let entry = CacheEntry::new(StatusCode::OK, headers, Bytes::from_static(b"0123456789"));
        assert!(entry.memory_size() >= 10 + "x-test".len() + "value".len());
    }
}

//! Response caching with stale-while-revalidate.

use async_trait::async_trait;
use chrono::Utc;
use http::Method;
use std::sync::Arc;
use tracing::{debug, warn};

use mainstay_core::{
    CacheKey, CacheStore, Freshness, Offload, Origin, Request, Response, TransportError, Upstream,
};

use crate::extract::cache_key_for;
use crate::policy::CachePolicy;

/// Short-circuits GET requests with fresh or stale cached entries and
/// writes successful GET responses back into the store.
///
/// - **Fresh hit**: the entry is returned immediately as
///   [`Origin::CacheFresh`]; the network is never touched.
/// - **Stale hit**: the entry is returned immediately as
///   [`Origin::CacheStale`] and a detached revalidation is spawned through
///   the [`Offload`]; on success it overwrites the entry, on failure the
///   stale entry is left untouched.
/// - **Miss or expired**: the request dispatches normally and 2xx
///   responses are stored before being returned as [`Origin::Network`].
///
/// Non-GET requests and requests flagged `skip_cache` pass through
/// untouched. Store failures degrade to misses rather than failing the
/// exchange.
pub struct CacheStage<U, O> {
    inner: Arc<U>,
    store: Arc<dyn CacheStore>,
    offload: O,
    policy: CachePolicy,
}

impl<U, O> CacheStage<U, O> {
    /// Creates the stage around an inner upstream.
    pub fn new(inner: Arc<U>, store: Arc<dyn CacheStore>, offload: O, policy: CachePolicy) -> Self {
        CacheStage {
            inner,
            store,
            offload,
            policy,
        }
    }

    /// Derives the cache key for a request under this stage's policy.
    pub fn cache_key(&self, request: &Request) -> CacheKey {
        cache_key_for(
            request,
            self.policy.key_prefix.clone(),
            self.policy.key_version,
        )
    }
}

impl<U, O> CacheStage<U, O>
where
    U: Upstream + 'static,
    O: Offload,
{
    /// Spawns a detached re-fetch for a stale entry.
    ///
    /// Fire-and-forget: the foreground response is already on its way back
    /// to the caller. The task's outcome is observed only through its side
    /// effect on the store - success overwrites the entry, failure is
    /// dropped. Concurrent revalidations for the same key collapse into
    /// one via the offload's keyed spawn.
    fn spawn_revalidation(&self, key: CacheKey, request: Request) {
        let inner = Arc::clone(&self.inner);
        let store = Arc::clone(&self.store);
        let task_key = key.clone();

        let spawned = self.offload.spawn_keyed(key.clone(), async move {
            match inner.call(request).await {
                Ok(response) if response.is_success() => {
                    if let Err(error) = store.write(&task_key, response.to_entry()).await {
                        warn!(key = %task_key, %error, "revalidation write failed");
                    }
                }
                Ok(response) => {
                    debug!(
                        key = %task_key,
                        status = response.status.as_u16(),
                        "revalidation returned non-success; keeping stale entry"
                    );
                }
                Err(error) => {
                    debug!(key = %task_key, %error, "revalidation failed; keeping stale entry");
                }
            }
        });

        if !spawned {
            debug!(key = %key, "revalidation already in flight");
        }
    }
}

#[async_trait]
impl<U, O> Upstream for CacheStage<U, O>
where
    U: Upstream + 'static,
    O: Offload,
{
    async fn call(&self, req: Request) -> Result<Response, TransportError> {
        if req.method != Method::GET || req.meta.skip_cache {
            return self.inner.call(req).await;
        }

        let key = self.cache_key(&req);
        let now = Utc::now();

        match self.store.read(&key).await {
            Ok(Some(entry)) => {
                match entry.freshness(now, self.policy.max_age, self.policy.stale_time) {
                    Freshness::Fresh => {
                        debug!(key = %key, "serving fresh cache entry");
                        return Ok(Response::from_entry(
                            &entry,
                            Origin::CacheFresh,
                            entry.age(now),
                        ));
                    }
                    Freshness::Stale => {
                        debug!(key = %key, "serving stale entry; revalidating in background");
                        self.spawn_revalidation(key.clone(), req.clone());
                        return Ok(Response::from_entry(
                            &entry,
                            Origin::CacheStale,
                            entry.age(now),
                        ));
                    }
                    Freshness::Expired => {
                        debug!(key = %key, "cached entry expired; discarding");
                        if let Err(error) = self.store.remove(&key).await {
                            warn!(key = %key, %error, "failed to discard expired entry");
                        }
                    }
                }
            }
            Ok(None) => {}
            Err(error) => {
                warn!(key = %key, %error, "cache read failed; treating as miss");
            }
        }

        let response = self.inner.call(req).await?;
        if response.is_success()
            && let Err(error) = self.store.write(&key, response.to_entry()).await
        {
            warn!(key = %key, %error, "cache write failed");
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};
    use mainstay_core::{CacheEntry, DisabledOffload};
    use mainstay_memory::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingUpstream {
        calls: AtomicUsize,
        status: StatusCode,
    }

    impl CountingUpstream {
        fn ok() -> Self {
            CountingUpstream {
                calls: AtomicUsize::new(0),
                status: StatusCode::OK,
            }
        }
    }

    #[async_trait]
    impl Upstream for CountingUpstream {
        async fn call(&self, _req: Request) -> Result<Response, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Response::new(
                self.status,
                HeaderMap::new(),
                Bytes::from_static(b"net"),
            ))
        }
    }

    fn stage(
        upstream: Arc<CountingUpstream>,
        store: Arc<dyn CacheStore>,
    ) -> CacheStage<CountingUpstream, DisabledOffload> {
        CacheStage::new(upstream, store, DisabledOffload, CachePolicy::default())
    }

    fn get(path: &str) -> Request {
        Request::get(format!("https://api.test{path}").parse().unwrap())
    }

    #[tokio::test]
    async fn miss_dispatches_and_stores() {
        let upstream = Arc::new(CountingUpstream::ok());
        let store = Arc::new(MemoryStore::builder(1024 * 1024).build());
        let stage = stage(upstream.clone(), store.clone());

        let response = stage.call(get("/users")).await.unwrap();
        assert_eq!(response.origin, Origin::Network);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn fresh_hit_short_circuits() {
        let upstream = Arc::new(CountingUpstream::ok());
        let store = Arc::new(MemoryStore::builder(1024 * 1024).build());
        let stage = stage(upstream.clone(), store.clone());

        stage.call(get("/users")).await.unwrap();
        let second = stage.call(get("/users")).await.unwrap();

        assert_eq!(second.origin, Origin::CacheFresh);
        assert!(second.age.is_some());
        // One network call total - the fresh hit never dispatched.
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_get_bypasses_cache() {
        let upstream = Arc::new(CountingUpstream::ok());
        let store = Arc::new(MemoryStore::builder(1024 * 1024).build());
        let stage = stage(upstream.clone(), store.clone());

        let request = Request::post("https://api.test/users".parse().unwrap());
        let response = stage.call(request).await.unwrap();

        assert_eq!(response.origin, Origin::Network);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn skip_cache_flag_bypasses_lookup_and_store() {
        let upstream = Arc::new(CountingUpstream::ok());
        let store = Arc::new(MemoryStore::builder(1024 * 1024).build());
        let stage = stage(upstream.clone(), store.clone());

        stage.call(get("/users").skip_cache()).await.unwrap();
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn expired_entry_treated_as_miss_and_discarded() {
        let upstream = Arc::new(CountingUpstream::ok());
        let store = Arc::new(MemoryStore::builder(1024 * 1024).build());
        let stage = stage(upstream.clone(), store.clone());

        // Backdate an entry far past the stale window.
        let key = stage.cache_key(&get("/users"));
        let entry = CacheEntry::with_stored_at(
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from_static(b"old"),
            Utc::now() - chrono::Duration::hours(2),
        );
        store.write(&key, entry).await.unwrap();

        let response = stage.call(get("/users")).await.unwrap();
        assert_eq!(response.origin, Origin::Network);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_hit_with_disabled_offload_keeps_entry() {
        let upstream = Arc::new(CountingUpstream::ok());
        let store = Arc::new(MemoryStore::builder(1024 * 1024).build());
        let stage = stage(upstream.clone(), store.clone());

        let key = stage.cache_key(&get("/users"));
        let entry = CacheEntry::with_stored_at(
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from_static(b"stale"),
            Utc::now() - chrono::Duration::seconds(60),
        );
        store.write(&key, entry).await.unwrap();

        let response = stage.call(get("/users")).await.unwrap();
        assert_eq!(response.origin, Origin::CacheStale);
        assert_eq!(response.body, Bytes::from_static(b"stale"));
        // DisabledOffload drops the revalidation; no network call happens.
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 0);
    }
}

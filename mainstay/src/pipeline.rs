//! Pipeline assembly and the caller-facing entry point.

use std::sync::Arc;
use thiserror::Error;

use mainstay_core::{
    CacheKey, CacheStore, ConnectivityProbe, DeleteStatus, ErrorRecord, Request, Response,
    StoreError, TokenStore, Upstream,
};

use crate::extract::cache_key_for;
use crate::normalize::normalize;
use crate::offload::OffloadManager;
use crate::policy::PipelineConfig;
use crate::stage::{AuthStage, CacheStage, RetryStage};

type Chain = AuthStage<CacheStage<RetryStage<Arc<dyn Upstream>>, OffloadManager>>;

/// Error returned when the pipeline is assembled without a required
/// collaborator.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    /// No transport was provided.
    #[error("pipeline requires a transport")]
    MissingTransport,
    /// No token store was provided.
    #[error("pipeline requires a token store")]
    MissingTokenStore,
    /// No connectivity probe was provided.
    #[error("pipeline requires a connectivity probe")]
    MissingConnectivityProbe,
    /// No cache store was provided.
    #[error("pipeline requires a cache store")]
    MissingCacheStore,
}

/// The middleware chain around a single request/response exchange.
///
/// Stage order is fixed: auth, then cache, then retry around the
/// transport, with terminal error normalization applied to whatever comes
/// back. The pipeline owns no cross-request state of its own - each
/// invocation is independent except for the injected [`TokenStore`],
/// [`CacheStore`], and [`ConnectivityProbe`] shared across invocations.
///
/// A request may be cancelled (its future dropped) at any suspension
/// point; cache writes happen atomically on success only, so cancellation
/// never leaves a partial entry behind.
///
/// # Example
///
/// ```rust,ignore
/// use mainstay::{Pipeline, PipelineConfig};
///
/// let pipeline = Pipeline::builder()
///     .transport(transport)
///     .token_store(tokens)
///     .connectivity_probe(probe)
///     .cache_store(store)
///     .config(PipelineConfig::default())
///     .build()?;
///
/// let response = pipeline.execute(Request::get(uri)).await?;
/// ```
pub struct Pipeline {
    chain: Chain,
    store: Arc<dyn CacheStore>,
    offload: OffloadManager,
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a new [`PipelineBuilder`].
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Executes one exchange through the full chain.
    ///
    /// The sole public operation: returns the response for 2xx outcomes
    /// and a normalized [`ErrorRecord`] for everything else.
    pub async fn execute(&self, request: Request) -> Result<Response, ErrorRecord> {
        normalize(self.chain.call(request).await)
    }

    /// Derives the cache key a request resolves to under the configured
    /// prefix and version.
    pub fn cache_key(&self, request: &Request) -> CacheKey {
        cache_key_for(
            request,
            self.config.cache.key_prefix.clone(),
            self.config.cache.key_version,
        )
    }

    /// Removes one cached entry.
    pub async fn invalidate_key(&self, key: &CacheKey) -> Result<DeleteStatus, StoreError> {
        self.store.remove(key).await
    }

    /// Removes all cached entries.
    pub async fn clear_cache(&self) -> Result<(), StoreError> {
        self.store.clear().await
    }

    /// Current aggregate size of the cache store in bytes.
    pub async fn cache_size_bytes(&self) -> usize {
        self.store.size_bytes().await
    }

    /// The background task manager running stale-entry revalidations.
    ///
    /// Exposed so shutdown paths and tests can wait for or cancel
    /// outstanding revalidations.
    pub fn offload(&self) -> &OffloadManager {
        &self.offload
    }

    /// The active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    transport: Option<Arc<dyn Upstream>>,
    tokens: Option<Arc<dyn TokenStore>>,
    probe: Option<Arc<dyn ConnectivityProbe>>,
    store: Option<Arc<dyn CacheStore>>,
    offload: Option<OffloadManager>,
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Creates a builder with no collaborators set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport performing the actual network exchange.
    pub fn transport(mut self, transport: Arc<dyn Upstream>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the token store.
    pub fn token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Sets the connectivity probe.
    pub fn connectivity_probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Sets the cache store.
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Overrides the offload manager (defaults to a deduplicating one).
    pub fn offload(mut self, offload: OffloadManager) -> Self {
        self.offload = Some(offload);
        self
    }

    /// Sets the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Assembles the pipeline.
    pub fn build(self) -> Result<Pipeline, BuildError> {
        let transport = self.transport.ok_or(BuildError::MissingTransport)?;
        let tokens = self.tokens.ok_or(BuildError::MissingTokenStore)?;
        let probe = self.probe.ok_or(BuildError::MissingConnectivityProbe)?;
        let store = self.store.ok_or(BuildError::MissingCacheStore)?;
        let offload = self.offload.unwrap_or_default();
        let config = self.config;

        let retry = RetryStage::new(transport, probe, config.retry.clone());
        let cache = CacheStage::new(
            Arc::new(retry),
            Arc::clone(&store),
            offload.clone(),
            config.cache.clone(),
        );
        let chain = AuthStage::new(cache, tokens, config.auth.clone());

        Ok(Pipeline {
            chain,
            store,
            offload,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_without_transport_fails() {
        let result = Pipeline::builder().build();
        assert_eq!(result.err(), Some(BuildError::MissingTransport));
    }
}

#![warn(missing_docs)]
//! Resilient HTTP client middleware: caching, retry, auth refresh, and
//! error normalization composed as a fixed-order pipeline.
//!
//! Every layer wraps an inner [`Upstream`](mainstay_core::Upstream) and is
//! one itself, so the whole chain is assembled once and driven by a single
//! [`Pipeline::execute`] call:
//!
//! ```text
//! request -> AuthStage -> CacheStage -> RetryStage -> transport
//! response <- error normalization <----------------------------
//! ```
//!
//! - [`stage::AuthStage`] injects a bearer token and recovers a 401 with
//!   at most one single-flight token refresh.
//! - [`stage::CacheStage`] short-circuits GETs with fresh entries and
//!   serves stale ones while revalidating in the background.
//! - [`stage::RetryStage`] retries transient failures with exponential
//!   backoff and deterministic jitter behind a connectivity gate.
//! - [`normalize`](normalize::normalize) maps every non-2xx outcome into a
//!   closed [`ErrorKind`](mainstay_core::ErrorKind) taxonomy.
//!
//! Collaborators (transport, token store, connectivity probe, cache store)
//! are trait objects supplied through [`PipelineBuilder`]; the in-memory
//! store lives in the `mainstay-memory` crate.

pub mod backoff;
pub mod extract;
pub mod normalize;
pub mod offload;
pub mod pipeline;
pub mod policy;
pub mod stage;

pub use mainstay_core::{
    AlwaysConnected, AttemptMeta, CacheEntry, CacheKey, CacheStore, ConnectivityProbe,
    DeleteStatus, ErrorKind, ErrorRecord, Freshness, Origin, Request, Response, StoreError,
    TokenError, TokenPair, TokenStore, TransportError, Upstream,
};

pub use offload::{OffloadConfig, OffloadManager};
pub use pipeline::{BuildError, Pipeline, PipelineBuilder};
pub use policy::{AuthPolicy, CachePolicy, PipelineConfig, RetryPolicy};
pub use stage::{AuthStage, CacheStage, RetryStage};

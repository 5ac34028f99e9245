//! Upstream trait - the transport seam.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::TransportError;
use crate::request::Request;
use crate::response::Response;

/// A single request/response exchange against a downstream party.
///
/// This is both the transport boundary (the innermost implementation
/// actually performs network I/O) and the seam between pipeline stages:
/// every stage wraps an inner `Upstream` and is itself one, so stages
/// compose like layers of an onion.
///
/// The pipeline does not define transport internals - connection pooling,
/// TLS, and timeout enforcement belong to the implementation, which
/// surfaces failures as [`TransportError`].
///
/// # Examples
///
/// ```rust,ignore
/// use mainstay_core::{Request, Response, TransportError, Upstream};
///
/// struct MockUpstream {
///     response: Response,
/// }
///
/// #[async_trait::async_trait]
/// impl Upstream for MockUpstream {
///     async fn call(&self, _req: Request) -> Result<Response, TransportError> {
///         Ok(self.response.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Performs the exchange.
    async fn call(&self, req: Request) -> Result<Response, TransportError>;
}

#[async_trait]
impl<U> Upstream for Arc<U>
where
    U: Upstream + ?Sized,
{
    async fn call(&self, req: Request) -> Result<Response, TransportError> {
        (**self).call(req).await
    }
}

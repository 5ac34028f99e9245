//! Bearer token injection and single refresh-and-retry.

use async_trait::async_trait;
use http::StatusCode;
use http::header::{AUTHORIZATION, HeaderValue};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use mainstay_core::{Request, Response, TokenStore, TransportError, Upstream};

use crate::policy::AuthPolicy;

/// Injects `Authorization: Bearer <token>` and recovers a 401 with at most
/// one token refresh per original request.
///
/// Refreshes are single-flight across concurrent in-flight requests: they
/// serialize through a mutex, and a request that finds the stored token
/// already changed while it waited reuses the new token instead of
/// refreshing again. On refresh failure the stage clears the token store
/// and propagates the 401 unchanged - there is no second refresh and no
/// infinite retry regardless of subsequent 401s.
pub struct AuthStage<U> {
    inner: U,
    tokens: Arc<dyn TokenStore>,
    policy: AuthPolicy,
    refresh_lock: Mutex<()>,
}

impl<U> AuthStage<U> {
    /// Creates the stage around an inner upstream.
    pub fn new(inner: U, tokens: Arc<dyn TokenStore>, policy: AuthPolicy) -> Self {
        AuthStage {
            inner,
            tokens,
            policy,
            refresh_lock: Mutex::new(()),
        }
    }
}

fn inject_bearer(request: &mut Request, token: &str) {
    match HeaderValue::from_str(&format!("Bearer {token}")) {
        Ok(value) => {
            request.headers.insert(AUTHORIZATION, value);
        }
        Err(_) => {
            // A token with invalid header characters cannot be sent;
            // dispatch without it and let the server reply 401.
            warn!("access token is not a valid header value; skipping injection");
        }
    }
}

impl<U> AuthStage<U>
where
    U: Upstream,
{
    /// Obtains the token to use for the post-401 re-send.
    ///
    /// Returns `None` when the refresh failed and the 401 should be
    /// propagated as-is.
    async fn refreshed_token(&self, sent_token: &Option<String>) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;

        // Another request may have refreshed while we waited for the lock.
        let current = self.tokens.access_token().await;
        if current.is_some() && current != *sent_token {
            debug!("token already refreshed by a concurrent request");
            return current;
        }

        match self.tokens.refresh().await {
            Ok(()) => self.tokens.access_token().await,
            Err(error) => {
                warn!(%error, "token refresh failed; clearing tokens");
                self.tokens.clear().await;
                None
            }
        }
    }
}

#[async_trait]
impl<U> Upstream for AuthStage<U>
where
    U: Upstream,
{
    async fn call(&self, req: Request) -> Result<Response, TransportError> {
        if self.policy.is_exempt(req.path()) {
            return self.inner.call(req).await;
        }

        let sent_token = self.tokens.access_token().await;

        let mut first = req.clone();
        if let Some(token) = &sent_token {
            inject_bearer(&mut first, token);
        }

        let response = self.inner.call(first).await?;
        if response.status != StatusCode::UNAUTHORIZED || req.meta.auth_refreshed {
            return Ok(response);
        }

        let Some(token) = self.refreshed_token(&sent_token).await else {
            return Ok(response);
        };

        debug!(path = req.path(), "re-issuing request with refreshed token");
        let mut retry = req;
        retry.meta.auth_refreshed = true;
        inject_bearer(&mut retry, &token);
        self.inner.call(retry).await
    }
}

//! Token storage collaborator contract.

use async_trait::async_trait;
use thiserror::Error;

/// An access token together with its optional refresh token.
///
/// Owned by the [`TokenStore`]; pipeline stages only read and mutate
/// tokens through the store's contract and never cache them themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Bearer access token.
    pub access: String,
    /// Refresh token, if the auth scheme issues one.
    pub refresh: Option<String>,
}

impl TokenPair {
    /// Creates a pair with only an access token.
    pub fn access_only(access: impl Into<String>) -> Self {
        TokenPair {
            access: access.into(),
            refresh: None,
        }
    }
}

/// Error type for token refresh operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The auth server rejected the refresh (e.g. revoked refresh token).
    #[error("token refresh rejected: {0}")]
    RefreshRejected(String),

    /// Network failure while talking to the auth server.
    #[error(transparent)]
    Network(Box<dyn std::error::Error + Send + Sync>),
}

/// Storage and refresh of auth tokens.
///
/// External collaborator: the pipeline never persists tokens itself. The
/// auth stage reads the current access token before each dispatch, invokes
/// [`refresh`](TokenStore::refresh) on a 401, and
/// [`clear`](TokenStore::clear)s the store when the refresh fails.
///
/// Implementations must support concurrent reads and race-safe writes;
/// the auth stage serializes refresh calls on its side.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Returns the current access token, if any.
    async fn access_token(&self) -> Option<String>;

    /// Returns the full stored pair, if any.
    ///
    /// The default implementation carries only the access token; stores
    /// that hold a refresh token should override it.
    async fn token_pair(&self) -> Option<TokenPair> {
        self.access_token().await.map(TokenPair::access_only)
    }

    /// Exchanges the refresh token for a new token pair.
    ///
    /// Side effect: on success, the stored tokens are updated.
    async fn refresh(&self) -> Result<(), TokenError>;

    /// Removes all stored tokens.
    async fn clear(&self);
}

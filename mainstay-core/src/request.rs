//! Outgoing request type and per-attempt metadata.

use bytes::Bytes;
use http::{HeaderMap, Method, Uri, header};
use smol_str::SmolStr;

/// Mutable per-attempt metadata carried by a request.
///
/// The bag tracks the two recovery budgets independently: the retry
/// attempt count consumed by the retry stage, and the one-shot refresh
/// guard consumed by the auth stage. A refresh-triggered re-send therefore
/// never double-counts against the retry budget, and vice versa.
#[derive(Debug, Clone, Default)]
pub struct AttemptMeta {
    /// Number of retry attempts already consumed for this request.
    pub retry_attempts: u32,
    /// Whether the single token refresh has already been performed.
    pub auth_refreshed: bool,
    /// Bypass the cache stage entirely for this request.
    pub skip_cache: bool,
    /// Arbitrary extra flags set by callers or stages.
    pub flags: Vec<SmolStr>,
}

impl AttemptMeta {
    /// Returns true if the given flag has been set.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    /// Sets a flag if not already present.
    pub fn set_flag(&mut self, flag: impl Into<SmolStr>) {
        let flag = flag.into();
        if !self.has_flag(&flag) {
            self.flags.push(flag);
        }
    }
}

/// An outgoing request owned by a single pipeline invocation.
///
/// Query parameters live in the [`Uri`]. The request is discarded once the
/// exchange completes; only the [`AttemptMeta`] bag is mutated along the
/// way, by the auth and retry stages.
///
/// # Example
///
/// ```
/// use mainstay_core::Request;
///
/// let request = Request::get("https://api.example.com/users?page=2".parse().unwrap())
///     .with_header("accept", "application/json");
/// assert_eq!(request.path(), "/users");
/// assert_eq!(request.uri.query(), Some("page=2"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Target URI, including any query string.
    pub uri: Uri,
    /// Request headers. Header names are case-insensitive per `http`.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
    /// Mutable attempt metadata.
    pub meta: AttemptMeta,
}

impl Request {
    /// Creates a request with the given method and URI.
    pub fn new(method: Method, uri: Uri) -> Self {
        Request {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            meta: AttemptMeta::default(),
        }
    }

    /// Creates a GET request for the given URI.
    pub fn get(uri: Uri) -> Self {
        Self::new(Method::GET, uri)
    }

    /// Creates a POST request for the given URI.
    pub fn post(uri: Uri) -> Self {
        Self::new(Method::POST, uri)
    }

    /// Adds a header, panicking on invalid names/values.
    ///
    /// Builder-style helper for static header literals; use
    /// [`Request::headers`] directly for runtime values.
    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.insert(
            header::HeaderName::from_static(name),
            header::HeaderValue::from_static(value),
        );
        self
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Marks the request to bypass the cache stage.
    pub fn skip_cache(mut self) -> Self {
        self.meta.skip_cache = true;
        self
    }

    /// Returns the URI path component.
    pub fn path(&self) -> &str {
        self.uri.path()
    }
}

//! Cache key extraction from requests.
//!
//! Keys are derived from the method, path, query parameters, and headers,
//! minus volatile headers that would fragment the cache (credentials and
//! per-request noise such as `Authorization` or `Date`). Query pairs are
//! sorted so semantically identical URLs with reordered parameters map to
//! the same key.

use mainstay_core::{CacheKey, KeyPart, KeyParts, Request};
use smol_str::SmolStr;

/// Headers that never contribute to the cache key.
const VOLATILE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "cookie",
    "date",
    "if-none-match",
    "if-modified-since",
];

fn is_volatile(name: &str) -> bool {
    VOLATILE_HEADERS.contains(&name)
}

/// Derives the cache key for a request.
pub fn cache_key_for(request: &Request, prefix: impl Into<SmolStr>, version: u32) -> CacheKey {
    let mut parts = KeyParts::new(request);
    parts.push(KeyPart::new("method", Some(request.method.as_str())));
    parts.push(KeyPart::new("path", Some(request.path())));

    let mut query: Vec<(&str, Option<&str>)> = request
        .uri
        .query()
        .map(parse_query)
        .unwrap_or_default();
    query.sort_unstable();
    for (name, value) in query {
        parts.push(KeyPart::new(format!("q:{name}"), value));
    }

    let mut headers: Vec<(&str, &str)> = request
        .headers
        .iter()
        .filter(|(name, _)| !is_volatile(name.as_str()))
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
        .collect();
    headers.sort_unstable();
    for (name, value) in headers {
        parts.push(KeyPart::new(format!("h:{name}"), Some(value)));
    }

    let (_, key) = parts.into_cache_key(prefix, version);
    key
}

/// Splits a raw query string into name/value pairs.
///
/// Pairs without `=` become valueless parts; no percent-decoding is
/// applied (the raw encoding is as stable as the decoded form).
fn parse_query(raw: &str) -> Vec<(&str, Option<&str>)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (pair, None),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str) -> Request {
        Request::get(uri.parse().unwrap())
    }

    #[test]
    fn key_includes_method_path_and_query() {
        let key = cache_key_for(&request("https://api.test/users?page=2&size=10"), "", 0);
        assert_eq!(
            key.to_string(),
            "method=GET&path=/users&q:page=2&q:size=10"
        );
    }

    #[test]
    fn query_order_does_not_matter() {
        let a = cache_key_for(&request("https://api.test/u?b=2&a=1"), "", 0);
        let b = cache_key_for(&request("https://api.test/u?a=1&b=2"), "", 0);
        assert_eq!(a, b);
    }

    #[test]
    fn volatile_headers_are_excluded() {
        let with_auth = request("https://api.test/users")
            .with_header("authorization", "Bearer secret")
            .with_header("cookie", "session=1")
            .with_header("accept", "application/json");
        let without_auth =
            request("https://api.test/users").with_header("accept", "application/json");

        assert_eq!(
            cache_key_for(&with_auth, "", 0),
            cache_key_for(&without_auth, "", 0)
        );
    }

    #[test]
    fn non_volatile_headers_fragment_the_key() {
        let json = request("https://api.test/users").with_header("accept", "application/json");
        let xml = request("https://api.test/users").with_header("accept", "application/xml");
        assert_ne!(cache_key_for(&json, "", 0), cache_key_for(&xml, "", 0));
    }

    #[test]
    fn prefix_and_version_namespace_the_key() {
        let req = request("https://api.test/users");
        let v0 = cache_key_for(&req, "api", 0);
        let v1 = cache_key_for(&req, "api", 1);
        assert_ne!(v0, v1);
        assert!(v1.to_string().starts_with("api:v1:"));
    }
}

//! Intercepted request identity.

use serde::{Deserialize, Serialize};
use url::Url;

/// A request as seen by the worker: method plus absolute URL.
///
/// Together these form the cache key of any entry stored for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub url: Url,
}

impl Request {
    pub fn new(method: impl Into<String>, url: Url) -> Self {
        Self { method: method.into().to_ascii_uppercase(), url }
    }

    /// Shorthand for a GET request.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// URL path without query or fragment.
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_uppercased() {
        let req = Request::new("get", Url::parse("https://example.com/a").unwrap());
        assert!(req.is_get());
        assert_eq!(req.to_string(), "GET https://example.com/a");
    }

    #[test]
    fn test_post_is_not_get() {
        let req = Request::new("POST", Url::parse("https://example.com/api/v1/cart").unwrap());
        assert!(!req.is_get());
        assert_eq!(req.path(), "/api/v1/cart");
    }
}

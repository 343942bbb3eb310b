//! Request URL resolution against the worker origin.

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a request target into the absolute URL used as its identity.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve paths (`/api/v1/products`) against `origin`
/// 3. Lowercase the host
/// 4. Remove fragment (#...); it never reaches the network
/// 5. Keep query string intact (do not reorder)
pub fn resolve(input: &str, origin: &url::Url) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = if trimmed.contains("://") {
        url::Url::parse(trimmed)
    } else {
        origin.join(trimmed)
    }
    .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> url::Url {
        url::Url::parse("https://y7sauces.com").unwrap()
    }

    #[test]
    fn test_resolve_path_against_origin() {
        let url = resolve("/api/v1/products", &origin()).unwrap();
        assert_eq!(url.as_str(), "https://y7sauces.com/api/v1/products");
    }

    #[test]
    fn test_resolve_root() {
        let url = resolve("/", &origin()).unwrap();
        assert_eq!(url.as_str(), "https://y7sauces.com/");
    }

    #[test]
    fn test_resolve_absolute_keeps_other_origin() {
        let url = resolve("https://CDN.Example.com/fonts/inter.woff2", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
        assert_eq!(url.path(), "/fonts/inter.woff2");
    }

    #[test]
    fn test_resolve_remove_fragment() {
        let url = resolve("/products#reviews", &origin()).unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/products");
    }

    #[test]
    fn test_resolve_preserve_query() {
        let url = resolve("/api/v1/products?b=2&a=1", &origin()).unwrap();
        assert_eq!(url.query(), Some("b=2&a=1"));
    }

    #[test]
    fn test_resolve_trim_whitespace() {
        let url = resolve("  /manifest.json  ", &origin()).unwrap();
        assert_eq!(url.as_str(), "https://y7sauces.com/manifest.json");
    }

    #[test]
    fn test_resolve_unsupported_scheme() {
        let result = resolve("file:///etc/passwd", &origin());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve("", &origin()), Err(UrlError::Empty)));
        assert!(matches!(resolve("   ", &origin()), Err(UrlError::Empty)));
    }
}

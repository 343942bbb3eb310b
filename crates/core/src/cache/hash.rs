//! Request-addressed cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key for a request identity (method + URL).
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_cache_key("GET", "https://example.com/");
        let hash2 = compute_cache_key("GET", "https://example.com/");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_method_case_insensitive() {
        assert_eq!(compute_cache_key("get", "https://example.com/"), compute_cache_key("GET", "https://example.com/"));
    }

    #[test]
    fn test_hash_different_method() {
        let get = compute_cache_key("GET", "https://example.com/");
        let head = compute_cache_key("HEAD", "https://example.com/");
        assert_ne!(get, head);
    }

    #[test]
    fn test_hash_query_is_part_of_identity() {
        let a = compute_cache_key("GET", "https://example.com/api/v1/products?page=1");
        let b = compute_cache_key("GET", "https://example.com/api/v1/products?page=2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_cache_key("GET", "https://example.com/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

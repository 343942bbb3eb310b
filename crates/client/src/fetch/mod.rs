//! Network side of the worker.
//!
//! [`Network`] is the seam strategies fetch through. Only transport failures
//! (DNS, refused connection, timeout, oversized body) are errors; a 404 or a
//! 500 is an ordinary response that strategies return without storing.
//!
//! [`FetchClient`] implements it with reqwest:
//! - rustls, gzip/brotli/deflate decoding
//! - Max redirects: 5 (configurable)
//! - Max body bytes: 10MB (configurable)
//! - No timeout unless one is configured

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, resolve};

use y7_sw_core::{AppConfig, CachedResponse, Error, Request};

/// Source of network responses.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "y7-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: none)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "y7-sw/0.1".to_string(), max_bytes: 10 * 1024 * 1024, timeout: None, max_redirects: 5 }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<CachedResponse, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::InvalidInput(format!("invalid method: {}", request.method)))?;

        let mut response = self
            .http
            .request(method, request.url.clone())
            .send()
            .await
            .map_err(transport_error)?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            // The body below is already decoded, so the wire encoding and length no longer describe it.
            .filter(|(name, _)| *name != header::CONTENT_ENCODING && *name != header::CONTENT_LENGTH)
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
            if body.len() + chunk.len() > self.config.max_bytes {
                return Err(Error::FetchTooLarge(format!("body exceeds {} bytes", self.config.max_bytes)));
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes)",
            request,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(CachedResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn get(server: &MockServer, p: &str) -> Request {
        Request::get(reqwest::Url::parse(&format!("{}{}", server.uri(), p)).unwrap())
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "y7-sw/0.1");
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.timeout, None);
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { timeout_ms: Some(2000), user_agent: "test/1".into(), ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.timeout, Some(Duration::from_millis(2000)));
        assert_eq!(config.user_agent, "test/1");
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/products"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(r#"[{"id":1,"name":"Mango Habanero"}]"#, "application/json"),
            )
            .mount(&server)
            .await;

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let resp = client.fetch(&get(&server, "/api/v1/products")).await.unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.status_text, "OK");
        assert_eq!(resp.content_type(), Some("application/json"));
        assert!(resp.body_text().contains("Mango Habanero"));
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let resp = client.fetch(&get(&server, "/missing")).await.unwrap();
        assert_eq!(resp.status, 404);
    }

    #[tokio::test]
    async fn test_fetch_partial_content_passthrough() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/promo.mp4"))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![0u8; 16]))
            .mount(&server)
            .await;

        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let resp = client.fetch(&get(&server, "/media/promo.mp4")).await.unwrap();
        assert_eq!(resp.status, 206);
        assert!(!resp.is_complete());
    }

    #[tokio::test]
    async fn test_fetch_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 2048]))
            .mount(&server)
            .await;

        let config = FetchConfig { max_bytes: 1024, ..Default::default() };
        let client = FetchClient::new(config).unwrap();
        let result = client.fetch(&get(&server, "/big")).await;
        assert!(matches!(result, Err(Error::FetchTooLarge(_))));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let req = Request::get(reqwest::Url::parse("http://127.0.0.1:1/").unwrap());
        let result = client.fetch(&req).await;
        assert!(matches!(result, Err(ref e) if e.is_network()));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let config = FetchConfig { timeout: Some(Duration::from_millis(200)), ..Default::default() };
        let client = FetchClient::new(config).unwrap();
        let result = client.fetch(&get(&server, "/slow")).await;
        assert!(matches!(result, Err(Error::FetchTimeout(_))));
    }
}

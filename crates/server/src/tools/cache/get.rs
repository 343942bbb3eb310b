//! cache_get tool implementation.
//!
//! Retrieves one stored response by partition and request.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use y7_sw_core::{Error, Request};

use crate::state::WorkerHandle;
use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Partition to look in.
    pub partition: String,

    /// Path (resolved against the worker origin) or absolute URL.
    pub url: String,

    /// HTTP method the entry was stored under (default: GET).
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub partition: String,
    pub method: String,
    pub url: String,
    pub stored_at: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub body_bytes: usize,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &WorkerHandle, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    if params.partition.trim().is_empty() {
        return Err(Error::InvalidInput("partition cannot be empty".into()).into());
    }

    let request = Request::new(&params.method, worker.router.resolve(&params.url)?);
    let entry = worker
        .router
        .cache()
        .get_entry(&params.partition, &request)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{request} in {}", params.partition)))?;

    let output = CacheGetOutput {
        partition: entry.partition,
        method: entry.method,
        url: entry.url,
        stored_at: entry.stored_at,
        status: entry.response.status,
        status_text: entry.response.status_text.clone(),
        body: entry.response.body_text(),
        body_bytes: entry.response.body.len(),
        headers: entry.response.headers,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{handle_for, mount_shell};
    use crate::tools::parse_output;
    use wiremock::MockServer;

    fn params(partition: &str, url: &str) -> CacheGetParams {
        CacheGetParams { partition: partition.into(), url: url.into(), method: default_method() }
    }

    #[tokio::test]
    async fn test_get_impl_missing() {
        let server = MockServer::start().await;
        let worker = handle_for(&server).await;

        let result = get_impl(&worker, params("y7-sauces-v1", "/")).await;
        let err = result.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_empty_partition() {
        let server = MockServer::start().await;
        let worker = handle_for(&server).await;
        assert!(get_impl(&worker, params(" ", "/")).await.is_err());
    }

    #[tokio::test]
    async fn test_get_impl_found_after_install() {
        let server = MockServer::start().await;
        mount_shell(&server).await;
        let worker = handle_for(&server).await;
        worker.router.on_install().await.unwrap();

        let result = get_impl(&worker, params("y7-sauces-v1", "/favicon.ico")).await.unwrap();
        let output: CacheGetOutput = parse_output(&result);
        assert_eq!(output.method, "GET");
        assert_eq!(output.url, format!("{}/favicon.ico", server.uri()));
        assert_eq!(output.status, 200);
        assert_eq!(output.body, "shell /favicon.ico");
        assert!(!output.stored_at.is_empty());
    }
}

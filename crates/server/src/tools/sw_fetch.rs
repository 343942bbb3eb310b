//! sw_fetch tool implementation.
//!
//! Issues a request the way a page would: through the worker when it
//! intercepts, straight to the network when it does not.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use y7_sw_core::{CachedResponse, Error, Request};

use super::json_result;
use crate::state::WorkerHandle;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Path (resolved against the worker origin) or absolute URL.
    pub url: String,

    /// HTTP method (default: GET). Only GET is intercepted.
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    pub method: String,
    /// Whether the worker handled the request.
    pub intercepted: bool,
    /// Resource class, when intercepted.
    pub class: Option<String>,
    /// Strategy used, when intercepted.
    pub strategy: Option<String>,
    /// Partition consulted, when intercepted.
    pub partition: Option<String>,
    /// One of "cache", "network", "offline" or "passthrough".
    pub source: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub body_bytes: usize,
}

fn label<T: Serialize>(value: &T) -> Option<String> {
    serde_json::to_value(value).ok().and_then(|v| v.as_str().map(str::to_string))
}

fn output(request: &Request, response: CachedResponse) -> SwFetchOutput {
    SwFetchOutput {
        url: request.url.to_string(),
        method: request.method.clone(),
        intercepted: false,
        class: None,
        strategy: None,
        partition: None,
        source: "passthrough".into(),
        status: response.status,
        status_text: response.status_text.clone(),
        body: response.body_text(),
        body_bytes: response.body.len(),
        headers: response.headers,
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &WorkerHandle, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }

    let url = worker.router.resolve(&params.url)?;
    let request = Request::new(params.method.trim(), url);

    let result = match worker.router.on_fetch(&request).await {
        Some(routed) => {
            tracing::debug!(%request, class = %routed.class, status = routed.response.status, "served by worker");
            SwFetchOutput {
                intercepted: true,
                class: Some(routed.class.to_string()),
                strategy: label(&routed.strategy),
                partition: Some(routed.partition),
                source: label(&routed.source).unwrap_or_default(),
                ..output(&request, routed.response)
            }
        }
        None => {
            let response = worker.network.fetch(&request).await?;
            output(&request, response)
        }
    };

    json_result(&result)
}

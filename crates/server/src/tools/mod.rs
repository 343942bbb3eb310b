//! MCP tool implementations.
//!
//! This module contains all tools exposed by the y7-sw server: worker
//! lifecycle and events, fetching through the worker, and cache inspection.

pub mod cache;
pub mod events;
pub mod lifecycle;
pub mod sw_fetch;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use y7_sw_core::Error;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) fn parse_output<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}

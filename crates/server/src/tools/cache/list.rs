//! cache_list tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use y7_sw_core::PartitionInfo;

use crate::state::WorkerHandle;
use crate::tools::json_result;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// List the entries of this partition instead of all partitions.
    pub partition: Option<String>,
}

/// Request identity of a stored entry.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntryKey {
    pub method: String,
    pub url: String,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub partitions: Vec<PartitionInfo>,
    /// Entries of the requested partition, ordered by URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<EntryKey>>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(worker: &WorkerHandle, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let cache = worker.router.cache();
    let partitions = cache.list_partitions().await?;

    let entries = match params.partition.as_deref() {
        Some(name) => Some(
            cache
                .entry_keys(name)
                .await?
                .into_iter()
                .map(|(method, url)| EntryKey { method, url })
                .collect(),
        ),
        None => None,
    };

    json_result(&CacheListOutput { partitions, entries })
}

//! cache_purge tool implementation.
//!
//! Deletes whole partitions, or single entries by URL.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use y7_sw_core::{Error, Request};

use crate::state::WorkerHandle;
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Partition to delete, or to delete `url` from.
    pub partition: Option<String>,

    /// Delete the GET entry for this URL (from every partition unless `partition` is set).
    pub url: Option<String>,

    /// Delete every partition.
    #[serde(default)]
    pub all: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    pub deleted_partitions: Vec<String>,
    pub deleted_entries: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(worker: &WorkerHandle, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if !params.all && params.partition.is_none() && params.url.is_none() {
        return Err(Error::InvalidInput("At least one of partition, url, or all must be specified".to_string()).into());
    }

    let cache = worker.router.cache();
    let mut output = CachePurgeOutput::default();

    if params.all {
        for name in cache.partition_names().await? {
            output.deleted_entries += cache.entry_count(&name).await?;
            if cache.delete_partition(&name).await? {
                output.deleted_partitions.push(name);
            }
        }
    } else {
        match (params.partition, params.url) {
            (partition, Some(url)) => {
                let request = Request::get(worker.router.resolve(&url)?);
                let targets = match partition {
                    Some(name) => vec![name],
                    None => cache.partition_names().await?,
                };
                for name in targets {
                    if cache.delete_entry(&name, &request).await? {
                        output.deleted_entries += 1;
                    }
                }
            }
            (Some(name), None) => {
                let entries = cache.entry_count(&name).await?;
                if cache.delete_partition(&name).await? {
                    output.deleted_entries += entries;
                    output.deleted_partitions.push(name);
                }
            }
            (None, None) => {}
        }
    }

    tracing::info!(
        partitions = output.deleted_partitions.len(),
        entries = output.deleted_entries,
        "cache purged"
    );
    json_result(&output)
}

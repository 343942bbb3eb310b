//! sw_install, sw_activate and sw_status tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use y7_sw_client::WorkerState;
use y7_sw_core::PartitionRole;

use super::json_result;
use crate::host::HostLog;
use crate::state::WorkerHandle;

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutput {
    /// Lifecycle state after the install.
    pub state: String,
    /// Partition holding the critical shell.
    pub partition: String,
    /// Number of shell resources now stored.
    pub cached_resources: u64,
}

/// Output from the sw_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateOutput {
    pub state: String,
    /// Stale partitions removed during activation.
    pub deleted_partitions: Vec<String>,
}

/// Output from the sw_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatusOutput {
    pub state: String,
    pub origin: String,
    /// Current partition names: primary, static, dynamic.
    pub partitions: Vec<String>,
    pub host: HostLog,
}

fn state_name(state: WorkerState) -> String {
    serde_json::to_value(state)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{state:?}"))
}

/// Implementation of the sw_install tool.
pub async fn install_impl(worker: &WorkerHandle) -> Result<CallToolResult, McpError> {
    worker.router.on_install().await?;

    let partition = worker.router.partition_name(PartitionRole::Primary).to_string();
    let cached_resources = worker.router.cache().entry_count(&partition).await?;
    let output = InstallOutput { state: state_name(worker.router.state().await), partition, cached_resources };
    json_result(&output)
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(worker: &WorkerHandle) -> Result<CallToolResult, McpError> {
    let deleted_partitions = worker.router.on_activate().await?;
    let output = ActivateOutput { state: state_name(worker.router.state().await), deleted_partitions };
    json_result(&output)
}

/// Implementation of the sw_status tool.
pub async fn status_impl(worker: &WorkerHandle) -> Result<CallToolResult, McpError> {
    let output = StatusOutput {
        state: state_name(worker.router.state().await),
        origin: worker.router.origin().to_string(),
        partitions: worker
            .router
            .config()
            .partitions
            .current()
            .iter()
            .map(|s| s.to_string())
            .collect(),
        host: worker.host.snapshot(),
    };
    json_result(&output)
}

//! sw_push, sw_notification_click and sw_sync tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use y7_sw_client::BACKGROUND_SYNC_TAG;
use y7_sw_core::Error;

use super::json_result;
use crate::state::WorkerHandle;

/// Parameters for the sw_push tool.
///
/// Either send the fields directly or a raw `data` string exactly as the push
/// service would deliver it. `data` wins when both are given.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PushParams {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    /// Raw push message body (JSON or plain text).
    pub data: Option<String>,
}

impl PushParams {
    fn payload(&self) -> Result<Vec<u8>, Error> {
        if let Some(data) = &self.data {
            return Ok(data.clone().into_bytes());
        }
        if self.title.is_none() && self.body.is_none() && self.icon.is_none() {
            return Ok(Vec::new());
        }
        let fields = serde_json::json!({ "title": self.title, "body": self.body, "icon": self.icon });
        Ok(serde_json::to_vec(&fields)?)
    }
}

/// Output from the sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushOutput {
    pub title: String,
    pub body: String,
    pub icon: String,
}

/// Output from the sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickOutput {
    /// Page the host was asked to open.
    pub opened: String,
}

/// Parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    /// Sync tag (default: "background-sync").
    #[serde(default = "default_tag")]
    pub tag: String,
}

fn default_tag() -> String {
    BACKGROUND_SYNC_TAG.into()
}

/// Output from the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncOutput {
    pub tag: String,
    /// Whether the tag triggered deferred work.
    pub handled: bool,
}

/// Implementation of the sw_push tool.
pub async fn push_impl(worker: &WorkerHandle, params: PushParams) -> Result<CallToolResult, McpError> {
    let notification = worker.router.on_push(&params.payload()?).await?;
    let output = PushOutput { title: notification.title, body: notification.body, icon: notification.icon };
    json_result(&output)
}

/// Implementation of the sw_notification_click tool.
pub async fn notification_click_impl(worker: &WorkerHandle) -> Result<CallToolResult, McpError> {
    let opened = worker.router.on_notification_click().await?;
    json_result(&NotificationClickOutput { opened: opened.to_string() })
}

/// Implementation of the sw_sync tool.
pub async fn sync_impl(worker: &WorkerHandle, params: SyncParams) -> Result<CallToolResult, McpError> {
    let handled = worker.router.on_sync(&params.tag).await?;
    json_result(&SyncOutput { tag: params.tag, handled })
}

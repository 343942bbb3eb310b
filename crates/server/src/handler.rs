//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker and cache tools.
use crate::state::WorkerHandle;
use crate::tools::cache::{CacheGetParams, CacheListParams, CachePurgeParams, get_impl, list_impl, purge_impl};
use crate::tools::events::{PushParams, SyncParams, notification_click_impl, push_impl, sync_impl};
use crate::tools::lifecycle::{activate_impl, install_impl, status_impl};
use crate::tools::sw_fetch::{SwFetchParams, fetch_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for y7-sw.
#[derive(Clone)]
pub struct WorkerServer {
    tool_router: ToolRouter<Self>,
    worker: WorkerHandle,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl WorkerServer {
    /// Create a new server handler around a worker.
    pub fn new(worker: WorkerHandle) -> Self {
        Self { tool_router: Self::tool_router(), worker }
    }

    #[tool(description = "Run the install event: pre-cache the critical shell into the primary partition.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Run the activate event: delete partitions from older versions and claim open pages.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    #[tool(description = "Show the worker lifecycle state, current partitions and what it has asked of the host.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }

    /// Fetch through the worker.
    ///
    /// GET requests are routed to a caching strategy once the worker is active;
    /// everything else goes straight to the network.
    #[tool(
        description = "Fetch a URL or site path through the worker. Reports the matched resource class, strategy, partition and whether the answer came from cache, network or the offline fallback."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push message. Missing fields fall back to the default notification.")]
    async fn sw_push(&self, params: Parameters<PushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Click the shown notification: opens the site root.")]
    async fn sw_notification_click(&self) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.worker).await
    }

    #[tool(description = "Fire a background sync event. Only the \"background-sync\" tag runs deferred work.")]
    async fn sw_sync(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "List cache partitions with entry counts, or the entries of one partition.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.worker, params.0).await
    }

    #[tool(description = "Get a stored response by partition and URL.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.worker, params.0).await
    }

    #[tool(description = "Delete a partition, one URL's entries, or every partition.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for WorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "y7-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::handle_for;
    use wiremock::MockServer;

    #[tokio::test]
    async fn test_lists_every_tool() {
        let server = MockServer::start().await;
        let handler = WorkerServer::new(handle_for(&server).await);

        let mut names: Vec<String> = handler.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "cache_get",
                "cache_list",
                "cache_purge",
                "sw_activate",
                "sw_fetch",
                "sw_install",
                "sw_notification_click",
                "sw_push",
                "sw_status",
                "sw_sync",
            ]
        );
        assert_eq!(handler.get_info().server_info.name, "y7-sw");
    }
}

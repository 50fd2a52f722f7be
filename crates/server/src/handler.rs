//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker and its storage.
use std::sync::Arc;

use crate::tools::cache::{CacheGetParams, CacheKeysParams, get_impl, keys_impl};
use crate::tools::fetch::{WorkerFetchParams, fetch_impl};
use crate::tools::lifecycle::{activate_impl, install_impl};
use crate::tools::notify::{NotificationClickParams, WorkerPushParams, click_impl, push_impl};
use crate::tools::queue::{WorkerSyncParams, list_impl, sync_impl};

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
use shelfsync_client::{Fetcher, Worker};

/// The main MCP server handler for shelfsync.
#[derive(Clone)]
pub struct ShelfSyncServer {
    worker: Arc<Worker>,
    /// Fetches requests the worker passes through.
    fetcher: Arc<dyn Fetcher>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ShelfSyncServer {
    pub fn new(worker: Arc<Worker>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { worker, fetcher, tool_router: Self::tool_router() }
    }

    #[tool(description = "Install the worker: create its cache partitions and pre-cache the asset manifest.")]
    async fn worker_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(description = "Activate the installed worker: delete partitions of older versions and claim open pages.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    /// Deliver a fetch event.
    ///
    /// The response source tells whether it came from the network, a cache
    /// partition, the offline page, or the mutation queue.
    #[tool(
        description = "Send a request through the worker. Returns the response and where it came from (network, cache, offline_page, queued)."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, self.fetcher.as_ref(), params.0).await
    }

    #[tool(description = "Deliver a background sync event. The worker's own tag replays queued writes oldest first.")]
    async fn worker_sync(&self, params: Parameters<WorkerSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a push message. Returns the notification the worker showed.")]
    async fn worker_push(&self, params: Parameters<WorkerPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Deliver a notification click. Returns the URL of the window the worker opened.")]
    async fn worker_notification_click(
        &self, params: Parameters<NotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        click_impl(&self.worker, params.0).await
    }

    #[tool(description = "List writes waiting in the durable mutation queue, oldest first.")]
    async fn queue_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.worker).await
    }

    #[tool(description = "Look up a cached response by URL and method without going to the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.worker, params.0).await
    }

    #[tool(description = "List cache partitions with entry counts, or the entries of one partition.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for ShelfSyncServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shelfsync".into(),
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
    use crate::tools::fixtures;

    #[tokio::test]
    async fn test_registers_every_tool() {
        let (worker, fetcher) = fixtures::worker().await;
        let server = ShelfSyncServer::new(worker, fetcher);

        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            [
                "cache_get",
                "cache_keys",
                "queue_list",
                "worker_activate",
                "worker_fetch",
                "worker_install",
                "worker_notification_click",
                "worker_push",
                "worker_sync",
            ]
        );
    }
}

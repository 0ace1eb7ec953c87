//! MCP server handler implementation.
//!
//! This module defines the main server handler that routes tool calls to the
//! controller. Each lifecycle tool fires one platform event; the page tools
//! stand in for a browser tab connected to the controller.
use std::sync::Arc;

use crate::tools::{
    PageConnectParams, PageIdParams, PageInbox, SwFetchParams, SwMessageParams, SwSyncParams,
    cache::{CacheListParams, CacheMatchParams, list_impl, match_impl},
    fetch::fetch_impl,
    lifecycle::{activate_impl, install_impl, sync_impl},
    message::message_impl,
    page::{connect_impl, disconnect_impl, messages_impl},
};
use acqua_client::CacheController;

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

/// The main MCP server handler for acqua-sw.
#[derive(Clone)]
pub struct AcquaServer {
    controller: Arc<CacheController>,
    pages: Arc<PageInbox>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl AcquaServer {
    /// Create a new server handler around a booted controller.
    pub fn new(controller: Arc<CacheController>) -> Self {
        Self { controller, pages: Arc::new(PageInbox::default()), tool_router: Self::tool_router() }
    }

    #[tool(description = "Fire the install event: precache the static asset manifest. Returns cached and failed URLs.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.controller).await
    }

    #[tool(description = "Fire the activate event: delete stale cache stores and claim open pages.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.controller).await
    }

    /// Dispatch a request through the fetch interceptor.
    ///
    /// The result says whether the controller answered, and from where: cache,
    /// network, or an offline fallback.
    #[tool(
        description = "Dispatch a request through the controller's fetch interceptor. Returns the response and whether it came from cache, network, or an offline fallback."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.controller, params.0).await
    }

    #[tool(description = "Fire a background-sync event. Connected pages are told to replay offline writes.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.controller, params.0).await
    }

    #[tool(description = "Post a control message (CLEAR_CACHE or CHECK_UPDATE) and return the controller's reply.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.controller, params.0).await
    }

    #[tool(description = "Look a URL up in the cache stores without touching the network.")]
    async fn cache_match(&self, params: Parameters<CacheMatchParams>) -> Result<CallToolResult, McpError> {
        match_impl(&self.controller, params.0).await
    }

    #[tool(description = "List cache stores in creation order with their entries.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.controller, params.0).await
    }

    #[tool(description = "Connect a page at the given URL. Returns a client id for page_messages and page_disconnect.")]
    async fn page_connect(&self, params: Parameters<PageConnectParams>) -> Result<CallToolResult, McpError> {
        connect_impl(&self.controller, &self.pages, params.0).await
    }

    #[tool(description = "Drain the messages the controller posted to a connected page, such as SYNC_OFFLINE_DATA.")]
    async fn page_messages(&self, params: Parameters<PageIdParams>) -> Result<CallToolResult, McpError> {
        messages_impl(&self.controller, &self.pages, params.0).await
    }

    #[tool(description = "Disconnect a page. It no longer receives messages or counts as a controlled client.")]
    async fn page_disconnect(&self, params: Parameters<PageIdParams>) -> Result<CallToolResult, McpError> {
        disconnect_impl(&self.controller, &self.pages, params.0).await
    }
}

impl ServerHandler for AcquaServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "acqua-sw".into(),
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

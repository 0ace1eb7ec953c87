//! MCP tool implementations.
//!
//! This module contains all tools exposed by the acqua-sw server. Each tool
//! forwards one platform event, one cache query, or one page action to the
//! controller and returns its result as pretty-printed JSON text.

pub mod cache;
pub mod fetch;
pub mod lifecycle;
pub mod message;
pub mod page;

use acqua_core::{Error, Response};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

pub use fetch::SwFetchParams;
pub use lifecycle::SwSyncParams;
pub use message::SwMessageParams;
pub use page::{PageConnectParams, PageIdParams, PageInbox};

/// Bodies larger than this are reported by length only.
const MAX_INLINE_BODY: usize = 64 * 1024;

/// A response as shown to tool callers.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseView {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub response_type: String,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
    /// UTF-8 body, when it is text and small enough to inline.
    pub body: Option<String>,
}

impl From<&Response> for ResponseView {
    fn from(response: &Response) -> Self {
        let body = if response.body.len() <= MAX_INLINE_BODY {
            std::str::from_utf8(&response.body).ok().map(str::to_string)
        } else {
            None
        };

        Self {
            url: response.url.clone(),
            status: response.status,
            status_text: response.status_text.clone(),
            response_type: response.response_type.as_str().to_string(),
            headers: response.headers.clone(),
            body_len: response.body.len(),
            body,
        }
    }
}

/// Serialize a tool output into a successful call result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use acqua_client::controller::testing::app_config;
    use acqua_client::{CacheController, ControllerConfig};
    use acqua_core::CacheDb;
    use rmcp::model::CallToolResult;

    pub(crate) use acqua_client::controller::testing::{StubNetwork, serve_static_assets, url};

    /// A controller over a fresh in-memory store, returned with that store.
    pub(crate) async fn controller(network: Arc<StubNetwork>) -> (Arc<CacheController>, Arc<CacheDb>) {
        let caches = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let config = ControllerConfig::from_app(&app_config()).unwrap();
        (Arc::new(CacheController::new(config, caches.clone(), network)), caches)
    }

    /// Parse the JSON text of a tool result.
    pub(crate) fn output(result: &CallToolResult) -> serde_json::Value {
        let content = serde_json::to_value(&result.content[0]).unwrap();
        let text = content
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}

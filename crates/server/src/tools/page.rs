//! page_connect, page_messages and page_disconnect tool implementations.
//!
//! Lets the MCP caller act as a page: connect under the controller's origin,
//! read the messages the controller posted to it, and go away again. The
//! receiving ends live in a [`PageInbox`] owned by the server.

use std::collections::HashMap;

use acqua_client::{CacheController, ClientReceiver, ControllerMessage};
use acqua_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use super::json_result;

/// Receivers of the pages connected through the page tools, by client id.
#[derive(Debug, Default)]
pub struct PageInbox {
    receivers: Mutex<HashMap<String, ClientReceiver>>,
}

/// Parameters for the page_connect tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageConnectParams {
    /// Absolute URL of the page.
    pub url: String,
}

/// Parameters for the page_messages and page_disconnect tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageIdParams {
    /// Client id returned by page_connect.
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageConnectOutput {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageMessagesOutput {
    pub id: String,
    /// Controller version serving this page, once claimed.
    pub controller: Option<String>,
    /// Messages posted since the last drain, oldest first.
    pub messages: Vec<ControllerMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageDisconnectOutput {
    pub id: String,
    pub disconnected: bool,
}

/// Implementation of the page_connect tool.
pub async fn connect_impl(
    controller: &CacheController, inbox: &PageInbox, params: PageConnectParams,
) -> Result<CallToolResult, McpError> {
    let url = Url::parse(params.url.trim()).map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;

    let (id, rx) = controller.clients().connect(url.clone()).await;
    inbox.receivers.lock().await.insert(id.clone(), rx);
    tracing::info!(client = %id, url = %url, "page connected");

    json_result(&PageConnectOutput { id, url: url.to_string() })
}

/// Implementation of the page_messages tool.
pub async fn messages_impl(
    controller: &CacheController, inbox: &PageInbox, params: PageIdParams,
) -> Result<CallToolResult, McpError> {
    let messages = {
        let mut receivers = inbox.receivers.lock().await;
        let rx = receivers
            .get_mut(&params.id)
            .ok_or_else(|| Error::ClientGone(format!("{}: not connected", params.id)))?;

        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    };

    let controller = controller.clients().get(&params.id).await.and_then(|info| info.controller);

    json_result(&PageMessagesOutput { id: params.id, controller, messages })
}

/// Implementation of the page_disconnect tool.
pub async fn disconnect_impl(
    controller: &CacheController, inbox: &PageInbox, params: PageIdParams,
) -> Result<CallToolResult, McpError> {
    inbox.receivers.lock().await.remove(&params.id);
    let disconnected = controller.clients().disconnect(&params.id).await;
    tracing::info!(client = %params.id, disconnected, "page disconnected");

    json_result(&PageDisconnectOutput { id: params.id, disconnected })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::lifecycle::{SwSyncParams, activate_impl, sync_impl};
    use crate::tools::testing::{StubNetwork, controller, output, url};
    use std::sync::Arc;

    async fn connect(controller: &CacheController, inbox: &PageInbox, path: &str) -> String {
        let json = output(&connect_impl(controller, inbox, PageConnectParams { url: url(path) }).await.unwrap());
        json["id"].as_str().unwrap().to_string()
    }

    fn id(id: &str) -> PageIdParams {
        PageIdParams { id: id.into() }
    }

    #[tokio::test]
    async fn test_connected_page_receives_sync() {
        let (controller, _db) = controller(Arc::new(StubNetwork::default())).await;
        let inbox = PageInbox::default();
        let page = connect(&controller, &inbox, "/").await;

        let sync = output(&sync_impl(&controller, SwSyncParams { tag: None }).await.unwrap());
        assert_eq!(sync["notified"], 1);

        let json = output(&messages_impl(&controller, &inbox, id(&page)).await.unwrap());
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["messages"][0]["type"], "SYNC_OFFLINE_DATA");

        let json = output(&messages_impl(&controller, &inbox, id(&page)).await.unwrap());
        assert!(json["messages"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_activate_claims_connected_page() {
        let (controller, _db) = controller(Arc::new(StubNetwork::default())).await;
        let inbox = PageInbox::default();
        let page = connect(&controller, &inbox, "/index.html").await;

        let json = output(&activate_impl(&controller).await.unwrap());
        assert_eq!(json["claimed"], 1);

        let json = output(&messages_impl(&controller, &inbox, id(&page)).await.unwrap());
        assert_eq!(json["controller"], "fontanelle-napoli-v2.1.0");
    }

    #[tokio::test]
    async fn test_disconnected_page_is_not_notified() {
        let (controller, _db) = controller(Arc::new(StubNetwork::default())).await;
        let inbox = PageInbox::default();
        let page = connect(&controller, &inbox, "/").await;

        let json = output(&disconnect_impl(&controller, &inbox, id(&page)).await.unwrap());
        assert_eq!(json["disconnected"], true);

        let sync = output(&sync_impl(&controller, SwSyncParams { tag: None }).await.unwrap());
        assert_eq!(sync["notified"], 0);
        assert_eq!(sync["failed"], 0);

        let err = messages_impl(&controller, &inbox, id(&page)).await.unwrap_err();
        assert_eq!(err.code.0, -32014);

        let json = output(&disconnect_impl(&controller, &inbox, id(&page)).await.unwrap());
        assert_eq!(json["disconnected"], false);
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let (controller, _db) = controller(Arc::new(StubNetwork::default())).await;
        let inbox = PageInbox::default();

        let err = connect_impl(&controller, &inbox, PageConnectParams { url: "mappa".into() }).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
    }
}

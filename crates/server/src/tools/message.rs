//! sw_message tool implementation.
//!
//! Posts a control message to the controller over a reply channel and returns
//! whatever the controller answers on it.

use acqua_client::{CacheController, ControlReply};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::json_result;

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message payload, e.g. `{"type": "CLEAR_CACHE"}` or `{"type": "CHECK_UPDATE"}`.
    pub data: serde_json::Value,
}

/// Output from the sw_message tool.
#[derive(Debug, Clone, Serialize)]
pub struct SwMessageOutput {
    /// False when the message type is not recognized.
    pub handled: bool,
    /// The reply posted on the channel, if any.
    pub reply: Option<ControlReply>,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(controller: &CacheController, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let (tx, rx) = oneshot::channel();
    let handled = controller.handle_message(&params.data, Some(tx)).await.is_some();
    let reply = rx.await.ok();

    json_result(&SwMessageOutput { handled, reply })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StubNetwork, controller, output, url};
    use acqua_core::Response;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_clear_cache_message() {
        let (controller, db) = controller(Arc::new(StubNetwork::default())).await;
        db.open_store("static-v4").await.unwrap();
        db.open_store("dynamic-v4").await.unwrap();

        let params = SwMessageParams { data: json!({"type": "CLEAR_CACHE"}) };
        let json = output(&message_impl(&controller, params).await.unwrap());

        assert_eq!(json["handled"], true);
        assert_eq!(json["reply"]["success"], true);
        assert!(db.store_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_check_update_message() {
        let network = Arc::new(StubNetwork::default());
        let script = url("/sw.js");
        network.respond(&script, Response::ok(&script, "// v4"));
        let (controller, _db) = controller(network).await;

        let params = SwMessageParams { data: json!({"type": "CHECK_UPDATE"}) };
        let json = output(&message_impl(&controller, params).await.unwrap());

        assert_eq!(json["reply"], json!({"updateAvailable": true}));
    }

    #[tokio::test]
    async fn test_unknown_message() {
        let (controller, _db) = controller(Arc::new(StubNetwork::default())).await;

        let params = SwMessageParams { data: json!({"type": "PING"}) };
        let json = output(&message_impl(&controller, params).await.unwrap());

        assert_eq!(json["handled"], false);
        assert!(json["reply"].is_null());
    }
}

//! sw_install, sw_activate and sw_sync tool implementations.
//!
//! Fire the corresponding lifecycle event on the controller and report what
//! it did. These never fail: the handlers themselves always converge.

use acqua_client::CacheController;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Sync tag (default: the configured sync tag). Other tags are ignored.
    #[serde(default)]
    pub tag: Option<String>,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(controller: &CacheController) -> Result<CallToolResult, McpError> {
    let report = controller.install().await;
    json_result(&report)
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(controller: &CacheController) -> Result<CallToolResult, McpError> {
    let report = controller.activate().await;
    json_result(&report)
}

/// Implementation of the sw_sync tool.
pub async fn sync_impl(controller: &CacheController, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    let tag = params.tag.as_deref().unwrap_or(&controller.config().sync_tag);
    let report = controller.handle_sync(tag).await;
    json_result(&report)
}

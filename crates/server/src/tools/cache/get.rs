//! cache_match tool implementation.
//!
//! Looks a URL up in one store, or in every store in creation order.

use acqua_client::CacheController;
use acqua_core::{Error, http::cache_key};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::tools::{ResponseView, json_result};

/// Parameters for the cache_match tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchParams {
    /// Absolute URL to look up. Fragments are ignored.
    pub url: String,

    /// Restrict the lookup to one store.
    #[serde(default)]
    pub store: Option<String>,
}

/// Output from the cache_match tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheMatchOutput {
    pub found: bool,
    pub response: Option<ResponseView>,
}

/// Implementation of the cache_match tool.
pub async fn match_impl(controller: &CacheController, params: CacheMatchParams) -> Result<CallToolResult, McpError> {
    let url = Url::parse(params.url.trim()).map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;
    let key = cache_key(&url);

    let caches = controller.caches();
    let found = match &params.store {
        Some(store) => caches.match_in(store, &key).await?,
        None => caches.match_any(&key).await?,
    };

    json_result(&CacheMatchOutput { found: found.is_some(), response: found.as_ref().map(ResponseView::from) })
}

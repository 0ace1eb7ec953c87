//! cache_list tool implementation.
//!
//! Lists cache stores in creation order together with their entries.

use acqua_client::CacheController;
use acqua_core::cache::EntryInfo;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// Only list this store.
    #[serde(default)]
    pub store: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreListing {
    pub name: String,
    pub entries: Vec<EntryInfo>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub stores: Vec<StoreListing>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(controller: &CacheController, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let caches = controller.caches();

    let names = match params.store {
        Some(name) => {
            if caches.has(&name).await? { vec![name] } else { Vec::new() }
        }
        None => caches.keys().await?,
    };

    let mut stores = Vec::with_capacity(names.len());
    for name in names {
        let entries = caches.entries(&name).await?;
        stores.push(StoreListing { name, entries });
    }

    json_result(&CacheListOutput { stores })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StubNetwork, controller, serve_static_assets, url};
    use acqua_core::Response;
    use std::sync::Arc;

    fn parse(result: &CallToolResult) -> CacheListOutput {
        serde_json::from_value(crate::tools::testing::output(result)).unwrap()
    }

    #[tokio::test]
    async fn test_list_after_install_and_image_fetch() {
        let network = Arc::new(StubNetwork::default());
        serve_static_assets(&network);
        let photo = url("/images/fontane/castel-nuovo.jpg");
        network.respond(&photo, Response::ok(&photo, "jpeg"));
        let (controller, _db) = controller(network).await;

        controller.install().await;
        let request = acqua_core::Request::parse(&photo)
            .unwrap()
            .with_destination(acqua_core::Destination::Image);
        controller.handle_fetch(&request).await.unwrap();
        controller.settle().await;

        let output = parse(&list_impl(&controller, CacheListParams { store: None }).await.unwrap());

        let names: Vec<&str> = output.stores.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["static-v4", "dynamic-v4"]);
        assert_eq!(output.stores[1].entries.len(), 1);
        assert_eq!(output.stores[1].entries[0].url, photo);
        assert_eq!(output.stores[1].entries[0].body_len, 4);
    }

    #[tokio::test]
    async fn test_list_single_store() {
        let (controller, db) = controller(Arc::new(StubNetwork::default())).await;
        db.open_store("static-v4").await.unwrap();
        db.open_store("dynamic-v4").await.unwrap();

        let output = parse(&list_impl(&controller, CacheListParams { store: Some("dynamic-v4".into()) }).await.unwrap());
        assert_eq!(output.stores.len(), 1);
        assert!(output.stores[0].entries.is_empty());

        let output = parse(&list_impl(&controller, CacheListParams { store: Some("nope".into()) }).await.unwrap());
        assert!(output.stores.is_empty());
    }
}

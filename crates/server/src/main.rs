//! acqua-sw server entry point.
//!
//! Boots the offline cache controller (install, then activate) and exposes it
//! as an MCP server on stdio transport. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use acqua_client::{CacheController, ControllerConfig, FetchClient, FetchConfig};
use acqua_core::{AppConfig, CacheDb};
use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        origin = %config.origin,
        db = %config.db_path.display(),
        version = %config.cache_version,
        "starting acqua-sw on stdio transport"
    );

    let caches = Arc::new(CacheDb::open(&config.db_path).await?);
    let network = Arc::new(FetchClient::new(FetchConfig::from_app(&config)?)?);
    let controller = Arc::new(CacheController::new(ControllerConfig::from_app(&config)?, caches, network));

    controller.install().await;
    controller.activate().await;

    let handler = handler::AcquaServer::new(controller.clone());
    let server = serve_server(handler, stdio()).await?;

    tokio::select! {
        quit = server.waiting() => {
            let reason = quit?;
            tracing::info!(?reason, "client disconnected");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
        }
    }

    controller.settle().await;

    Ok(())
}

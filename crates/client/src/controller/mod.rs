//! The offline cache controller.
//!
//! ### Stores
//! - **static**: the build-time asset manifest, precached at install.
//! - **dynamic**: images fetched at runtime.
//! - Any other store (older versions, the overall app-version tag) is deleted
//!   at activation.
//!
//! ### Events
//! - `install`: best-effort concurrent precache, then skip-waiting.
//! - `activate`: delete stale stores, claim open pages.
//! - `fetch`: route the request (see [`routing`]) and run its strategy.
//! - `sync`: tell every page to replay queued offline writes.
//! - `message`: `CLEAR_CACHE` / `CHECK_UPDATE` commands with optional reply.
//!
//! Work that must outlive a returned response (the dynamic-store write-back)
//! is tracked in a pending set; hosts call [`CacheController::settle`] before
//! tearing the controller down.

pub mod clients;
pub mod intercept;
pub mod lifecycle;
pub mod messaging;
pub mod registration;
pub mod routing;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

use std::future::Future;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::task::JoinSet;
use url::Url;

use crate::fetch::{Network, parse_scope, resolve};
use acqua_core::{AppConfig, CacheStorage, Error, Response};

pub use clients::{ClientInfo, ClientReceiver, Clients};
pub use lifecycle::{ActivateReport, AssetFailure, InstallReport};
pub use messaging::{ControlCommand, ControlReply, ControllerMessage, SyncReport};
pub use registration::{Registration, UpdateCheck, WorkerState};
pub use routing::{BypassRule, PassthroughReason, Route, RoutingPolicy, route};

/// Resolved controller settings.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Origin and scope of the controlled app.
    pub scope: Url,
    /// App-version tag; also identifies the controller to claimed clients.
    pub cache_version: String,
    pub static_cache: String,
    pub dynamic_cache: String,
    /// Manifest entries resolved against the scope, in manifest order.
    pub static_assets: Vec<Url>,
    /// Declared cross-origin assets. Not used for routing.
    pub external_assets: Vec<String>,
    pub bypass_markers: Vec<String>,
    pub offline_document: Url,
    pub script_url: Url,
    pub sync_tag: String,
}

impl ControllerConfig {
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let scope = parse_scope(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let resolve_entry = |entry: &str| resolve(&scope, entry).map_err(|e| Error::InvalidUrl(e.to_string()));

        let static_assets = config
            .static_assets
            .iter()
            .map(|entry| resolve_entry(entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            cache_version: config.cache_version.clone(),
            static_cache: config.static_cache.clone(),
            dynamic_cache: config.dynamic_cache.clone(),
            static_assets,
            external_assets: config.external_assets.clone(),
            bypass_markers: config.bypass_markers.clone(),
            offline_document: resolve_entry(&config.offline_document)?,
            script_url: resolve_entry(&config.script_path)?,
            sync_tag: config.sync_tag.clone(),
            scope,
        })
    }

    /// Stores that survive activation.
    pub fn current_stores(&self) -> [&str; 2] {
        [self.static_cache.as_str(), self.dynamic_cache.as_str()]
    }
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
    /// Synthesized or substituted because the network failed.
    Fallback,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Network => "network",
            Self::Fallback => "fallback",
        }
    }
}

/// Result of intercepting a request.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Not intercepted; the host performs the request itself.
    Passthrough(PassthroughReason),
    /// The controller answers the request.
    Respond { response: Response, source: ResponseSource },
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Passthrough(_) => None,
            Self::Respond { response, .. } => Some(response),
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            Self::Passthrough(_) => None,
            Self::Respond { source, .. } => Some(*source),
        }
    }
}

/// The offline cache controller for one origin.
pub struct CacheController {
    config: ControllerConfig,
    policy: RoutingPolicy,
    caches: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    clients: Arc<Clients>,
    registration: Registration,
    pending: Mutex<JoinSet<()>>,
}

impl CacheController {
    pub fn new(config: ControllerConfig, caches: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Self {
        let policy = RoutingPolicy::from_markers(config.bypass_markers.iter().cloned());
        let clients = Arc::new(Clients::new(config.scope.clone()));
        let registration = Registration::new(config.script_url.clone());

        Self { config, policy, caches, network, clients, registration, pending: Mutex::new(JoinSet::new()) }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    pub fn clients(&self) -> &Arc<Clients> {
        &self.clients
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    pub fn caches(&self) -> &Arc<dyn CacheStorage> {
        &self.caches
    }

    /// Keep the controller alive until `task` finishes, without awaiting it here.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn wait_until<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        while pending.try_join_next().is_some() {}
        pending.spawn(task);
    }

    /// Wait for all work registered through [`wait_until`](Self::wait_until).
    pub async fn settle(&self) {
        let mut pending = {
            let mut guard = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *guard)
        };

        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "pending controller task did not complete");
            }
        }
    }
}

//! Install and activate handlers.
//!
//! Both always converge: install ends in `Installed` with skip-waiting
//! requested, activate ends in `Activated` with pages claimed, whatever
//! individual cache operations did.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use url::Url;

use super::CacheController;
use crate::fetch::Network;
use acqua_core::{CacheStorage, Error, Request, RequestMode};

/// One manifest entry that could not be precached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetFailure {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    /// Entries now in the static store, in manifest order.
    pub cached: Vec<String>,
    pub failed: Vec<AssetFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    /// Stale stores removed.
    pub deleted: Vec<String>,
    /// Pages now controlled by this version.
    pub claimed: usize,
}

impl CacheController {
    /// Handle the install event.
    pub async fn install(&self) -> InstallReport {
        self.registration.begin_install();

        let report = match self.precache().await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, store = %self.config.static_cache, "precache failed");
                InstallReport::default()
            }
        };

        self.registration.finish_install();
        self.registration.skip_waiting();

        tracing::info!(
            cached = report.cached.len(),
            failed = report.failed.len(),
            version = %self.config.cache_version,
            "install complete"
        );

        report
    }

    async fn precache(&self) -> Result<InstallReport, Error> {
        let store = self.config.static_cache.clone();
        self.caches.open(&store).await?;

        let mut join_set = JoinSet::new();
        for (index, url) in self.config.static_assets.iter().cloned().enumerate() {
            let caches = Arc::clone(&self.caches);
            let network = Arc::clone(&self.network);
            let store = store.clone();

            join_set.spawn(async move {
                let result = precache_asset(caches.as_ref(), network.as_ref(), &store, &url).await;
                (index, url, result)
            });
        }

        let mut outcomes = Vec::with_capacity(self.config.static_assets.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::warn!(error = %e, "precache task did not complete"),
            }
        }
        outcomes.sort_by_key(|(index, _, _)| *index);

        let mut report = InstallReport::default();
        for (_, url, result) in outcomes {
            match result {
                Ok(()) => report.cached.push(url.to_string()),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "asset not precached");
                    report.failed.push(AssetFailure { url: url.to_string(), error: e.to_string() });
                }
            }
        }

        Ok(report)
    }

    /// Handle the activate event.
    pub async fn activate(&self) -> ActivateReport {
        self.registration.begin_activate();

        let deleted = match self.delete_stale_stores().await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate cache stores");
                Vec::new()
            }
        };

        let claimed = self.clients.claim(&self.config.cache_version).await;
        self.registration.finish_activate();

        tracing::info!(deleted = deleted.len(), claimed, version = %self.config.cache_version, "activated");

        ActivateReport { deleted, claimed }
    }

    async fn delete_stale_stores(&self) -> Result<Vec<String>, Error> {
        let keep = self.config.current_stores();
        let stale: Vec<String> = self
            .caches
            .keys()
            .await?
            .into_iter()
            .filter(|name| !keep.contains(&name.as_str()))
            .collect();

        let mut deleted = Vec::new();
        for name in stale {
            match self.caches.delete(&name).await {
                Ok(_) => {
                    tracing::info!(store = %name, "deleted stale cache store");
                    deleted.push(name);
                }
                Err(e) => tracing::warn!(store = %name, error = %e, "could not delete cache store"),
            }
        }

        Ok(deleted)
    }
}

/// Fetch one manifest entry in no-cors mode and store it if usable.
async fn precache_asset(
    caches: &dyn CacheStorage, network: &dyn Network, store: &str, url: &Url,
) -> Result<(), Error> {
    let request = Request::get(url.clone()).with_mode(RequestMode::NoCors);
    let response = network.fetch(&request).await?;

    if !(response.is_ok() || response.is_opaque()) {
        return Err(Error::Network(format!("{url}: status {}", response.status)));
    }

    caches.put(store, &request.cache_key(), &response).await
}

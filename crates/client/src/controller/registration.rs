//! Registration lifecycle for the controller.
//!
//! ```text
//! Parsed ── install ──▶ Installing ──▶ Installed ── activate ──▶ Activating ──▶ Activated
//!                                          │
//!                                    skip_waiting: activate without waiting
//!                                    for old-version pages to close
//! ```
//!
//! Update checks fetch the controller script and compare its SHA-256 digest
//! with the last one seen.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::fetch::Network;
use acqua_core::{Error, Request};

/// Controller lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Registered, not yet installing.
    #[default]
    Parsed,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    /// Active and controlling pages.
    Activated,
}

/// Result of an update check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateCheck {
    /// SHA-256 of the script as fetched now.
    pub digest: String,
    /// Whether the script differs from the previously seen version.
    pub changed: bool,
}

#[derive(Debug, Default)]
struct RegistrationState {
    state: WorkerState,
    skip_waiting: bool,
    script_digest: Option<String>,
    last_update_check: Option<DateTime<Utc>>,
}

/// The controller's registration: lifecycle state plus update tracking.
#[derive(Debug)]
pub struct Registration {
    script_url: Url,
    inner: Mutex<RegistrationState>,
}

impl Registration {
    pub fn new(script_url: Url) -> Self {
        Self { script_url, inner: Mutex::new(RegistrationState::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, RegistrationState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn script_url(&self) -> &Url {
        &self.script_url
    }

    pub fn state(&self) -> WorkerState {
        self.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.state() == WorkerState::Activated
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.lock().skip_waiting
    }

    pub fn last_update_check(&self) -> Option<DateTime<Utc>> {
        self.lock().last_update_check
    }

    fn transition(&self, to: WorkerState) {
        let mut inner = self.lock();
        let from = inner.state;
        inner.state = to;
        tracing::info!(?from, ?to, script = %self.script_url, "controller state change");
    }

    pub(crate) fn begin_install(&self) {
        let mut inner = self.lock();
        inner.skip_waiting = false;
        drop(inner);
        self.transition(WorkerState::Installing);
    }

    pub(crate) fn finish_install(&self) {
        self.transition(WorkerState::Installed);
    }

    /// Ask to activate as soon as installation finishes.
    pub fn skip_waiting(&self) {
        self.lock().skip_waiting = true;
    }

    pub(crate) fn begin_activate(&self) {
        self.transition(WorkerState::Activating);
    }

    pub(crate) fn finish_activate(&self) {
        self.lock().skip_waiting = false;
        self.transition(WorkerState::Activated);
    }

    /// Fetch the controller script and compare it with the last version seen.
    ///
    /// The first successful check only records a baseline.
    pub async fn check_update(&self, network: &dyn Network) -> Result<UpdateCheck, Error> {
        let request = Request::get(self.script_url.clone()).with_header("Cache-Control", "no-cache");
        let response = network
            .fetch(&request)
            .await
            .map_err(|e| Error::UpdateFailed(e.to_string()))?;

        if !response.is_ok() {
            return Err(Error::UpdateFailed(format!("{}: status {}", self.script_url, response.status)));
        }

        let digest = hex::encode(Sha256::digest(&response.body));

        let mut inner = self.lock();
        let changed = inner.script_digest.as_ref().is_some_and(|previous| previous != &digest);
        inner.script_digest = Some(digest.clone());
        inner.last_update_check = Some(Utc::now());
        drop(inner);

        if changed {
            tracing::info!(script = %self.script_url, "new controller version available");
        }

        Ok(UpdateCheck { digest, changed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::StubNetwork;
    use acqua_core::Response;

    const SCRIPT: &str = "https://fontanelle.example/sw.js";

    fn registration() -> Registration {
        Registration::new(Url::parse(SCRIPT).unwrap())
    }

    #[test]
    fn test_lifecycle_transitions() {
        let reg = registration();
        assert_eq!(reg.state(), WorkerState::Parsed);

        reg.begin_install();
        assert_eq!(reg.state(), WorkerState::Installing);
        reg.finish_install();
        reg.skip_waiting();
        assert_eq!(reg.state(), WorkerState::Installed);
        assert!(reg.skip_waiting_requested());

        reg.begin_activate();
        assert_eq!(reg.state(), WorkerState::Activating);
        reg.finish_activate();
        assert!(reg.is_active());
        assert!(!reg.skip_waiting_requested());
    }

    #[tokio::test]
    async fn test_check_update_baseline_then_change() {
        let reg = registration();
        let network = StubNetwork::new();

        network.respond(SCRIPT, Response::ok(SCRIPT, "const CACHE = 'v1';"));
        let first = reg.check_update(&network).await.unwrap();
        assert!(!first.changed);
        assert_eq!(first.digest.len(), 64);
        assert!(reg.last_update_check().is_some());

        let same = reg.check_update(&network).await.unwrap();
        assert!(!same.changed);

        network.respond(SCRIPT, Response::ok(SCRIPT, "const CACHE = 'v2';"));
        let changed = reg.check_update(&network).await.unwrap();
        assert!(changed.changed);
        assert_ne!(changed.digest, first.digest);
    }

    #[tokio::test]
    async fn test_check_update_network_failure() {
        let reg = registration();
        let network = StubNetwork::new();
        network.set_offline(true);

        let result = reg.check_update(&network).await;
        assert!(matches!(result, Err(Error::UpdateFailed(_))));
    }

    #[tokio::test]
    async fn test_check_update_bad_status() {
        let reg = registration();
        let network = StubNetwork::new();
        network.respond(SCRIPT, Response::ok(SCRIPT, "").with_status(503, "Service Unavailable"));

        let result = reg.check_update(&network).await;
        assert!(matches!(result, Err(Error::UpdateFailed(msg)) if msg.contains("503")));
    }
}

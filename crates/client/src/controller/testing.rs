//! Test doubles for the controller's collaborators.
//!
//! Compiled for this crate's tests and, with the `test-util` feature, for
//! hosts that test against a controller.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{CacheController, ControllerConfig};
use crate::fetch::Network;
use acqua_core::cache::EntryInfo;
use acqua_core::{AppConfig, CacheDb, CacheStorage, Error, Request, Response};

pub const ORIGIN: &str = "https://fontanelle.example/";

/// Scripted network: fixed responses per URL, everything else unreachable.
#[derive(Default)]
pub struct StubNetwork {
    routes: Mutex<HashMap<String, Response>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: Response) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{url}: offline")));
        }

        self.routes
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .ok_or_else(|| Error::Network(format!("{url}: unreachable")))
    }
}

/// Wraps a real store and counts the calls the controller makes.
pub struct CountingCaches {
    inner: CacheDb,
    pub matches: AtomicUsize,
    pub puts: AtomicUsize,
    broken: AtomicBool,
}

impl CountingCaches {
    pub async fn new() -> Self {
        Self {
            inner: CacheDb::open_in_memory().await.unwrap(),
            matches: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            broken: AtomicBool::new(false),
        }
    }

    pub fn db(&self) -> &CacheDb {
        &self.inner
    }

    /// Make every subsequent call fail.
    pub fn break_storage(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    pub fn match_calls(&self) -> usize {
        self.matches.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), Error> {
        if self.broken.load(Ordering::SeqCst) {
            Err(Error::MigrationFailed("storage unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheStorage for CountingCaches {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.check()?;
        self.inner.open(name).await
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.check()?;
        self.inner.has(name).await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.check()?;
        self.inner.delete(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.check()?;
        self.inner.keys().await
    }

    async fn put(&self, store: &str, url: &str, response: &Response) -> Result<(), Error> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.put(store, url, response).await
    }

    async fn match_in(&self, store: &str, url: &str) -> Result<Option<Response>, Error> {
        self.matches.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.match_in(store, url).await
    }

    async fn match_any(&self, url: &str) -> Result<Option<Response>, Error> {
        self.matches.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.match_any(url).await
    }

    async fn entries(&self, store: &str) -> Result<Vec<EntryInfo>, Error> {
        self.check()?;
        self.inner.entries(store).await
    }

    async fn clear_all(&self) -> Result<u64, Error> {
        self.check()?;
        self.inner.clear_all().await
    }
}

pub fn app_config() -> AppConfig {
    AppConfig { origin: ORIGIN.into(), ..Default::default() }
}

pub fn url(path: &str) -> String {
    format!("{}{}", ORIGIN.trim_end_matches('/'), path)
}

/// A controller over a fresh in-memory store and the given network.
pub async fn controller(network: Arc<StubNetwork>) -> (CacheController, Arc<CountingCaches>) {
    let caches = Arc::new(CountingCaches::new().await);
    let config = ControllerConfig::from_app(&app_config()).unwrap();
    let controller = CacheController::new(config, caches.clone(), network);
    (controller, caches)
}

/// Serve every static asset with a small body derived from its path.
pub fn serve_static_assets(network: &StubNetwork) {
    for path in app_config().static_assets {
        let full = url(&path);
        network.respond(&full, Response::ok(&full, format!("asset:{path}")));
    }
}

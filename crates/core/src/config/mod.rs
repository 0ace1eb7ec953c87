//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (ACQUA_*)
//! 2. TOML config file (if ACQUA_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ACQUA_*)
/// 2. TOML config file (if ACQUA_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding the cache stores.
    ///
    /// Set via ACQUA_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin (and scope) the controller serves, e.g. `https://fontanelle.example/`.
    ///
    /// Set via ACQUA_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path of the controller script, used for update checks.
    #[serde(default = "default_script_path")]
    pub script_path: String,

    /// Overall app/cache version tag. Stores carrying it are stale.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Name of the static (precache) store.
    #[serde(default = "default_static_cache")]
    pub static_cache: String,

    /// Name of the dynamic (runtime) store.
    #[serde(default = "default_dynamic_cache")]
    pub dynamic_cache: String,

    /// Same-origin paths precached at install.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Cross-origin assets the app uses. Declared only; never consulted when routing.
    #[serde(default = "default_external_assets")]
    pub external_assets: Vec<String>,

    /// Substrings that send a request straight to the network.
    #[serde(default = "default_bypass_markers")]
    pub bypass_markers: Vec<String>,

    /// Root document served to offline HTML navigations.
    #[serde(default = "default_offline_document")]
    pub offline_document: String,

    /// Background sync tag that triggers the offline-data broadcast.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via ACQUA_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to buffer per response.
    ///
    /// Set via ACQUA_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum number of redirects the network client follows.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Optional HTTP request timeout in milliseconds. Unset means no timeout.
    ///
    /// Set via ACQUA_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./acqua-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080/".into()
}

fn default_script_path() -> String {
    "/sw.js".into()
}

fn default_cache_version() -> String {
    "fontanelle-napoli-v2.1.0".into()
}

fn default_static_cache() -> String {
    "static-v4".into()
}

fn default_dynamic_cache() -> String {
    "dynamic-v4".into()
}

fn default_static_assets() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/style.css",
        "/app.js",
        "/analytics.js",
        "/firebase-init.js",
        "/manifest.json",
        "/images/icon-192.png",
        "/images/icon-512.png",
        "/images/fontanella.png",
        "/images/background.jpg",
        "/favicon.ico",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_external_assets() -> Vec<String> {
    [
        "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css",
        "https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.css",
        "https://unpkg.com/leaflet.markercluster@1.5.3/dist/MarkerCluster.Default.css",
        "https://fonts.googleapis.com/css2?family=Roboto:wght@400;500;700&display=swap",
        "https://raw.githubusercontent.com/pointhi/leaflet-color-markers/master/img/marker-icon-blue.png",
        "https://raw.githubusercontent.com/pointhi/leaflet-color-markers/master/img/marker-shadow.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_bypass_markers() -> Vec<String> {
    [
        "firestore.googleapis.com",
        "firebase",
        "nominatim.openstreetmap.org",
        "gstatic.com/firebasejs",
        "google-analytics.com",
        "googleapis.com",
        "/analytics",
        "/firestore",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_offline_document() -> String {
    "/index.html".into()
}

fn default_sync_tag() -> String {
    "sync-data".into()
}

fn default_user_agent() -> String {
    "acqua-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_max_redirects() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            script_path: default_script_path(),
            cache_version: default_cache_version(),
            static_cache: default_static_cache(),
            dynamic_cache: default_dynamic_cache(),
            static_assets: default_static_assets(),
            external_assets: default_external_assets(),
            bypass_markers: default_bypass_markers(),
            offline_document: default_offline_document(),
            sync_tag: default_sync_tag(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            max_redirects: default_max_redirects(),
            timeout_ms: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `ACQUA_`
    /// 2. TOML file from `ACQUA_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ACQUA_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ACQUA_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The two store names that survive activation.
    pub fn current_stores(&self) -> [&str; 2] {
        [self.static_cache.as_str(), self.dynamic_cache.as_str()]
    }
}

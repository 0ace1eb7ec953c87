//! Network access for the controller.
//!
//! ### The `Network` seam
//! - The controller only ever talks to the network through [`Network`], so
//!   strategies can be exercised with scripted responses.
//!
//! ### `FetchClient`
//! - reqwest with rustls, gzip/brotli/deflate, and a redirect cap.
//! - Non-2xx statuses are responses, not errors; only transport failures
//!   (offline, DNS, TLS, reset) and oversize bodies are `Err`.
//! - `no-cors` requests to another origin come back as opaque responses.
//! - No timeout unless one is configured.

pub mod url;

use async_trait::async_trait;
use reqwest::Url;
use reqwest::Client;
use std::time::{Duration, Instant};

pub use self::url::{PRIVILEGED_SCHEMES, UrlError, is_privileged_scheme, is_same_origin, parse_scope, resolve};

use acqua_core::{AppConfig, Error, Request, RequestMode, Response, ResponseType};

/// Something that can turn a request into a response.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "acqua-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Optional request timeout (default: none)
    pub timeout: Option<Duration>,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Origin of the controlled app; decides basic vs. cors/opaque responses.
    pub origin: Option<Url>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "acqua-sw/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: None,
            max_redirects: 5,
            origin: None,
        }
    }
}

impl FetchConfig {
    /// Build the fetch configuration from application settings.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = parse_scope(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
            origin: Some(origin),
        })
    }
}

/// HTTP client backing the controller's network access.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn response_type(&self, request: &Request, final_url: &Url) -> ResponseType {
        let same_origin = self
            .config
            .origin
            .as_ref()
            .map(|origin| is_same_origin(origin, final_url))
            .unwrap_or(false);

        match (same_origin, request.mode) {
            (true, _) => ResponseType::Basic,
            (false, RequestMode::NoCors) => ResponseType::Opaque,
            (false, _) => ResponseType::Cors,
        }
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("{}: {}", request.url, e)))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let response_type = self.response_type(request, &final_url);
        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} {} in {}ms ({} bytes, {})",
            request.url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len(),
            response_type.as_str()
        );

        if response_type == ResponseType::Opaque {
            // Opaque responses hide status and headers but keep the body for replay.
            return Ok(Response {
                url: final_url.to_string(),
                status: 0,
                status_text: String::new(),
                response_type,
                headers: Vec::new(),
                body: bytes,
            });
        }

        Ok(Response {
            url: final_url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            response_type,
            headers,
            body: bytes,
        })
    }
}

/// `Accept` value browsers send for navigations.
pub const NAVIGATION_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "acqua-sw/0.1");
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.timeout, None);
        assert_eq!(config.max_redirects, 5);
        assert!(config.origin.is_none());
    }

    #[test]
    fn test_fetch_config_from_app() {
        let app = AppConfig {
            origin: "https://fontanelle.example".into(),
            timeout_ms: Some(2_000),
            ..Default::default()
        };
        let config = FetchConfig::from_app(&app).unwrap();
        assert_eq!(config.origin.unwrap().as_str(), "https://fontanelle.example/");
        assert_eq!(config.timeout, Some(Duration::from_millis(2_000)));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let config = FetchConfig::default();
        let client = FetchClient::new(config);
        assert!(client.is_ok());
    }

    #[test]
    fn test_response_type_classification() {
        let origin = Url::parse("https://fontanelle.example/").unwrap();
        let client = FetchClient::new(FetchConfig { origin: Some(origin), ..Default::default() }).unwrap();

        let same = Request::parse("https://fontanelle.example/app.js").unwrap();
        let cross = Url::parse("https://unpkg.com/leaflet@1.9.4/dist/leaflet.css").unwrap();
        let no_cors = Request::get(cross.clone()).with_mode(RequestMode::NoCors);
        let cors = Request::get(cross.clone());

        assert_eq!(client.response_type(&same, &same.url), ResponseType::Basic);
        assert_eq!(client.response_type(&no_cors, &cross), ResponseType::Opaque);
        assert_eq!(client.response_type(&cors, &cross), ResponseType::Cors);
    }
}

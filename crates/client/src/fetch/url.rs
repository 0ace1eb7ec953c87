//! URL helpers for the controller's scope: parsing the origin, resolving
//! manifest paths against it, and classifying request schemes.

use url::Url;

/// Schemes the controller never intercepts: browser-internal, extension,
/// and inline/local resources that cannot or should not be cached.
pub const PRIVILEGED_SCHEMES: &[&str] = &[
    "chrome-extension",
    "moz-extension",
    "safari-extension",
    "safari-web-extension",
    "chrome",
    "edge",
    "about",
    "data",
    "blob",
    "file",
    "javascript",
];

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse the controller's origin/scope URL.
///
/// The result always has an http(s) scheme, no fragment, and a path ending in
/// `/` so relative manifest entries resolve inside the scope.
pub fn parse_scope(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);
    parsed.set_query(None);
    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }

    Ok(parsed)
}

/// Resolve a manifest entry (`/style.css`, `./app.js`, or absolute) against the scope.
pub fn resolve(scope: &Url, entry: &str) -> Result<Url, UrlError> {
    let trimmed = entry.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }
    let mut url = scope.join(trimmed).map_err(|e| UrlError::InvalidUrl(format!("{trimmed}: {e}")))?;
    url.set_fragment(None);
    Ok(url)
}

/// Whether the URL's scheme is one the controller must leave alone.
pub fn is_privileged_scheme(url: &Url) -> bool {
    let scheme = url.scheme();
    PRIVILEGED_SCHEMES.contains(&scheme) || !matches!(scheme, "http" | "https")
}

pub fn is_same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

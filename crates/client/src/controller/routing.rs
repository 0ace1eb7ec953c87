//! Per-request routing decision.
//!
//! `route` is a pure function of the request and the policy: it never touches
//! caches or the network, so the whole decision table is testable on its own.
//! Rules apply in order; the first that matches wins.
//!
//! 1. non-`GET` → [`Route::Passthrough`]
//! 2. privileged scheme → [`Route::Passthrough`]
//! 3. bypass marker anywhere in the href → [`Route::NetworkOnly`]
//! 4. `destination == image` → [`Route::ImageCacheFirst`]
//! 5. everything else → [`Route::CacheFirst`]

use acqua_core::{Destination, Request};
use serde::Serialize;

use crate::fetch::is_privileged_scheme;

/// Why a request was left to default networking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassthroughReason {
    Method,
    Scheme,
}

impl PassthroughReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Scheme => "scheme",
        }
    }
}

/// What the interceptor should do with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Do not respond; the host's default networking applies.
    Passthrough(PassthroughReason),
    /// Forward to the network; never read or write a cache.
    NetworkOnly,
    /// Cache-first, write successful network responses into the dynamic store,
    /// 404 sentinel when the network fails.
    ImageCacheFirst,
    /// Cache-first without write-back; offline HTML falls back to the root document.
    CacheFirst,
}

/// A request that must always hit the live backend.
///
/// Matches when the marker occurs anywhere in the full href, so a marker
/// written as a host (`nominatim.openstreetmap.org`) also matches in paths
/// and query strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BypassRule {
    marker: String,
}

impl BypassRule {
    pub fn new(marker: impl Into<String>) -> Self {
        Self { marker: marker.into() }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn matches(&self, href: &str) -> bool {
        !self.marker.is_empty() && href.contains(&self.marker)
    }
}

/// Inputs to the routing decision.
#[derive(Debug, Clone, Default)]
pub struct RoutingPolicy {
    pub bypass: Vec<BypassRule>,
}

impl RoutingPolicy {
    pub fn from_markers<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { bypass: markers.into_iter().map(BypassRule::new).collect() }
    }

    /// First bypass rule matching the request, if any.
    pub fn bypass_rule(&self, request: &Request) -> Option<&BypassRule> {
        let href = request.url.as_str();
        self.bypass.iter().find(|rule| rule.matches(href))
    }
}

/// Decide how to handle `request`.
pub fn route(request: &Request, policy: &RoutingPolicy) -> Route {
    if !request.is_get() {
        return Route::Passthrough(PassthroughReason::Method);
    }

    if is_privileged_scheme(&request.url) {
        return Route::Passthrough(PassthroughReason::Scheme);
    }

    if policy.bypass_rule(request).is_some() {
        return Route::NetworkOnly;
    }

    match request.destination {
        Destination::Image => Route::ImageCacheFirst,
        _ => Route::CacheFirst,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acqua_core::AppConfig;

    fn policy() -> RoutingPolicy {
        RoutingPolicy::from_markers(AppConfig::default().bypass_markers)
    }

    fn get(url: &str) -> Request {
        Request::parse(url).unwrap()
    }

    #[test]
    fn test_non_get_passes_through() {
        for method in ["POST", "PUT", "DELETE", "PATCH", "HEAD"] {
            let req = get("https://fontanelle.example/index.html").with_method(method);
            assert_eq!(route(&req, &policy()), Route::Passthrough(PassthroughReason::Method), "{method}");
        }
    }

    #[test]
    fn test_method_filter_precedes_bypass() {
        let req = get("https://firestore.googleapis.com/v1/projects/fontanelle/documents:commit").with_method("POST");
        assert_eq!(route(&req, &policy()), Route::Passthrough(PassthroughReason::Method));
    }

    #[test]
    fn test_privileged_scheme_passes_through() {
        let req = get("chrome-extension://abcdef/content.js");
        assert_eq!(route(&req, &policy()), Route::Passthrough(PassthroughReason::Scheme));

        let req = get("data:image/png;base64,iVBORw0KGgo=").with_destination(Destination::Image);
        assert_eq!(route(&req, &policy()), Route::Passthrough(PassthroughReason::Scheme));
    }

    #[test]
    fn test_backend_urls_go_to_network() {
        for url in [
            "https://firestore.googleapis.com/v1/projects/fontanelle/databases/(default)/documents/fontane",
            "https://fontanelle-napoli.firebaseapp.com/__/auth/handler",
            "https://nominatim.openstreetmap.org/reverse?lat=40.85&lon=14.26&format=json",
            "https://www.gstatic.com/firebasejs/10.7.1/firebase-analytics.js",
            "https://www.google-analytics.com/g/collect?v=2",
            "https://fontanelle.example/analytics/events",
            "https://fontanelle.example/firestore/sync",
        ] {
            assert_eq!(route(&get(url), &policy()), Route::NetworkOnly, "{url}");
        }
    }

    #[test]
    fn test_bypass_matches_anywhere_in_href() {
        let req = get("https://fontanelle.example/proxy?target=nominatim.openstreetmap.org");
        assert_eq!(route(&req, &policy()), Route::NetworkOnly);
    }

    #[test]
    fn test_bypass_wins_over_image_destination() {
        let req = get("https://firebasestorage.googleapis.com/v0/b/fontanelle/o/foto.jpg")
            .with_destination(Destination::Image);
        assert_eq!(route(&req, &policy()), Route::NetworkOnly);
    }

    #[test]
    fn test_images_use_image_strategy() {
        let req = get("https://fontanelle.example/images/fontanella.png").with_destination(Destination::Image);
        assert_eq!(route(&req, &policy()), Route::ImageCacheFirst);

        let req = get("https://raw.githubusercontent.com/pointhi/leaflet-color-markers/master/img/marker-icon-blue.png")
            .with_destination(Destination::Image);
        assert_eq!(route(&req, &policy()), Route::ImageCacheFirst);
    }

    #[test]
    fn test_everything_else_is_cache_first() {
        for (url, destination) in [
            ("https://fontanelle.example/", Destination::Document),
            ("https://fontanelle.example/style.css", Destination::Style),
            ("https://fontanelle.example/app.js", Destination::Script),
            ("https://fontanelle.example/manifest.json", Destination::Manifest),
            ("https://unpkg.com/leaflet@1.9.4/dist/leaflet.css", Destination::Style),
        ] {
            let req = get(url).with_destination(destination);
            assert_eq!(route(&req, &policy()), Route::CacheFirst, "{url}");
        }
    }

    #[test]
    fn test_empty_marker_never_matches() {
        let policy = RoutingPolicy::from_markers([""]);
        assert_eq!(route(&get("https://fontanelle.example/app.js"), &policy), Route::CacheFirst);
    }

    #[test]
    fn test_bypass_rule_reports_marker() {
        let req = get("https://nominatim.openstreetmap.org/search?q=napoli");
        let rule = policy().bypass_rule(&req).cloned().unwrap();
        assert_eq!(rule.marker(), "nominatim.openstreetmap.org");
    }
}

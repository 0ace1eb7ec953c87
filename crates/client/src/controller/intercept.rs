//! Fetch interception: run the strategy [`route`] picks for each request.

use std::sync::Arc;

use acqua_core::{Error, Request, Response};

use super::{CacheController, FetchOutcome, ResponseSource, Route, route};

impl CacheController {
    /// Handle one intercepted request.
    ///
    /// Errors only when the controller answers the request and has nothing to
    /// answer with: a network-only request that failed, or a cache-first miss
    /// with the network down and no offline document applicable.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        let decision = route(request, &self.policy);
        tracing::debug!(url = %request.url, ?decision, "intercepted request");

        match decision {
            Route::Passthrough(reason) => Ok(FetchOutcome::Passthrough(reason)),
            Route::NetworkOnly => {
                let response = self.network.fetch(request).await?;
                Ok(FetchOutcome::Respond { response, source: ResponseSource::Network })
            }
            Route::ImageCacheFirst => Ok(self.image_cache_first(request).await),
            Route::CacheFirst => self.cache_first(request).await,
        }
    }

    async fn lookup(&self, request: &Request) -> Option<Response> {
        match self.caches.match_any(&request.cache_key()).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed, treating as miss");
                None
            }
        }
    }

    async fn image_cache_first(&self, request: &Request) -> FetchOutcome {
        if let Some(response) = self.lookup(request).await {
            return FetchOutcome::Respond { response, source: ResponseSource::Cache };
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.write_back(request.cache_key(), response.clone());
                }
                FetchOutcome::Respond { response, source: ResponseSource::Network }
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "image unavailable offline");
                FetchOutcome::Respond { response: Response::not_found(), source: ResponseSource::Fallback }
            }
        }
    }

    /// Store a fetched image in the dynamic store without delaying the response.
    fn write_back(&self, key: String, response: Response) {
        let caches = Arc::clone(&self.caches);
        let store = self.config.dynamic_cache.clone();

        self.wait_until(async move {
            if let Err(e) = caches.put(&store, &key, &response).await {
                tracing::warn!(url = %key, store = %store, error = %e, "dynamic cache write failed");
            }
        });
    }

    async fn cache_first(&self, request: &Request) -> Result<FetchOutcome, Error> {
        if let Some(response) = self.lookup(request).await {
            return Ok(FetchOutcome::Respond { response, source: ResponseSource::Cache });
        }

        let error = match self.network.fetch(request).await {
            Ok(response) => return Ok(FetchOutcome::Respond { response, source: ResponseSource::Network }),
            Err(e) => e,
        };

        if !request.accepts("text/html") {
            return Err(error);
        }

        let document = acqua_core::http::cache_key(&self.config.offline_document);
        match self.caches.match_any(&document).await {
            Ok(Some(response)) => {
                tracing::info!(url = %request.url, "serving offline document");
                Ok(FetchOutcome::Respond { response, source: ResponseSource::Fallback })
            }
            Ok(None) => Err(error),
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "offline document lookup failed");
                Err(error)
            }
        }
    }
}

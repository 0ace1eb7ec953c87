//! The cache-storage seam the controller is written against.

use async_trait::async_trait;

use super::connection::CacheDb;
use super::stores::EntryInfo;
use crate::Error;
use crate::http::Response;

/// Named cache stores, as seen by the controller.
///
/// Implemented by [`CacheDb`]; tests wrap it to observe which calls the
/// controller makes.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the store if it does not exist.
    async fn open(&self, name: &str) -> Result<(), Error>;

    async fn has(&self, name: &str) -> Result<bool, Error>;

    /// Delete a store with all its entries. False if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Store names in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    async fn put(&self, store: &str, url: &str, response: &Response) -> Result<(), Error>;

    async fn match_in(&self, store: &str, url: &str) -> Result<Option<Response>, Error>;

    /// Store-agnostic lookup; stores are searched in creation order.
    async fn match_any(&self, url: &str) -> Result<Option<Response>, Error>;

    async fn entries(&self, store: &str) -> Result<Vec<EntryInfo>, Error>;

    /// Delete every store. Returns how many existed.
    async fn clear_all(&self) -> Result<u64, Error>;
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.open_store(name).await
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        self.has_store(name).await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.delete_store(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.store_names().await
    }

    async fn put(&self, store: &str, url: &str, response: &Response) -> Result<(), Error> {
        self.put_entry(store, url, response).await
    }

    async fn match_in(&self, store: &str, url: &str) -> Result<Option<Response>, Error> {
        self.match_in_store(store, url).await
    }

    async fn match_any(&self, url: &str) -> Result<Option<Response>, Error> {
        self.match_any_store(url).await
    }

    async fn entries(&self, store: &str) -> Result<Vec<EntryInfo>, Error> {
        self.list_entries(store).await
    }

    async fn clear_all(&self) -> Result<u64, Error> {
        self.delete_all_stores().await
    }
}

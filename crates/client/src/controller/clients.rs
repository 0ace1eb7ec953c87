//! Page clients connected to the controller.
//!
//! A page connects with its URL and receives controller messages on an
//! unbounded channel. `claim` marks every same-origin client as controlled by
//! the active controller version without the page reloading.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, mpsc};
use url::Url;

use super::messaging::ControllerMessage;
use crate::fetch::is_same_origin;
use acqua_core::Error;

/// Receiving end a page holds for controller messages.
pub type ClientReceiver = mpsc::UnboundedReceiver<ControllerMessage>;

#[derive(Debug)]
struct ClientEntry {
    url: Url,
    controller: Option<String>,
    tx: mpsc::UnboundedSender<ControllerMessage>,
}

/// Snapshot of one connected client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub id: String,
    pub url: Url,
    /// Controller version serving this client, if claimed.
    pub controller: Option<String>,
}

/// Registry of page clients within the controller's origin.
#[derive(Debug)]
pub struct Clients {
    origin: Url,
    next_id: AtomicU64,
    clients: RwLock<HashMap<String, ClientEntry>>,
}

impl Clients {
    pub fn new(origin: Url) -> Self {
        Self { origin, next_id: AtomicU64::new(1), clients: RwLock::new(HashMap::new()) }
    }

    /// Connect a page; returns its id and the channel it receives messages on.
    pub async fn connect(&self, url: Url) -> (String, ClientReceiver) {
        let id = format!("client-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients
            .write()
            .await
            .insert(id.clone(), ClientEntry { url, controller: None, tx });
        tracing::debug!(client = %id, "page client connected");
        (id, rx)
    }

    pub async fn disconnect(&self, id: &str) -> bool {
        self.clients.write().await.remove(id).is_some()
    }

    pub async fn get(&self, id: &str) -> Option<ClientInfo> {
        self.clients.read().await.get(id).map(|entry| ClientInfo {
            id: id.to_string(),
            url: entry.url.clone(),
            controller: entry.controller.clone(),
        })
    }

    /// Every connected same-origin client, ordered by id.
    pub async fn match_all(&self) -> Vec<ClientInfo> {
        let clients = self.clients.read().await;
        let mut matched: Vec<ClientInfo> = clients
            .iter()
            .filter(|(_, entry)| is_same_origin(&self.origin, &entry.url))
            .map(|(id, entry)| ClientInfo { id: id.clone(), url: entry.url.clone(), controller: entry.controller.clone() })
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        matched
    }

    /// Take control of every same-origin client. Returns how many were claimed.
    ///
    /// Clients whose receiver is gone are dropped from the registry first.
    pub async fn claim(&self, version: &str) -> usize {
        let mut clients = self.clients.write().await;
        clients.retain(|id, entry| {
            let open = !entry.tx.is_closed();
            if !open {
                tracing::debug!(client = %id, "pruning closed page client");
            }
            open
        });

        let mut claimed = 0;
        for entry in clients.values_mut() {
            if is_same_origin(&self.origin, &entry.url) {
                entry.controller = Some(version.to_string());
                claimed += 1;
            }
        }
        claimed
    }

    /// Deliver a message to one client.
    pub async fn post_message(&self, id: &str, message: ControllerMessage) -> Result<(), Error> {
        let clients = self.clients.read().await;
        let entry = clients
            .get(id)
            .ok_or_else(|| Error::ClientGone(format!("{id}: not connected")))?;
        entry
            .tx
            .send(message)
            .map_err(|_| Error::ClientGone(format!("{id}: receiver dropped")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://fontanelle.example/").unwrap()
    }

    fn page(path: &str) -> Url {
        origin().join(path).unwrap()
    }

    fn sync_message() -> ControllerMessage {
        ControllerMessage::SyncOfflineData { timestamp: "2026-10-18T09:00:00Z".into() }
    }

    #[tokio::test]
    async fn test_connect_and_match_all() {
        let clients = Clients::new(origin());
        let (a, _rx_a) = clients.connect(page("/")).await;
        let (b, _rx_b) = clients.connect(page("/admin.html")).await;

        let ids: Vec<String> = clients.match_all().await.into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[tokio::test]
    async fn test_match_all_excludes_other_origins() {
        let clients = Clients::new(origin());
        clients.connect(page("/")).await;
        clients.connect(Url::parse("https://other.example/").unwrap()).await;

        assert_eq!(clients.match_all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_claim_sets_controller() {
        let clients = Clients::new(origin());
        let (id, _rx) = clients.connect(page("/")).await;
        assert_eq!(clients.get(&id).await.unwrap().controller, None);

        assert_eq!(clients.claim("fontanelle-napoli-v2.1.0").await, 1);
        assert_eq!(clients.get(&id).await.unwrap().controller.as_deref(), Some("fontanelle-napoli-v2.1.0"));
    }

    #[tokio::test]
    async fn test_post_message_delivers() {
        let clients = Clients::new(origin());
        let (id, mut rx) = clients.connect(page("/")).await;

        clients.post_message(&id, sync_message()).await.unwrap();

        assert_eq!(rx.recv().await, Some(sync_message()));
    }

    #[tokio::test]
    async fn test_post_message_to_dropped_receiver() {
        let clients = Clients::new(origin());
        let (id, rx) = clients.connect(page("/")).await;
        drop(rx);

        let result = clients.post_message(&id, sync_message()).await;
        assert!(matches!(result, Err(Error::ClientGone(_))));
    }

    #[tokio::test]
    async fn test_claim_prunes_closed_clients() {
        let clients = Clients::new(origin());
        let (_open, _rx) = clients.connect(page("/")).await;
        let (closed, rx) = clients.connect(page("/mappa.html")).await;
        drop(rx);

        assert_eq!(clients.claim("fontanelle-napoli-v2.1.0").await, 1);
        assert!(clients.get(&closed).await.is_none());
        assert_eq!(clients.match_all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect() {
        let clients = Clients::new(origin());
        let (id, _rx) = clients.connect(page("/")).await;

        assert!(clients.disconnect(&id).await);
        assert!(!clients.disconnect(&id).await);
        assert!(clients.match_all().await.is_empty());
    }
}

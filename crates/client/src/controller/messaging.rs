//! Background sync and page ↔ controller messages.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::CacheController;
use acqua_core::Error;

/// Message the controller posts to page clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControllerMessage {
    /// Replay writes queued while offline.
    SyncOfflineData { timestamp: String },
}

/// Command a page sends to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlCommand {
    ClearCache,
    CheckUpdate,
}

/// Reply to a [`ControlCommand`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlReply {
    ClearCache {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    CheckUpdate {
        #[serde(rename = "updateAvailable")]
        update_available: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub tag: String,
    /// Pages the sync message was delivered to.
    pub notified: usize,
    /// Pages that went away before delivery.
    pub failed: usize,
}

impl CacheController {
    /// Handle a background-sync event. Never fails.
    pub async fn handle_sync(&self, tag: &str) -> SyncReport {
        let mut report = SyncReport { tag: tag.to_string(), ..Default::default() };

        if tag != self.config.sync_tag {
            tracing::debug!(tag, "ignoring unknown sync tag");
            return report;
        }

        let clients = self.clients.match_all().await;
        if clients.is_empty() {
            tracing::debug!(tag, "no pages to notify");
            return report;
        }

        let message = ControllerMessage::SyncOfflineData {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };

        for client in &clients {
            match self.clients.post_message(&client.id, message.clone()).await {
                Ok(()) => report.notified += 1,
                Err(e) => {
                    tracing::warn!(client = %client.id, error = %e, "sync message not delivered");
                    report.failed += 1;
                    if matches!(e, Error::ClientGone(_)) {
                        self.clients.disconnect(&client.id).await;
                    }
                }
            }
        }

        tracing::info!(tag, notified = report.notified, failed = report.failed, "offline sync requested");
        report
    }

    /// Handle a page message.
    ///
    /// Unrecognized payloads are ignored and yield `None`. For recognized
    /// commands the reply is sent on `reply` when one was supplied, and also
    /// returned.
    pub async fn handle_message(
        &self, data: &serde_json::Value, reply: Option<oneshot::Sender<ControlReply>>,
    ) -> Option<ControlReply> {
        let command = match ControlCommand::deserialize(data) {
            Ok(command) => command,
            Err(_) => {
                tracing::debug!(%data, "ignoring unrecognized message");
                return None;
            }
        };

        let answer = match command {
            ControlCommand::ClearCache => self.clear_cache().await,
            ControlCommand::CheckUpdate => self.check_update().await,
        };

        if let Some(port) = reply
            && port.send(answer.clone()).is_err()
        {
            tracing::debug!(?command, "reply port closed before answer");
        }

        Some(answer)
    }

    async fn clear_cache(&self) -> ControlReply {
        match self.caches.clear_all().await {
            Ok(count) => {
                tracing::info!(deleted = count, "all cache stores cleared");
                ControlReply::ClearCache { success: true, message: Some("Cache cleared".to_string()), error: None }
            }
            Err(e) => {
                tracing::error!(error = %e, "clearing cache stores failed");
                ControlReply::ClearCache { success: false, message: None, error: Some(e.to_string()) }
            }
        }
    }

    async fn check_update(&self) -> ControlReply {
        match self.registration.check_update(self.network.as_ref()).await {
            Ok(check) => {
                tracing::info!(changed = check.changed, digest = %check.digest, "update check complete");
                ControlReply::CheckUpdate { update_available: true, error: None }
            }
            Err(e) => {
                tracing::warn!(error = %e, "update check failed");
                ControlReply::CheckUpdate { update_available: false, error: Some(e.to_string()) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::{StubNetwork, controller, serve_static_assets, url};
    use acqua_core::Response;
    use serde_json::json;
    use std::sync::Arc;
    use url::Url;

    fn page(path: &str) -> Url {
        Url::parse(&url(path)).unwrap()
    }

    #[test]
    fn test_message_wire_format() {
        let message = ControllerMessage::SyncOfflineData { timestamp: "2026-10-18T09:00:00.000Z".into() };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": "SYNC_OFFLINE_DATA", "timestamp": "2026-10-18T09:00:00.000Z"})
        );
    }

    #[test]
    fn test_reply_wire_format() {
        let reply = ControlReply::CheckUpdate { update_available: false, error: Some("offline".into()) };
        assert_eq!(serde_json::to_value(&reply).unwrap(), json!({"updateAvailable": false, "error": "offline"}));

        let reply = ControlReply::ClearCache { success: true, message: Some("Cache cleared".into()), error: None };
        assert_eq!(serde_json::to_value(&reply).unwrap(), json!({"success": true, "message": "Cache cleared"}));
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(ControlCommand::deserialize(json!({"type": "CLEAR_CACHE"})).unwrap(), ControlCommand::ClearCache);
        assert!(ControlCommand::deserialize(json!({"type": "SKIP_WAITING"})).is_err());
    }

    #[tokio::test]
    async fn test_sync_notifies_each_client_once() {
        let (controller, _caches) = controller(Arc::new(StubNetwork::new())).await;
        let (_a, mut rx_a) = controller.clients().connect(page("/")).await;
        let (_b, mut rx_b) = controller.clients().connect(page("/mappa")).await;

        let report = controller.handle_sync("sync-data").await;

        assert_eq!(report.notified, 2);
        for rx in [&mut rx_a, &mut rx_b] {
            let message = rx.try_recv().unwrap();
            let ControllerMessage::SyncOfflineData { timestamp } = message;
            assert!(chrono::DateTime::parse_from_rfc3339(&timestamp).is_ok());
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_sync_without_clients_is_noop() {
        let (controller, _caches) = controller(Arc::new(StubNetwork::new())).await;
        let report = controller.handle_sync("sync-data").await;
        assert_eq!(report, SyncReport { tag: "sync-data".into(), notified: 0, failed: 0 });
    }

    #[tokio::test]
    async fn test_sync_survives_gone_client() {
        let (controller, _caches) = controller(Arc::new(StubNetwork::new())).await;
        let (_a, rx_a) = controller.clients().connect(page("/")).await;
        let (_b, mut rx_b) = controller.clients().connect(page("/")).await;
        drop(rx_a);

        let report = controller.handle_sync("sync-data").await;

        assert_eq!(report.notified, 1);
        assert_eq!(report.failed, 1);
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_sync_disconnects_gone_client() {
        let (controller, _caches) = controller(Arc::new(StubNetwork::new())).await;
        let (gone, rx) = controller.clients().connect(page("/")).await;
        drop(rx);

        let first = controller.handle_sync("sync-data").await;
        let second = controller.handle_sync("sync-data").await;

        assert_eq!(first.failed, 1);
        assert_eq!(second, SyncReport { tag: "sync-data".into(), notified: 0, failed: 0 });
        assert!(controller.clients().get(&gone).await.is_none());
        assert!(controller.clients().match_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_sync_tag_ignored() {
        let (controller, _caches) = controller(Arc::new(StubNetwork::new())).await;
        let (_a, mut rx) = controller.clients().connect(page("/")).await;

        let report = controller.handle_sync("periodic-refresh").await;

        assert_eq!(report.notified, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_clear_cache_removes_every_store() {
        let network = Arc::new(StubNetwork::new());
        serve_static_assets(&network);
        let (controller, caches) = controller(network).await;
        controller.install().await;
        caches.db().open_store("dynamic-v4").await.unwrap();
        caches.db().open_store("static-v3").await.unwrap();

        let (tx, rx) = oneshot::channel();
        let answer = controller.handle_message(&json!({"type": "CLEAR_CACHE"}), Some(tx)).await;

        let reply = rx.await.unwrap();
        assert!(matches!(reply, ControlReply::ClearCache { success: true, .. }));
        assert_eq!(answer, Some(reply));
        assert!(caches.db().store_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_cache_failure_reply() {
        let (controller, caches) = controller(Arc::new(StubNetwork::new())).await;
        caches.break_storage();

        let (tx, rx) = oneshot::channel();
        controller.handle_message(&json!({"type": "CLEAR_CACHE"}), Some(tx)).await;

        let reply = rx.await.unwrap();
        assert!(matches!(reply, ControlReply::ClearCache { success: false, error: Some(_), .. }));
    }

    #[tokio::test]
    async fn test_check_update_replies() {
        let network = Arc::new(StubNetwork::new());
        let script = url("/sw.js");
        network.respond(&script, Response::ok(&script, "self.addEventListener('fetch', () => {});"));
        let (controller, _caches) = controller(network.clone()).await;

        let (tx, rx) = oneshot::channel();
        controller.handle_message(&json!({"type": "CHECK_UPDATE"}), Some(tx)).await;
        assert_eq!(rx.await.unwrap(), ControlReply::CheckUpdate { update_available: true, error: None });

        network.set_offline(true);
        let (tx, rx) = oneshot::channel();
        controller.handle_message(&json!({"type": "CHECK_UPDATE"}), Some(tx)).await;
        assert!(matches!(rx.await.unwrap(), ControlReply::CheckUpdate { update_available: false, error: Some(_) }));
    }

    #[tokio::test]
    async fn test_unknown_message_ignored() {
        let (controller, caches) = controller(Arc::new(StubNetwork::new())).await;
        caches.db().open_store("static-v4").await.unwrap();

        let (tx, mut rx) = oneshot::channel();
        let answer = controller.handle_message(&json!({"type": "SKIP_WAITING"}), Some(tx)).await;

        assert!(answer.is_none());
        assert!(rx.try_recv().is_err());
        assert_eq!(caches.db().store_names().await.unwrap(), vec!["static-v4"]);
    }

    #[tokio::test]
    async fn test_command_without_reply_port() {
        let (controller, caches) = controller(Arc::new(StubNetwork::new())).await;
        caches.db().open_store("static-v4").await.unwrap();

        let answer = controller.handle_message(&json!({"type": "CLEAR_CACHE"}), None).await;

        assert!(matches!(answer, Some(ControlReply::ClearCache { success: true, .. })));
        assert!(caches.db().store_names().await.unwrap().is_empty());
    }
}

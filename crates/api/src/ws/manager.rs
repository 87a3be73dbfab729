use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};
use animagen_core::job_events::parse_user_channel;
use animagen_core::types::{DbId, Timestamp};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Authenticated owner of the connection. Each connection belongs to
    /// exactly one user channel.
    pub user_id: DbId,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Manages all active WebSocket connections.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection for `user_id`.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String, user_id: DbId) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            user_id,
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Find all connection IDs associated with a given user.
    pub async fn get_by_user(&self, user_id: DbId) -> Vec<String> {
        self.connections
            .read()
            .await
            .iter()
            .filter(|(_, conn)| conn.user_id == user_id)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Send a message to all connections belonging to a specific user.
    ///
    /// Connections whose send channels are closed are skipped; they are
    /// cleaned up when their receive loop ends. Returns the number of
    /// connections the message was queued for.
    pub async fn send_to_user(&self, user_id: DbId, message: Message) -> usize {
        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values().filter(|c| c.user_id == user_id) {
            if conn.sender.send(message.clone()).is_ok() {
                count += 1;
            }
        }
        count
    }

    /// Send a message to every connection subscribed to `channel`
    /// (e.g. `user-42`). Unknown channel names reach nobody.
    pub async fn send_to_channel(&self, channel: &str, message: Message) -> usize {
        match parse_user_channel(channel) {
            Some(user_id) => self.send_to_user(user_id, message).await,
            None => {
                tracing::warn!(channel, "Dropping message for unknown channel");
                0
            }
        }
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn messages_reach_only_the_owning_user() {
        let manager = WsManager::new();
        let mut alice_a = manager.add("a1".into(), 1).await;
        let mut alice_b = manager.add("a2".into(), 1).await;
        let mut bob = manager.add("b1".into(), 2).await;

        let sent = manager
            .send_to_channel("user-1", Message::Text("hello".into()))
            .await;

        assert_eq!(sent, 2);
        assert_matches!(alice_a.try_recv(), Ok(Message::Text(t)) if t.as_str() == "hello");
        assert_matches!(alice_b.try_recv(), Ok(Message::Text(_)));
        assert!(bob.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_channel_reaches_nobody() {
        let manager = WsManager::new();
        let mut rx = manager.add("c1".into(), 7).await;

        let sent = manager
            .send_to_channel("broadcast", Message::Text("x".into()))
            .await;

        assert_eq!(sent, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn removed_connections_stop_receiving() {
        let manager = WsManager::new();
        let _rx = manager.add("c1".into(), 7).await;
        assert_eq!(manager.get_by_user(7).await, vec!["c1".to_string()]);

        manager.remove("c1").await;

        assert_eq!(manager.connection_count().await, 0);
        assert_eq!(manager.send_to_user(7, Message::Text("x".into())).await, 0);
    }

    #[tokio::test]
    async fn dropped_receivers_are_not_counted() {
        let manager = WsManager::new();
        drop(manager.add("gone".into(), 3).await);
        let _live = manager.add("live".into(), 3).await;

        assert_eq!(manager.send_to_user(3, Message::Text("x".into())).await, 1);
    }

    #[tokio::test]
    async fn shutdown_sends_close_frames() {
        let manager = WsManager::new();
        let mut rx = manager.add("c1".into(), 1).await;

        manager.shutdown_all().await;

        assert_matches!(rx.try_recv(), Ok(Message::Close(None)));
        assert_eq!(manager.connection_count().await, 0);
    }
}

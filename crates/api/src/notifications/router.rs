use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::broadcast;
use animagen_events::UserNotification;

use crate::ws::WsManager;

/// Delivers [`UserNotification`]s from the event bus to WebSocket clients.
///
/// Delivery is best-effort: a user with no open socket simply misses the
/// notice, and the output row remains the source of truth.
pub struct NotificationRouter {
    ws_manager: Arc<WsManager>,
}

impl NotificationRouter {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the routing loop until the [`EventBus`](animagen_events::EventBus)
    /// is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<UserNotification>) {
        loop {
            match receiver.recv().await {
                Ok(notification) => self.deliver(&notification).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    async fn deliver(&self, notification: &UserNotification) {
        let frame = Message::Text(notification.to_frame().into());
        let delivered = self
            .ws_manager
            .send_to_channel(&notification.channel, frame)
            .await;

        tracing::debug!(
            channel = %notification.channel,
            event = notification.notice.event_name(),
            output_id = notification.notice.output_id(),
            delivered,
            "Notification delivered",
        );
    }
}

//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`UserNotification`]s.
//! It is constructed once by the binary and shared via `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use animagen_core::job_events::user_channel;
use animagen_core::types::DbId;

use crate::notice::GenerationNotice;

// ---------------------------------------------------------------------------
// UserNotification
// ---------------------------------------------------------------------------

/// A notice addressed to a single user channel.
///
/// Serializes to the socket frame
/// `{"event": ..., "data": {...}, "timestamp": ...}`; the channel itself is
/// routing information and is not sent to the client.
#[derive(Debug, Clone, Serialize)]
pub struct UserNotification {
    /// Target channel, e.g. `"user-42"`.
    #[serde(skip)]
    pub channel: String,

    #[serde(flatten)]
    pub notice: GenerationNotice,

    /// When the notification was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl UserNotification {
    /// Address `notice` to the channel of `user_id`.
    pub fn for_user(user_id: DbId, notice: GenerationNotice) -> Self {
        Self {
            channel: user_channel(user_id),
            notice,
            timestamp: Utc::now(),
        }
    }

    /// Render the socket frame body.
    pub fn to_frame(&self) -> String {
        // Serializing plain enums and strings cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use animagen_core::generation::ContentType;
/// use animagen_events::{EventBus, GenerationNotice, UserNotification};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(UserNotification::for_user(
///     42,
///     GenerationNotice::completed(7, ContentType::Image),
/// ));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<UserNotification>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a notification to all current subscribers.
    ///
    /// Delivery is best-effort: with no subscribers the notification is
    /// dropped.
    pub fn publish(&self, notification: UserNotification) {
        tracing::debug!(
            channel = %notification.channel,
            event = notification.notice.event_name(),
            output_id = notification.notice.output_id(),
            "Publishing notification",
        );
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(notification);
    }

    /// Subscribe to all notifications published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<UserNotification> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Animagen notification bus.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`UserNotification`] -- an event addressed to one user channel
//!   (`user-{id}`).
//! - [`GenerationNotice`] -- the typed payloads the generation processor
//!   emits.
//!
//! Delivery to sockets is the API's job; the bus only fans events out to
//! whoever subscribed.

pub mod bus;
pub mod notice;

pub use bus::{EventBus, UserNotification};
pub use notice::GenerationNotice;

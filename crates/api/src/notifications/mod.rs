//! Bridges the in-process event bus to connected sockets.
//!
//! The [`NotificationRouter`] subscribes to the bus and delivers each
//! notification to the sockets on its user channel.

pub mod router;

pub use router::NotificationRouter;

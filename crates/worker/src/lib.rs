//! Generation job queue: dispatcher, per-content-type worker pools and the
//! store seams they run against.
//!
//! The API binary hosts the pools in-process so the notifications they
//! publish on the [`animagen_events::EventBus`] reach its WebSocket
//! connections directly.

pub mod dispatcher;
pub mod error;
pub mod job;
pub mod memory;
pub mod processor;
pub mod store;

pub use dispatcher::{JobDispatcher, QueueSignals};
pub use error::{ProcessError, QueueError};
pub use job::{GenerationJob, JobHandle, QueuedJob};
pub use processor::JobProcessor;
pub use store::{JobQueue, OutputStore, PgJobQueue, PgOutputStore};

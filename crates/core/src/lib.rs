//! Domain types, constants and pure logic shared by every animagen crate.
//!
//! Nothing in here touches the database, the network or the runtime; the
//! worker, the API and the AI-service client all build on these types.

pub mod error;
pub mod generation;
pub mod job_events;
pub mod metadata;
pub mod queue_policy;
pub mod style;
pub mod types;

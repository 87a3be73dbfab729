use std::time::Duration;

use animagen_aiservice::GenerationApiError;
use animagen_core::error::CoreError;

/// Errors from the queue and output stores.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid job payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Invalid job: {0}")]
    InvalidJob(String),
}

/// Why a single attempt at a job failed.
///
/// The `Display` text is what ends up in `error_message` on a failed
/// output and in the `generation-failed` notification.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("{0}")]
    Backend(#[from] GenerationApiError),

    #[error("Generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Failed to persist result: {0}")]
    Persistence(#[from] QueueError),

    #[error("Invalid generation result: {0}")]
    InvalidResult(#[from] CoreError),
}

//! Queue payloads and handles.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use animagen_aiservice::GenerationRequest;
use animagen_core::generation::ContentType;
use animagen_core::style::StyleParameters;
use animagen_core::types::DbId;

/// Everything a worker needs to run one generation.
///
/// Stored as the queue row's JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationJob {
    pub user_id: DbId,
    pub prompt_id: DbId,
    pub output_id: DbId,
    pub content_type: ContentType,
    pub prompt_text: String,
    pub style: StyleParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_track_id: Option<String>,
}

impl GenerationJob {
    /// The request sent to the generation service for this job.
    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest::new(
            self.output_id,
            &self.prompt_text,
            &self.style,
            self.audio_track_id.as_deref(),
        )
    }
}

/// Returned by [`crate::JobDispatcher::enqueue`] without waiting for the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobHandle {
    pub job_id: DbId,
    pub queue: &'static str,
    pub content_type: ContentType,
    pub output_id: DbId,
}

/// A job claimed by a worker, with its attempt bookkeeping.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub id: DbId,
    pub payload: GenerationJob,
    /// Attempts made so far, including the one just claimed.
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl QueuedJob {
    pub fn has_attempts_left(&self) -> bool {
        self.attempts_made < self.max_attempts
    }

    pub fn next_delay(&self) -> Duration {
        animagen_core::queue_policy::backoff_delay(self.backoff_base, self.attempts_made)
    }
}

//! Queue rows for the image and video generation queues.

use serde::Serialize;
use sqlx::FromRow;
use animagen_core::types::{DbId, Timestamp};

use super::status::{JobState, StatusId};

/// A row from the `generation_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GenerationJobRow {
    pub id: DbId,
    pub queue: String,
    pub output_id: DbId,
    pub payload: serde_json::Value,
    pub priority: i32,
    pub max_attempts: i32,
    pub backoff_ms: i64,
    pub attempts_made: i32,
    pub state_id: StatusId,
    pub run_at: Timestamp,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl GenerationJobRow {
    pub fn state(&self) -> Option<JobState> {
        JobState::from_id(self.state_id)
    }
}

/// Insert DTO for a new queue entry.
#[derive(Debug, Clone)]
pub struct NewGenerationJob {
    pub queue: String,
    pub output_id: DbId,
    pub payload: serde_json::Value,
    pub priority: i32,
    pub max_attempts: i32,
    pub backoff_ms: i64,
}

/// Per-queue job counts, by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct QueueCounts {
    pub waiting: i64,
    /// Waiting jobs whose `run_at` is still in the future (backing off).
    pub delayed: i64,
    pub active: i64,
    pub completed: i64,
    pub failed: i64,
}

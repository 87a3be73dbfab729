//! Generated output rows and their DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use animagen_core::error::CoreError;
use animagen_core::generation::{ContentType, OutputStatus};
use animagen_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `generated_outputs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GeneratedOutput {
    pub id: DbId,
    pub user_id: DbId,
    pub prompt_id: DbId,
    pub content_type: String,
    pub status_id: StatusId,
    pub file_path: Option<String>,
    pub thumbnail_path: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub processing_time_seconds: Option<f64>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl GeneratedOutput {
    /// Decoded status; `None` only if the lookup table and code disagree.
    pub fn status(&self) -> Option<OutputStatus> {
        OutputStatus::from_id(self.status_id)
    }

    pub fn content_type(&self) -> Result<ContentType, CoreError> {
        self.content_type.parse()
    }
}

/// Outcome written when a generation succeeds.
#[derive(Debug, Clone)]
pub struct CompleteOutput {
    pub file_path: String,
    pub thumbnail_path: Option<String>,
    pub metadata: serde_json::Value,
    pub processing_time_seconds: f64,
}

/// Query parameters for listing a user's outputs.
#[derive(Debug, Default, Deserialize)]
pub struct OutputListQuery {
    /// Filter by status name (`PENDING`, `COMPLETED`, ...).
    pub status: Option<OutputStatus>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

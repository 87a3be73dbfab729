//! Prompt rows: the text and style a user submitted for generation.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use animagen_core::types::{DbId, Timestamp};

/// A row from the `prompts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Prompt {
    pub id: DbId,
    pub user_id: DbId,
    pub content_type: String,
    pub prompt_text: String,
    pub style: serde_json::Value,
    pub audio_track_id: Option<String>,
    pub created_at: Timestamp,
}

/// Insert DTO for [`Prompt`].
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePrompt {
    pub content_type: String,
    pub prompt_text: String,
    pub style: serde_json::Value,
    pub audio_track_id: Option<String>,
}

//! Repository for the `prompts` table.

use sqlx::PgExecutor;
use animagen_core::types::DbId;

use crate::models::prompt::{CreatePrompt, Prompt};

/// Column list for `prompts` queries.
const COLUMNS: &str = "id, user_id, content_type, prompt_text, style, audio_track_id, created_at";

pub struct PromptRepo;

impl PromptRepo {
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        user_id: DbId,
        input: &CreatePrompt,
    ) -> Result<Prompt, sqlx::Error> {
        let query = format!(
            "INSERT INTO prompts (user_id, content_type, prompt_text, style, audio_track_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Prompt>(&query)
            .bind(user_id)
            .bind(&input.content_type)
            .bind(&input.prompt_text)
            .bind(&input.style)
            .bind(&input.audio_track_id)
            .fetch_one(executor)
            .await
    }

    /// Delete a prompt. Returns `true` if a row was removed.
    pub async fn delete<'e>(executor: impl PgExecutor<'e>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM prompts WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

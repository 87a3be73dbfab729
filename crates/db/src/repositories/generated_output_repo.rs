//! Repository for the `generated_outputs` table.
//!
//! Status writes are conditional on the current status so the lifecycle
//! stays monotonic even if two writers race: every update names the
//! statuses it may overwrite and reports whether a row actually changed.

use sqlx::{PgExecutor, PgPool};
use animagen_core::generation::OutputStatus;
use animagen_core::types::DbId;

use crate::models::generated_output::{CompleteOutput, GeneratedOutput, OutputListQuery};
use crate::models::status::StatusId;
use crate::repositories::UsageLogRepo;

/// Column list for `generated_outputs` queries.
const COLUMNS: &str = "\
    id, user_id, prompt_id, content_type, status_id, \
    file_path, thumbnail_path, metadata, processing_time_seconds, error_message, \
    created_at, updated_at, completed_at";

/// Maximum page size for output listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for output listing.
const DEFAULT_LIMIT: i64 = 50;

fn predecessor_ids(next: OutputStatus) -> Vec<StatusId> {
    OutputStatus::allowed_predecessors(next)
        .iter()
        .map(|s| s.id())
        .collect()
}

pub struct GeneratedOutputRepo;

impl GeneratedOutputRepo {
    /// Insert a new output in `PENDING`.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        user_id: DbId,
        prompt_id: DbId,
        content_type: &str,
    ) -> Result<GeneratedOutput, sqlx::Error> {
        let query = format!(
            "INSERT INTO generated_outputs (user_id, prompt_id, content_type, status_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedOutput>(&query)
            .bind(user_id)
            .bind(prompt_id)
            .bind(content_type)
            .bind(OutputStatus::Pending.id())
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<Option<GeneratedOutput>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generated_outputs WHERE id = $1");
        sqlx::query_as::<_, GeneratedOutput>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Delete an output that never left `PENDING`.
    ///
    /// Used when its job could not be queued. Returns `false` if the row is
    /// gone or a worker already picked it up.
    pub async fn discard_pending<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM generated_outputs WHERE id = $1 AND status_id = $2")
            .bind(id)
            .bind(OutputStatus::Pending.id())
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move an output to `PROCESSING`.
    ///
    /// Returns `false` when the row is missing or already terminal.
    pub async fn mark_processing<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generated_outputs SET status_id = $2 \
             WHERE id = $1 AND status_id = ANY($3)",
        )
        .bind(id)
        .bind(OutputStatus::Processing.id())
        .bind(predecessor_ids(OutputStatus::Processing))
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark an output `COMPLETED` and append its usage row, atomically.
    ///
    /// Returns `None` (and writes nothing) if the output is not currently
    /// `PROCESSING`.
    pub async fn complete_with_usage(
        pool: &PgPool,
        id: DbId,
        input: &CompleteOutput,
    ) -> Result<Option<GeneratedOutput>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE generated_outputs \
             SET status_id = $2, file_path = $3, thumbnail_path = $4, metadata = $5, \
                 processing_time_seconds = $6, error_message = NULL, completed_at = NOW() \
             WHERE id = $1 AND status_id = ANY($7) \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, GeneratedOutput>(&query)
            .bind(id)
            .bind(OutputStatus::Completed.id())
            .bind(&input.file_path)
            .bind(&input.thumbnail_path)
            .bind(&input.metadata)
            .bind(input.processing_time_seconds)
            .bind(predecessor_ids(OutputStatus::Completed))
            .fetch_optional(&mut *tx)
            .await?;

        let Some(output) = updated else {
            tx.rollback().await?;
            return Ok(None);
        };

        UsageLogRepo::insert(
            &mut *tx,
            output.user_id,
            output.id,
            &output.content_type,
            input.processing_time_seconds,
            &input.metadata,
        )
        .await?;

        tx.commit().await?;
        Ok(Some(output))
    }

    /// Mark an output `FAILED` with an error message.
    ///
    /// Returns `false` when the output is not currently `PROCESSING`.
    pub async fn fail<'e>(
        executor: impl PgExecutor<'e>,
        id: DbId,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generated_outputs \
             SET status_id = $2, error_message = $3, completed_at = NOW() \
             WHERE id = $1 AND status_id = ANY($4)",
        )
        .bind(id)
        .bind(OutputStatus::Failed.id())
        .bind(error)
        .bind(predecessor_ids(OutputStatus::Failed))
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List a user's outputs, newest first, with optional status filter.
    pub async fn list_by_user<'e>(
        executor: impl PgExecutor<'e>,
        user_id: DbId,
        params: &OutputListQuery,
    ) -> Result<Vec<GeneratedOutput>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        let query = format!(
            "SELECT {COLUMNS} FROM generated_outputs \
             WHERE user_id = $1 AND ($2::SMALLINT IS NULL OR status_id = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, GeneratedOutput>(&query)
            .bind(user_id)
            .bind(params.status.map(OutputStatus::id))
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }
}

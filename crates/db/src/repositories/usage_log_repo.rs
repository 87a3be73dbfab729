//! Repository for the append-only `usage_logs` table.

use sqlx::PgExecutor;
use animagen_core::types::DbId;

use crate::models::usage_log::UsageLog;

const COLUMNS: &str =
    "id, user_id, output_id, content_type, processing_time_seconds, metadata, created_at";

pub struct UsageLogRepo;

impl UsageLogRepo {
    /// Append one usage row. Runs on any executor so it can share a
    /// transaction with the output completion.
    pub async fn insert<'e>(
        executor: impl PgExecutor<'e>,
        user_id: DbId,
        output_id: DbId,
        content_type: &str,
        processing_time_seconds: f64,
        metadata: &serde_json::Value,
    ) -> Result<UsageLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO usage_logs \
                 (user_id, output_id, content_type, processing_time_seconds, metadata) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UsageLog>(&query)
            .bind(user_id)
            .bind(output_id)
            .bind(content_type)
            .bind(processing_time_seconds)
            .bind(metadata)
            .fetch_one(executor)
            .await
    }

    pub async fn list_for_output<'e>(
        executor: impl PgExecutor<'e>,
        output_id: DbId,
    ) -> Result<Vec<UsageLog>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM usage_logs WHERE output_id = $1 ORDER BY id");
        sqlx::query_as::<_, UsageLog>(&query)
            .bind(output_id)
            .fetch_all(executor)
            .await
    }

    /// Total processing seconds billed to a user.
    pub async fn total_seconds_for_user<'e>(
        executor: impl PgExecutor<'e>,
        user_id: DbId,
    ) -> Result<f64, sqlx::Error> {
        sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(SUM(processing_time_seconds), 0)::DOUBLE PRECISION \
             FROM usage_logs WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(executor)
        .await
    }
}

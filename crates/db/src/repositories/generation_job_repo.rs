//! Repository for the `generation_jobs` queue table.
//!
//! Claiming uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers (in
//! this process or another) never receive the same job. A job that failed
//! but still has attempts left goes back to `Waiting` with `run_at` pushed
//! out by its backoff delay.

use sqlx::PgPool;
use animagen_core::types::DbId;

use crate::models::generation_job::{GenerationJobRow, NewGenerationJob, QueueCounts};
use crate::models::status::JobState;

/// Column list for `generation_jobs` queries.
const COLUMNS: &str = "\
    id, queue, output_id, payload, priority, max_attempts, backoff_ms, \
    attempts_made, state_id, run_at, last_error, created_at, updated_at, finished_at";

pub struct GenerationJobRepo;

impl GenerationJobRepo {
    /// Add a job to a queue, due immediately.
    pub async fn insert(
        pool: &PgPool,
        input: &NewGenerationJob,
    ) -> Result<GenerationJobRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO generation_jobs \
                 (queue, output_id, payload, priority, max_attempts, backoff_ms, state_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJobRow>(&query)
            .bind(&input.queue)
            .bind(input.output_id)
            .bind(&input.payload)
            .bind(input.priority)
            .bind(input.max_attempts)
            .bind(input.backoff_ms)
            .bind(JobState::Waiting.id())
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the next due job on `queue` and count the attempt.
    ///
    /// Ordering: priority descending, then due time, then insertion order.
    pub async fn claim_next(
        pool: &PgPool,
        queue: &str,
    ) -> Result<Option<GenerationJobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE generation_jobs \
             SET state_id = $2, attempts_made = attempts_made + 1 \
             WHERE id = ( \
                 SELECT id FROM generation_jobs \
                 WHERE queue = $1 AND state_id = $3 AND run_at <= NOW() \
                 ORDER BY priority DESC, run_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GenerationJobRow>(&query)
            .bind(queue)
            .bind(JobState::Active.id())
            .bind(JobState::Waiting.id())
            .fetch_optional(pool)
            .await
    }

    /// Mark an active job completed.
    pub async fn complete(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generation_jobs SET state_id = $2, finished_at = NOW() \
             WHERE id = $1 AND state_id = $3",
        )
        .bind(id)
        .bind(JobState::Completed.id())
        .bind(JobState::Active.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark an active job permanently failed.
    pub async fn fail(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generation_jobs \
             SET state_id = $2, last_error = $3, finished_at = NOW() \
             WHERE id = $1 AND state_id = $4",
        )
        .bind(id)
        .bind(JobState::Failed.id())
        .bind(error)
        .bind(JobState::Active.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Put an active job back in the queue, due after `delay_ms`.
    pub async fn retry_later(
        pool: &PgPool,
        id: DbId,
        delay_ms: i64,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE generation_jobs \
             SET state_id = $2, last_error = $3, \
                 run_at = NOW() + ($4::BIGINT * INTERVAL '1 millisecond') \
             WHERE id = $1 AND state_id = $5",
        )
        .bind(id)
        .bind(JobState::Waiting.id())
        .bind(error)
        .bind(delay_ms)
        .bind(JobState::Active.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Return jobs left `Active` by a crashed process to `Waiting`.
    ///
    /// The interrupted attempt is not counted. Returns the number of jobs
    /// recovered.
    pub async fn recover_stalled(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE generation_jobs \
             SET state_id = $1, attempts_made = GREATEST(attempts_made - 1, 0), run_at = NOW() \
             WHERE state_id = $2",
        )
        .bind(JobState::Waiting.id())
        .bind(JobState::Active.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete all but the newest `keep` finished jobs in `state` on `queue`.
    pub async fn prune_finished(
        pool: &PgPool,
        queue: &str,
        state: JobState,
        keep: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM generation_jobs \
             WHERE id IN ( \
                 SELECT id FROM generation_jobs \
                 WHERE queue = $1 AND state_id = $2 \
                 ORDER BY finished_at DESC NULLS LAST, id DESC \
                 OFFSET $3 \
             )",
        )
        .bind(queue)
        .bind(state.id())
        .bind(keep.max(0))
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<GenerationJobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM generation_jobs WHERE id = $1");
        sqlx::query_as::<_, GenerationJobRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Count jobs on a queue by state.
    pub async fn counts(pool: &PgPool, queue: &str) -> Result<QueueCounts, sqlx::Error> {
        sqlx::query_as::<_, QueueCounts>(
            "SELECT \
                 COUNT(*) FILTER (WHERE state_id = $2 AND run_at <= NOW()) AS waiting, \
                 COUNT(*) FILTER (WHERE state_id = $2 AND run_at > NOW())  AS delayed, \
                 COUNT(*) FILTER (WHERE state_id = $3) AS active, \
                 COUNT(*) FILTER (WHERE state_id = $4) AS completed, \
                 COUNT(*) FILTER (WHERE state_id = $5) AS failed \
             FROM generation_jobs WHERE queue = $1",
        )
        .bind(queue)
        .bind(JobState::Waiting.id())
        .bind(JobState::Active.id())
        .bind(JobState::Completed.id())
        .bind(JobState::Failed.id())
        .fetch_one(pool)
        .await
    }
}

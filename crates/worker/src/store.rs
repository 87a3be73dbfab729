//! Storage seams used by the dispatcher and the worker pools.
//!
//! [`JobQueue`] is the queue backing table, [`OutputStore`] the
//! `generated_outputs` rows workers report into. The Postgres
//! implementations delegate to the `animagen_db` repositories; the
//! in-memory ones live in [`crate::memory`].

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use animagen_core::generation::ContentType;
use animagen_core::queue_policy::{QueuePolicy, KEEP_COMPLETED, KEEP_FAILED};
use animagen_core::types::DbId;
use animagen_db::models::generated_output::CompleteOutput;
use animagen_db::models::generation_job::{GenerationJobRow, NewGenerationJob, QueueCounts};
use animagen_db::models::status::JobState;
use animagen_db::repositories::{GeneratedOutputRepo, GenerationJobRepo};

use crate::error::QueueError;
use crate::job::{GenerationJob, QueuedJob};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Add a job to its content type's queue, due immediately.
    async fn push(&self, job: &GenerationJob, policy: &QueuePolicy) -> Result<DbId, QueueError>;

    /// Claim the next due job for `content_type`, counting the attempt.
    async fn claim(&self, content_type: ContentType) -> Result<Option<QueuedJob>, QueueError>;

    async fn complete(&self, job_id: DbId) -> Result<(), QueueError>;

    async fn fail(&self, job_id: DbId, error: &str) -> Result<(), QueueError>;

    /// Return a claimed job to the queue, due after `delay`.
    async fn retry_later(&self, job_id: DbId, delay: Duration, error: &str)
        -> Result<(), QueueError>;

    /// Requeue jobs a previous process left active. Returns how many.
    async fn recover_stalled(&self) -> Result<u64, QueueError>;

    /// Drop finished jobs beyond the retention limits.
    async fn prune(&self, content_type: ContentType) -> Result<(), QueueError>;

    async fn counts(&self, content_type: ContentType) -> Result<QueueCounts, QueueError>;
}

#[async_trait]
pub trait OutputStore: Send + Sync {
    /// Move the output to `PROCESSING`. `false` when it is already terminal.
    async fn mark_processing(&self, output_id: DbId) -> Result<bool, QueueError>;

    /// Mark the output `COMPLETED` and record usage in one step.
    async fn complete(&self, output_id: DbId, input: &CompleteOutput) -> Result<bool, QueueError>;

    async fn fail(&self, output_id: DbId, error: &str) -> Result<bool, QueueError>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// Queue backed by the `generation_jobs` table.
#[derive(Clone)]
pub struct PgJobQueue {
    pool: PgPool,
}

impl PgJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn to_queued(row: GenerationJobRow) -> Result<QueuedJob, serde_json::Error> {
        let payload: GenerationJob = serde_json::from_value(row.payload)?;
        Ok(QueuedJob {
            id: row.id,
            payload,
            attempts_made: row.attempts_made.max(0) as u32,
            max_attempts: row.max_attempts.max(1) as u32,
            backoff_base: Duration::from_millis(row.backoff_ms.max(0) as u64),
        })
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn push(&self, job: &GenerationJob, policy: &QueuePolicy) -> Result<DbId, QueueError> {
        let input = NewGenerationJob {
            queue: job.content_type.queue_name().to_string(),
            output_id: job.output_id,
            payload: serde_json::to_value(job)?,
            priority: policy.priority,
            max_attempts: policy.attempts as i32,
            backoff_ms: policy.backoff_base.as_millis() as i64,
        };
        let row = GenerationJobRepo::insert(&self.pool, &input).await?;
        Ok(row.id)
    }

    async fn claim(&self, content_type: ContentType) -> Result<Option<QueuedJob>, QueueError> {
        let Some(row) = GenerationJobRepo::claim_next(&self.pool, content_type.queue_name()).await?
        else {
            return Ok(None);
        };

        let job_id = row.id;
        match Self::to_queued(row) {
            Ok(job) => Ok(Some(job)),
            Err(e) => {
                // An unreadable payload can never succeed; fail it now so it
                // does not sit active forever.
                tracing::error!(job_id, error = %e, "Discarding job with invalid payload");
                GenerationJobRepo::fail(&self.pool, job_id, &format!("Invalid payload: {e}"))
                    .await?;
                Err(QueueError::Payload(e))
            }
        }
    }

    async fn complete(&self, job_id: DbId) -> Result<(), QueueError> {
        GenerationJobRepo::complete(&self.pool, job_id).await?;
        Ok(())
    }

    async fn fail(&self, job_id: DbId, error: &str) -> Result<(), QueueError> {
        GenerationJobRepo::fail(&self.pool, job_id, error).await?;
        Ok(())
    }

    async fn retry_later(
        &self,
        job_id: DbId,
        delay: Duration,
        error: &str,
    ) -> Result<(), QueueError> {
        GenerationJobRepo::retry_later(&self.pool, job_id, delay.as_millis() as i64, error)
            .await?;
        Ok(())
    }

    async fn recover_stalled(&self) -> Result<u64, QueueError> {
        Ok(GenerationJobRepo::recover_stalled(&self.pool).await?)
    }

    async fn prune(&self, content_type: ContentType) -> Result<(), QueueError> {
        let queue = content_type.queue_name();
        GenerationJobRepo::prune_finished(&self.pool, queue, JobState::Completed, KEEP_COMPLETED)
            .await?;
        GenerationJobRepo::prune_finished(&self.pool, queue, JobState::Failed, KEEP_FAILED)
            .await?;
        Ok(())
    }

    async fn counts(&self, content_type: ContentType) -> Result<QueueCounts, QueueError> {
        Ok(GenerationJobRepo::counts(&self.pool, content_type.queue_name()).await?)
    }
}

/// Output rows in the `generated_outputs` table.
#[derive(Clone)]
pub struct PgOutputStore {
    pool: PgPool,
}

impl PgOutputStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutputStore for PgOutputStore {
    async fn mark_processing(&self, output_id: DbId) -> Result<bool, QueueError> {
        Ok(GeneratedOutputRepo::mark_processing(&self.pool, output_id).await?)
    }

    async fn complete(&self, output_id: DbId, input: &CompleteOutput) -> Result<bool, QueueError> {
        let updated = GeneratedOutputRepo::complete_with_usage(&self.pool, output_id, input).await?;
        Ok(updated.is_some())
    }

    async fn fail(&self, output_id: DbId, error: &str) -> Result<bool, QueueError> {
        Ok(GeneratedOutputRepo::fail(&self.pool, output_id, error).await?)
    }
}

//! In-memory [`JobQueue`] and [`OutputStore`].
//!
//! Same ordering, retry and lifecycle rules as the Postgres stores, with
//! due times on the Tokio clock so paused-time tests can drive backoff.
//! Used by the worker tests and by anything embedding the pools without a
//! database.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use animagen_core::generation::{ContentType, OutputStatus};
use animagen_core::queue_policy::{QueuePolicy, KEEP_COMPLETED, KEEP_FAILED};
use animagen_core::types::DbId;
use animagen_db::models::generated_output::CompleteOutput;
use animagen_db::models::generation_job::QueueCounts;
use animagen_db::models::status::JobState;

use crate::error::QueueError;
use crate::job::{GenerationJob, QueuedJob};
use crate::store::{JobQueue, OutputStore};

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// Snapshot of one queue entry.
#[derive(Debug, Clone)]
pub struct MemoryJob {
    pub id: DbId,
    pub payload: GenerationJob,
    pub priority: i32,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub attempts_made: u32,
    pub state: JobState,
    pub run_at: Instant,
    pub last_error: Option<String>,
    finished_seq: u64,
}

#[derive(Default)]
struct QueueState {
    next_id: DbId,
    finished_seq: u64,
    jobs: BTreeMap<DbId, MemoryJob>,
}

#[derive(Default)]
pub struct InMemoryJobQueue {
    state: Mutex<QueueState>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job(&self, id: DbId) -> Option<MemoryJob> {
        self.lock().jobs.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        // A poisoned lock only means a test panicked mid-update.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn finish(&self, job_id: DbId, state: JobState, error: Option<&str>) {
        let mut guard = self.lock();
        guard.finished_seq += 1;
        let seq = guard.finished_seq;
        if let Some(job) = guard.jobs.get_mut(&job_id) {
            if job.state == JobState::Active {
                job.state = state;
                job.finished_seq = seq;
                if let Some(error) = error {
                    job.last_error = Some(error.to_string());
                }
            }
        }
    }

    fn prune_state(state: &mut QueueState, content_type: ContentType, which: JobState, keep: i64) {
        let mut finished: Vec<(u64, DbId)> = state
            .jobs
            .values()
            .filter(|j| j.payload.content_type == content_type && j.state == which)
            .map(|j| (j.finished_seq, j.id))
            .collect();
        finished.sort_unstable_by(|a, b| b.cmp(a));
        for (_, id) in finished.into_iter().skip(keep.max(0) as usize) {
            state.jobs.remove(&id);
        }
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn push(&self, job: &GenerationJob, policy: &QueuePolicy) -> Result<DbId, QueueError> {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.jobs.insert(
            id,
            MemoryJob {
                id,
                payload: job.clone(),
                priority: policy.priority,
                max_attempts: policy.attempts,
                backoff_base: policy.backoff_base,
                attempts_made: 0,
                state: JobState::Waiting,
                run_at: Instant::now(),
                last_error: None,
                finished_seq: 0,
            },
        );
        Ok(id)
    }

    async fn claim(&self, content_type: ContentType) -> Result<Option<QueuedJob>, QueueError> {
        let now = Instant::now();
        let mut state = self.lock();

        // Highest priority first, then earliest due, then oldest.
        let next = state
            .jobs
            .values()
            .filter(|j| {
                j.payload.content_type == content_type
                    && j.state == JobState::Waiting
                    && j.run_at <= now
            })
            .min_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then(a.run_at.cmp(&b.run_at))
                    .then(a.id.cmp(&b.id))
            })
            .map(|j| j.id);

        let Some(id) = next else {
            return Ok(None);
        };
        let Some(job) = state.jobs.get_mut(&id) else {
            return Ok(None);
        };
        job.state = JobState::Active;
        job.attempts_made += 1;

        Ok(Some(QueuedJob {
            id: job.id,
            payload: job.payload.clone(),
            attempts_made: job.attempts_made,
            max_attempts: job.max_attempts,
            backoff_base: job.backoff_base,
        }))
    }

    async fn complete(&self, job_id: DbId) -> Result<(), QueueError> {
        self.finish(job_id, JobState::Completed, None);
        Ok(())
    }

    async fn fail(&self, job_id: DbId, error: &str) -> Result<(), QueueError> {
        self.finish(job_id, JobState::Failed, Some(error));
        Ok(())
    }

    async fn retry_later(
        &self,
        job_id: DbId,
        delay: Duration,
        error: &str,
    ) -> Result<(), QueueError> {
        let mut state = self.lock();
        if let Some(job) = state.jobs.get_mut(&job_id) {
            if job.state == JobState::Active {
                job.state = JobState::Waiting;
                job.run_at = Instant::now() + delay;
                job.last_error = Some(error.to_string());
            }
        }
        Ok(())
    }

    async fn recover_stalled(&self) -> Result<u64, QueueError> {
        let now = Instant::now();
        let mut state = self.lock();
        let mut recovered = 0;
        for job in state.jobs.values_mut().filter(|j| j.state == JobState::Active) {
            job.state = JobState::Waiting;
            job.attempts_made = job.attempts_made.saturating_sub(1);
            job.run_at = now;
            recovered += 1;
        }
        Ok(recovered)
    }

    async fn prune(&self, content_type: ContentType) -> Result<(), QueueError> {
        let mut state = self.lock();
        Self::prune_state(&mut state, content_type, JobState::Completed, KEEP_COMPLETED);
        Self::prune_state(&mut state, content_type, JobState::Failed, KEEP_FAILED);
        Ok(())
    }

    async fn counts(&self, content_type: ContentType) -> Result<QueueCounts, QueueError> {
        let now = Instant::now();
        let state = self.lock();
        let mut counts = QueueCounts::default();
        for job in state.jobs.values().filter(|j| j.payload.content_type == content_type) {
            match job.state {
                JobState::Waiting if job.run_at > now => counts.delayed += 1,
                JobState::Waiting => counts.waiting += 1,
                JobState::Active => counts.active += 1,
                JobState::Completed => counts.completed += 1,
                JobState::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryOutput {
    pub id: DbId,
    pub user_id: DbId,
    pub content_type: ContentType,
    pub status: OutputStatus,
    pub file_path: Option<String>,
    pub thumbnail_path: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub processing_time_seconds: Option<f64>,
    pub error_message: Option<String>,
    /// Every status the output has held, in order.
    pub history: Vec<OutputStatus>,
}

impl MemoryOutput {
    fn set_status(&mut self, status: OutputStatus) {
        if self.status != status {
            self.status = status;
            self.history.push(status);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryUsageLog {
    pub user_id: DbId,
    pub output_id: DbId,
    pub content_type: ContentType,
    pub processing_time_seconds: f64,
    pub metadata: serde_json::Value,
}

#[derive(Default)]
struct OutputState {
    next_id: DbId,
    outputs: BTreeMap<DbId, MemoryOutput>,
    usage: Vec<MemoryUsageLog>,
}

#[derive(Default)]
pub struct InMemoryOutputStore {
    state: Mutex<OutputState>,
}

impl InMemoryOutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a `PENDING` output and return its id.
    pub fn create(&self, user_id: DbId, content_type: ContentType) -> DbId {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.outputs.insert(
            id,
            MemoryOutput {
                id,
                user_id,
                content_type,
                status: OutputStatus::Pending,
                file_path: None,
                thumbnail_path: None,
                metadata: None,
                processing_time_seconds: None,
                error_message: None,
                history: vec![OutputStatus::Pending],
            },
        );
        id
    }

    pub fn get(&self, id: DbId) -> Option<MemoryOutput> {
        self.lock().outputs.get(&id).cloned()
    }

    pub fn usage_logs(&self) -> Vec<MemoryUsageLog> {
        self.lock().usage.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, OutputState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl OutputStore for InMemoryOutputStore {
    async fn mark_processing(&self, output_id: DbId) -> Result<bool, QueueError> {
        let mut state = self.lock();
        match state.outputs.get_mut(&output_id) {
            Some(o) if o.status.can_transition_to(OutputStatus::Processing) => {
                o.set_status(OutputStatus::Processing);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete(&self, output_id: DbId, input: &CompleteOutput) -> Result<bool, QueueError> {
        let mut state = self.lock();
        let Some(output) = state.outputs.get_mut(&output_id) else {
            return Ok(false);
        };
        if !output.status.can_transition_to(OutputStatus::Completed) {
            return Ok(false);
        }
        output.set_status(OutputStatus::Completed);
        output.file_path = Some(input.file_path.clone());
        output.thumbnail_path = input.thumbnail_path.clone();
        output.metadata = Some(input.metadata.clone());
        output.processing_time_seconds = Some(input.processing_time_seconds);
        output.error_message = None;

        let log = MemoryUsageLog {
            user_id: output.user_id,
            output_id,
            content_type: output.content_type,
            processing_time_seconds: input.processing_time_seconds,
            metadata: input.metadata.clone(),
        };
        state.usage.push(log);
        Ok(true)
    }

    async fn fail(&self, output_id: DbId, error: &str) -> Result<bool, QueueError> {
        let mut state = self.lock();
        match state.outputs.get_mut(&output_id) {
            Some(o) if o.status.can_transition_to(OutputStatus::Failed) => {
                o.set_status(OutputStatus::Failed);
                o.error_message = Some(error.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

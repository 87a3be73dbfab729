//! Worker pool for one generation queue.
//!
//! Each of the policy's `concurrency` workers loops: claim the next due job,
//! run one attempt against the generation backend under the queue's hard
//! timeout, then either record the result, reschedule with backoff, or
//! record the final failure. A notification is published on the event bus
//! only once the output's terminal state has been written, so every job
//! that finishes produces exactly one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use animagen_aiservice::GenerationBackend;
use animagen_core::generation::ContentType;
use animagen_core::metadata::OutputMetadata;
use animagen_core::queue_policy::QueuePolicy;
use animagen_core::types::DbId;
use animagen_db::models::generated_output::CompleteOutput;
use animagen_events::{EventBus, GenerationNotice, UserNotification};

use crate::dispatcher::QueueSignals;
use crate::error::{ProcessError, QueueError};
use crate::job::QueuedJob;
use crate::store::{JobQueue, OutputStore};

/// How often idle workers look for delayed retries that became due.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Tries at writing an output's final `FAILED` state before giving up.
const FAIL_WRITE_ATTEMPTS: u32 = 3;
const FAIL_WRITE_BACKOFF: Duration = Duration::from_millis(500);

pub struct JobProcessor {
    content_type: ContentType,
    policy: QueuePolicy,
    queue: Arc<dyn JobQueue>,
    outputs: Arc<dyn OutputStore>,
    backend: Arc<dyn GenerationBackend>,
    event_bus: Arc<EventBus>,
    wake: Arc<Notify>,
}

/// What became of one claimed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Retrying,
    Failed,
    /// The output was already terminal; nothing was run.
    Dropped,
    /// The final failure could not be written. The job stays active and is
    /// requeued by stalled-job recovery.
    Unresolved,
}

impl JobProcessor {
    pub fn new(
        content_type: ContentType,
        queue: Arc<dyn JobQueue>,
        outputs: Arc<dyn OutputStore>,
        backend: Arc<dyn GenerationBackend>,
        event_bus: Arc<EventBus>,
        signals: &QueueSignals,
    ) -> Self {
        Self {
            content_type,
            policy: QueuePolicy::for_type(content_type),
            queue,
            outputs,
            backend,
            event_bus,
            wake: signals.for_type(content_type),
        }
    }

    /// Start the pool's workers.
    ///
    /// Cancelling `cancel` stops workers from claiming new jobs; a job
    /// already running is finished first.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        tracing::info!(
            queue = self.content_type.queue_name(),
            concurrency = self.policy.concurrency,
            timeout_secs = self.policy.timeout.as_secs(),
            "Job processor started",
        );

        (0..self.policy.concurrency)
            .map(|worker| tokio::spawn(Arc::clone(&self).run_worker(worker, cancel.clone())))
            .collect()
    }

    async fn run_worker(self: Arc<Self>, worker: usize, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.process_next().await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(
                        queue = self.content_type.queue_name(),
                        worker,
                        error = %e,
                        "Failed to claim job",
                    );
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.wake.notified() => {}
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }

        tracing::info!(queue = self.content_type.queue_name(), worker, "Worker stopped");
    }

    /// Claim and process one job. `None` when the queue has nothing due.
    pub async fn process_next(&self) -> Result<Option<JobOutcome>, QueueError> {
        let Some(job) = self.queue.claim(self.content_type).await? else {
            return Ok(None);
        };

        // More may be waiting; let an idle sibling look.
        self.wake.notify_one();

        let span = tracing::info_span!(
            "generation_job",
            job_id = job.id,
            output_id = job.payload.output_id,
            queue = self.content_type.queue_name(),
            attempt = job.attempts_made,
        );
        Ok(Some(self.process(job).instrument(span).await))
    }

    async fn process(&self, job: QueuedJob) -> JobOutcome {
        let output_id = job.payload.output_id;

        match self.outputs.mark_processing(output_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!("Output is no longer pending; dropping job");
                self.finish_queue_job(&job, None).await;
                return JobOutcome::Dropped;
            }
            Err(e) => return self.handle_failure(&job, ProcessError::Persistence(e)).await,
        }

        match self.attempt(&job).await {
            Ok(true) => {
                tracing::info!("Generation completed");
                self.event_bus.publish(UserNotification::for_user(
                    job.payload.user_id,
                    GenerationNotice::completed(output_id, self.content_type),
                ));
                self.finish_queue_job(&job, None).await;
                JobOutcome::Completed
            }
            Ok(false) => {
                tracing::warn!("Output left PROCESSING before the result was stored");
                self.finish_queue_job(&job, None).await;
                JobOutcome::Dropped
            }
            Err(e) => self.handle_failure(&job, e).await,
        }
    }

    /// Run the backend call and persist a successful result.
    ///
    /// `Ok(false)` means the result arrived but the output row no longer
    /// accepted it.
    async fn attempt(&self, job: &QueuedJob) -> Result<bool, ProcessError> {
        let request = job.payload.to_request();
        let started = Instant::now();

        let response = tokio::time::timeout(self.policy.timeout, self.backend.generate(&request))
            .await
            .map_err(|_| ProcessError::Timeout(self.policy.timeout))??;

        let elapsed = started.elapsed().as_secs_f64();
        let metadata = OutputMetadata::from_json(self.content_type, &response.metadata)?;
        tracing::debug!(?metadata, elapsed_secs = elapsed, "Generation result received");

        let result = CompleteOutput {
            file_path: response.file_path,
            thumbnail_path: response.thumbnail_path,
            metadata: response.metadata,
            processing_time_seconds: elapsed,
        };
        Ok(self.outputs.complete(job.payload.output_id, &result).await?)
    }

    async fn handle_failure(&self, job: &QueuedJob, error: ProcessError) -> JobOutcome {
        let message = error.to_string();

        if job.has_attempts_left() {
            let delay = job.next_delay();
            tracing::warn!(
                error = %message,
                attempts_made = job.attempts_made,
                max_attempts = job.max_attempts,
                retry_in_ms = delay.as_millis() as u64,
                "Generation attempt failed; retrying",
            );
            match self.queue.retry_later(job.id, delay, &message).await {
                Ok(()) => return JobOutcome::Retrying,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to reschedule job; failing it now");
                }
            }
        }

        tracing::error!(
            error = %message,
            attempts_made = job.attempts_made,
            "Generation failed permanently",
        );

        match self.record_failure(job.payload.output_id, &message).await {
            Some(true) => {}
            Some(false) => {
                tracing::warn!("Output left PROCESSING before the failure was stored");
                self.finish_queue_job(job, Some(&message)).await;
                return JobOutcome::Dropped;
            }
            None => return JobOutcome::Unresolved,
        }

        self.event_bus.publish(UserNotification::for_user(
            job.payload.user_id,
            GenerationNotice::failed(job.payload.output_id, self.content_type, message.clone()),
        ));
        self.finish_queue_job(job, Some(&message)).await;
        JobOutcome::Failed
    }

    /// Write the output's `FAILED` state, retrying transient store errors.
    ///
    /// A row still `PENDING` (its claim-time update was lost) is moved
    /// through `PROCESSING` first. `None` when every try failed.
    async fn record_failure(&self, output_id: DbId, message: &str) -> Option<bool> {
        let mut delay = FAIL_WRITE_BACKOFF;
        for attempt in 1..=FAIL_WRITE_ATTEMPTS {
            let written = match self.outputs.mark_processing(output_id).await {
                Ok(_) => self.outputs.fail(output_id, message).await,
                Err(e) => Err(e),
            };
            match written {
                Ok(updated) => return Some(updated),
                Err(e) if attempt < FAIL_WRITE_ATTEMPTS => {
                    tracing::warn!(error = %e, attempt, "Failed to mark output failed; retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        "Failed to mark output failed; leaving job for recovery",
                    );
                }
            }
        }
        None
    }

    /// Move the queue row to its terminal state and apply retention.
    async fn finish_queue_job(&self, job: &QueuedJob, error: Option<&str>) {
        let result = match error {
            None => self.queue.complete(job.id).await,
            Some(error) => self.queue.fail(job.id, error).await,
        };
        if let Err(e) = result {
            tracing::error!(error = %e, "Failed to finish queue job");
        }
        if let Err(e) = self.queue.prune(self.content_type).await {
            tracing::warn!(error = %e, "Failed to prune finished jobs");
        }
    }
}

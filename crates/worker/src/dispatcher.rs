//! Job dispatcher: routes generation jobs to the image or video queue.
//!
//! Enqueueing only writes the queue row and wakes an idle worker of the
//! matching pool; it never waits for the job to run.

use std::sync::Arc;

use tokio::sync::Notify;
use animagen_core::generation::ContentType;
use animagen_core::queue_policy::QueuePolicy;

use crate::error::QueueError;
use crate::job::{GenerationJob, JobHandle};
use crate::store::JobQueue;

/// Wake-up signals shared between the dispatcher and the worker pools.
#[derive(Clone, Default)]
pub struct QueueSignals {
    image: Arc<Notify>,
    video: Arc<Notify>,
}

impl QueueSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_type(&self, content_type: ContentType) -> Arc<Notify> {
        match content_type {
            ContentType::Image => Arc::clone(&self.image),
            ContentType::Video => Arc::clone(&self.video),
        }
    }
}

pub struct JobDispatcher {
    queue: Arc<dyn JobQueue>,
    signals: QueueSignals,
}

impl JobDispatcher {
    pub fn new(queue: Arc<dyn JobQueue>, signals: QueueSignals) -> Self {
        Self { queue, signals }
    }

    /// Queue a job under its content type's default policy.
    pub async fn enqueue(&self, job: GenerationJob) -> Result<JobHandle, QueueError> {
        let content_type = job.content_type;
        if job.style.content_type() != content_type {
            return Err(QueueError::InvalidJob(format!(
                "{} job carries {} style parameters",
                content_type,
                job.style.content_type(),
            )));
        }

        let policy = QueuePolicy::for_type(content_type);
        let job_id = self.queue.push(&job, &policy).await?;

        tracing::info!(
            job_id,
            output_id = job.output_id,
            user_id = job.user_id,
            queue = content_type.queue_name(),
            priority = policy.priority,
            "Generation job enqueued",
        );

        self.signals.for_type(content_type).notify_one();

        Ok(JobHandle {
            job_id,
            queue: content_type.queue_name(),
            content_type,
            output_id: job.output_id,
        })
    }

    pub fn queue(&self) -> &Arc<dyn JobQueue> {
        &self.queue
    }
}

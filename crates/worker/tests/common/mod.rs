//! Shared harness for worker pool tests.
//!
//! Wires both pools to in-memory stores and a [`ScriptedBackend`] whose
//! behaviour is chosen per output id.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use animagen_aiservice::{GenerationApiError, GenerationBackend, GenerationRequest, GenerationResponse};
use animagen_core::generation::ContentType;
use animagen_core::queue_policy::QueuePolicy;
use animagen_core::style::StyleParameters;
use animagen_core::types::DbId;
use animagen_db::models::generated_output::CompleteOutput;
use animagen_db::models::generation_job::QueueCounts;
use animagen_events::EventBus;
use animagen_worker::memory::{InMemoryJobQueue, InMemoryOutputStore};
use animagen_worker::{
    GenerationJob, JobDispatcher, JobHandle, JobProcessor, JobQueue, OutputStore, QueueError,
    QueueSignals, QueuedJob,
};

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Return a result after the given delay.
    Succeed(Duration),
    /// Answer with an HTTP 500.
    Fail,
    /// Never answer.
    Hang,
}

pub struct ScriptedBackend {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    default_step: Step,
    calls: AtomicUsize,
    events: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(default_step: Step) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default_step,
            calls: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Steps for one output, used in order before falling back to the default.
    pub fn script(&self, output_id: DbId, steps: &[Step]) {
        self.scripts
            .lock()
            .unwrap()
            .insert(output_id.to_string(), steps.iter().copied().collect());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `"start <output_id>"` / `"end <output_id>"` in the order they happened.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn next_step(&self, output_id: &str) -> Step {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(output_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(self.default_step)
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output_id = request.output_id().to_string();
        self.record(format!("start {output_id}"));

        match self.next_step(&output_id) {
            Step::Succeed(delay) => {
                tokio::time::sleep(delay).await;
                self.record(format!("end {output_id}"));
                let ext = match request.content_type() {
                    ContentType::Image => "png",
                    ContentType::Video => "mp4",
                };
                Ok(GenerationResponse {
                    output_id: Some(output_id.clone()),
                    file_path: format!("/outputs/{output_id}.{ext}"),
                    thumbnail_path: Some(format!("/thumbnails/{output_id}.png")),
                    metadata: serde_json::json!({"w": 512, "h": 512}),
                    processing_time: Some(delay.as_secs_f64()),
                })
            }
            Step::Fail => {
                self.record(format!("end {output_id}"));
                Err(GenerationApiError::ApiError {
                    status: 500,
                    body: "model crashed".to_string(),
                })
            }
            Step::Hang => std::future::pending().await,
        }
    }
}

// ---------------------------------------------------------------------------
// Failing stores
// ---------------------------------------------------------------------------

fn store_down() -> QueueError {
    QueueError::Database(sqlx::Error::PoolTimedOut)
}

/// Delegates to an in-memory queue but cannot reschedule jobs.
pub struct NoRetryQueue(pub Arc<InMemoryJobQueue>);

#[async_trait]
impl JobQueue for NoRetryQueue {
    async fn push(&self, job: &GenerationJob, policy: &QueuePolicy) -> Result<DbId, QueueError> {
        self.0.push(job, policy).await
    }

    async fn claim(&self, content_type: ContentType) -> Result<Option<QueuedJob>, QueueError> {
        self.0.claim(content_type).await
    }

    async fn complete(&self, job_id: DbId) -> Result<(), QueueError> {
        self.0.complete(job_id).await
    }

    async fn fail(&self, job_id: DbId, error: &str) -> Result<(), QueueError> {
        self.0.fail(job_id, error).await
    }

    async fn retry_later(&self, _: DbId, _: Duration, _: &str) -> Result<(), QueueError> {
        Err(store_down())
    }

    async fn recover_stalled(&self) -> Result<u64, QueueError> {
        self.0.recover_stalled().await
    }

    async fn prune(&self, content_type: ContentType) -> Result<(), QueueError> {
        self.0.prune(content_type).await
    }

    async fn counts(&self, content_type: ContentType) -> Result<QueueCounts, QueueError> {
        self.0.counts(content_type).await
    }
}

/// Delegates to an in-memory output store; the first `fail_errors` calls
/// to `fail` return an error.
pub struct FlakyFailOutputs {
    pub inner: Arc<InMemoryOutputStore>,
    fail_errors: AtomicUsize,
}

impl FlakyFailOutputs {
    pub fn new(inner: Arc<InMemoryOutputStore>, fail_errors: usize) -> Self {
        Self {
            inner,
            fail_errors: AtomicUsize::new(fail_errors),
        }
    }
}

#[async_trait]
impl OutputStore for FlakyFailOutputs {
    async fn mark_processing(&self, output_id: DbId) -> Result<bool, QueueError> {
        self.inner.mark_processing(output_id).await
    }

    async fn complete(&self, output_id: DbId, input: &CompleteOutput) -> Result<bool, QueueError> {
        self.inner.complete(output_id, input).await
    }

    async fn fail(&self, output_id: DbId, error: &str) -> Result<bool, QueueError> {
        let left = self
            .fail_errors
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if left.is_ok() {
            return Err(store_down());
        }
        self.inner.fail(output_id, error).await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub queue: Arc<InMemoryJobQueue>,
    pub outputs: Arc<InMemoryOutputStore>,
    pub backend: Arc<ScriptedBackend>,
    pub event_bus: Arc<EventBus>,
    pub dispatcher: JobDispatcher,
    signals: QueueSignals,
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl Harness {
    /// Build the stores and dispatcher without starting any workers.
    pub fn new(backend: ScriptedBackend) -> Self {
        let queue = Arc::new(InMemoryJobQueue::new());
        let signals = QueueSignals::new();
        Self {
            dispatcher: JobDispatcher::new(queue.clone(), signals.clone()),
            queue,
            outputs: Arc::new(InMemoryOutputStore::new()),
            backend: Arc::new(backend),
            event_bus: Arc::new(EventBus::default()),
            signals,
            cancel: CancellationToken::new(),
            workers: Vec::new(),
        }
    }

    /// Build the harness with both pools running.
    pub fn start(backend: ScriptedBackend) -> Self {
        let mut harness = Self::new(backend);
        for content_type in ContentType::ALL {
            let processor = Arc::new(harness.processor(content_type));
            harness.workers.extend(processor.spawn(harness.cancel.clone()));
        }
        harness
    }

    pub fn processor(&self, content_type: ContentType) -> JobProcessor {
        self.processor_with(content_type, self.queue.clone(), self.outputs.clone())
    }

    /// A processor sharing this harness's backend and bus but running
    /// against the given stores.
    pub fn processor_with(
        &self,
        content_type: ContentType,
        queue: Arc<dyn JobQueue>,
        outputs: Arc<dyn OutputStore>,
    ) -> JobProcessor {
        JobProcessor::new(
            content_type,
            queue,
            outputs,
            self.backend.clone(),
            self.event_bus.clone(),
            &self.signals,
        )
    }

    /// Create a pending output for `user_id` and enqueue its job.
    pub async fn submit(&self, user_id: DbId, content_type: ContentType, prompt: &str) -> JobHandle {
        let output_id = self.outputs.create(user_id, content_type);
        self.dispatcher
            .enqueue(GenerationJob {
                user_id,
                prompt_id: output_id,
                output_id,
                content_type,
                prompt_text: prompt.to_string(),
                style: StyleParameters::default_for(content_type),
                audio_track_id: None,
            })
            .await
            .expect("enqueue")
    }

    /// Stop claiming and wait for in-flight jobs to finish.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        for worker in self.workers.drain(..) {
            worker.await.expect("worker panicked");
        }
    }
}

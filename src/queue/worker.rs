/*!
 * Worker pool for durable job execution.
 *
 * A fixed-size pool of workers claims queued jobs from the store and runs the
 * translation processor against each. The pool owns the retry/backoff policy
 * and the terminal-state contract: every claimed job eventually reaches
 * `completed` or `failed`, and that terminal event is published exactly once.
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::task::JoinHandle;

use crate::errors::PipelineError;
use crate::events::{EventBus, ProgressEvent};
use crate::queue::models::{Job, RetryPolicy};
use crate::queue::store::JobStore;

/// How long an idle worker waits before polling the queue again
const CLAIM_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Stage-reporting context threaded through the processor.
///
/// Carries the job id plus handles to the store and bus so one `report_stage`
/// call updates the persisted progress field and publishes the bus event
/// together, keeping the two views consistent for external observers.
#[derive(Clone)]
pub struct StageReporter {
    job_id: String,
    store: JobStore,
    bus: EventBus,
}

impl StageReporter {
    /// Build a reporter for one job
    pub fn new(job_id: &str, store: JobStore, bus: EventBus) -> Self {
        Self {
            job_id: job_id.to_string(),
            store,
            bus,
        }
    }

    /// Job this reporter belongs to
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Record a stage transition: persist the label and publish it.
    ///
    /// A store failure here is logged but does not abort the pipeline;
    /// progress labels are advisory.
    pub async fn report_stage(&self, stage: &str) {
        debug!("Job {}: {}", &self.job_id[..8.min(self.job_id.len())], stage);

        if let Err(e) = self.store.update_progress(&self.job_id, stage).await {
            warn!("Failed to persist progress for job {}: {}", self.job_id, e);
        }

        self.bus.publish(
            &self.job_id,
            ProgressEvent::Progress {
                stage: stage.to_string(),
            },
        );
    }

    /// Publish a non-stage event (e.g. the assembled blueprint)
    pub fn publish(&self, event: ProgressEvent) {
        self.bus.publish(&self.job_id, event);
    }
}

/// Processor executed by the pool for each claimed job.
///
/// Returns the job's rendered result on success; any error unwinds here and
/// the pool alone decides between retry and terminal failure.
#[async_trait]
pub trait JobProcessor: Send + Sync + 'static {
    /// Run the full pipeline for one job
    async fn process(&self, job: &Job, reporter: &StageReporter) -> Result<String, PipelineError>;
}

/// Fixed-size pool of job workers
pub struct WorkerPool {
    store: JobStore,
    bus: EventBus,
    processor: Arc<dyn JobProcessor>,
    policy: RetryPolicy,
    size: usize,
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Create a pool of `size` workers (at least one)
    pub fn new(
        store: JobStore,
        bus: EventBus,
        processor: Arc<dyn JobProcessor>,
        policy: RetryPolicy,
        size: usize,
    ) -> Self {
        Self {
            store,
            bus,
            processor,
            policy,
            size: size.max(1),
            shutdown: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
        }
    }

    /// Spawn the worker tasks.
    ///
    /// Workers share no mutable state beyond the store and the bus; each loops
    /// claim → process → settle until shutdown.
    pub fn start(&mut self) {
        info!("Starting worker pool with {} worker(s)", self.size);

        for worker_id in 0..self.size {
            let store = self.store.clone();
            let bus = self.bus.clone();
            let processor = self.processor.clone();
            let policy = self.policy.clone();
            let shutdown = self.shutdown.clone();

            self.handles.push(tokio::spawn(async move {
                worker_loop(worker_id, store, bus, processor, policy, shutdown).await;
            }));
        }
    }

    /// Signal workers to stop after their current job and wait for them
    pub async fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);

        let handles: Vec<JoinHandle<()>> = self.handles.drain(..).collect();
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!("Worker task failed during shutdown: {e}");
            }
        }
    }
}

/// Claim/process loop for one worker
async fn worker_loop(
    worker_id: usize,
    store: JobStore,
    bus: EventBus,
    processor: Arc<dyn JobProcessor>,
    policy: RetryPolicy,
    shutdown: Arc<AtomicBool>,
) {
    debug!("Worker {worker_id} started");

    while !shutdown.load(Ordering::SeqCst) {
        let claimed = match store.claim().await {
            Ok(claimed) => claimed,
            Err(e) => {
                error!("Worker {worker_id}: claim failed: {e}");
                tokio::time::sleep(CLAIM_POLL_INTERVAL).await;
                continue;
            }
        };

        match claimed {
            Some(job) => run_job(&store, &bus, processor.as_ref(), &policy, job).await,
            None => tokio::time::sleep(CLAIM_POLL_INTERVAL).await,
        }
    }

    debug!("Worker {worker_id} stopped");
}

/// Execute one claimed job and settle its outcome.
///
/// On success the result is persisted before the `completed` event goes out.
/// On failure the policy decides: attempts remaining means a re-enqueue gated
/// by the backoff delay; exhaustion means terminal `failed` plus the single
/// `failed` event carrying only the summarized message.
async fn run_job(
    store: &JobStore,
    bus: &EventBus,
    processor: &dyn JobProcessor,
    policy: &RetryPolicy,
    job: Job,
) {
    let reporter = StageReporter::new(&job.id, store.clone(), bus.clone());
    info!(
        "Processing job {} (attempt {} of {})",
        &job.id[..8],
        job.attempts,
        policy.max_attempts
    );

    match processor.process(&job, &reporter).await {
        Ok(result) => {
            if let Err(e) = store.mark_completed(&job.id, &result).await {
                error!("Failed to persist completion of job {}: {}", job.id, e);
            }
            bus.publish(&job.id, ProgressEvent::Completed { result });
            info!("Job {} completed", &job.id[..8]);
        }
        Err(pipeline_error) => {
            let message = pipeline_error.to_string();

            if job.attempts < policy.max_attempts {
                let delay = policy.backoff(job.attempts);
                let available_at = Utc::now()
                    + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());

                warn!(
                    "Job {} attempt {} failed ({}), retrying in {:?}",
                    &job.id[..8],
                    job.attempts,
                    message,
                    delay
                );

                if let Err(e) = store.requeue(&job.id, &message, available_at).await {
                    error!("Failed to requeue job {}: {}", job.id, e);
                }
            } else {
                error!(
                    "Job {} failed terminally after {} attempt(s): {}",
                    &job.id[..8],
                    job.attempts,
                    message
                );

                if let Err(e) = store.mark_failed(&job.id, &message).await {
                    error!("Failed to persist failure of job {}: {}", job.id, e);
                }
                bus.publish(&job.id, ProgressEvent::Failed { error: message });
            }
        }
    }
}

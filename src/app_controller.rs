/*!
 * Application controller.
 *
 * Wires configuration into the concrete services (AI gateway, context memory,
 * job store, event bus, worker pool) and exposes the two external surfaces:
 * synchronous job submission and per-job event subscription. The HTTP layer
 * and client bridges sit on top of this facade.
 */

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use crate::app_config::Config;
use crate::events::{EventBus, Subscription};
use crate::memory::{ContextMemory, PineconeIndex, VectorIndex};
use crate::providers::{AiProvider, GeminiClient};
use crate::queue::models::{Job, JobPayload, RetryPolicy};
use crate::queue::store::JobStore;
use crate::queue::worker::{JobProcessor, WorkerPool};
use crate::translation::blueprint::UserGlossaryEntry;
use crate::translation::pipeline::{PipelineConfig, TranslationPipeline};

/// Options accompanying a submission
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    /// Desired tone of the translation
    pub tone: String,
    /// Route every line to the deep tier
    pub thinking_mode: bool,
    /// User-mandated term translations
    pub user_glossary: Vec<UserGlossaryEntry>,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            tone: "Neutral".to_string(),
            thinking_mode: false,
            user_glossary: Vec::new(),
        }
    }
}

/// Main application controller
pub struct Controller {
    store: JobStore,
    bus: EventBus,
    pool: WorkerPool,
}

impl Controller {
    /// Build a controller from configuration.
    ///
    /// Validates credentials up front: a process with no usable gateway key or
    /// index identity must fail here, not when the first job runs.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let provider: Arc<dyn AiProvider> = Arc::new(
            GeminiClient::new(
                config.gemini.api_key.clone(),
                config.gemini.endpoint.clone(),
                config.gemini.embedding_model.clone(),
            )
            .context("Failed to build AI gateway")?,
        );

        let index: Arc<dyn VectorIndex> = Arc::new(
            PineconeIndex::new(
                config.pinecone.index_host.clone(),
                config.pinecone.api_key.clone(),
            )
            .context("Failed to build vector index client")?,
        );

        let store = match &config.queue.database_path {
            Some(path) => JobStore::new(path)?,
            None => JobStore::new_default()?,
        };

        let pipeline_config = PipelineConfig {
            batch_size: config.pipeline.batch_size,
            context_top_k: config.pipeline.context_top_k,
            fast_model: config.gemini.fast_model.clone(),
            deep_model: config.gemini.deep_model.clone(),
        };

        let policy = RetryPolicy {
            max_attempts: config.queue.max_attempts,
            base_delay: std::time::Duration::from_secs(config.queue.base_delay_secs),
            jitter: true,
        };

        Ok(Self::with_components(
            provider,
            index,
            store,
            pipeline_config,
            policy,
            config.queue.worker_count,
        ))
    }

    /// Assemble a controller from pre-built components.
    ///
    /// This is the seam tests use to substitute scripted providers and an
    /// in-process vector index for the remote services.
    pub fn with_components(
        provider: Arc<dyn AiProvider>,
        index: Arc<dyn VectorIndex>,
        store: JobStore,
        pipeline_config: PipelineConfig,
        policy: RetryPolicy,
        worker_count: usize,
    ) -> Self {
        let bus = EventBus::new();
        let memory = ContextMemory::new(provider.clone(), index);
        let pipeline: Arc<dyn JobProcessor> =
            Arc::new(TranslationPipeline::new(provider, memory, pipeline_config));

        let pool = WorkerPool::new(
            store.clone(),
            bus.clone(),
            pipeline,
            policy,
            worker_count,
        );

        Self { store, bus, pool }
    }

    /// Recover interrupted jobs and start the worker pool
    pub async fn start(&mut self) -> Result<()> {
        let recovered = self.store.recover_interrupted().await?;
        if recovered > 0 {
            info!("Requeued {recovered} job(s) interrupted by a previous run");
        }

        self.pool.start();
        Ok(())
    }

    /// Submit a translation job; returns its id without waiting for processing
    pub async fn submit(&self, subtitle_content: String, options: SubmitOptions) -> Result<String> {
        let payload = JobPayload {
            subtitle_content,
            tone: options.tone,
            thinking_mode: options.thinking_mode,
            user_glossary: options.user_glossary,
        };

        Ok(self.store.submit(payload).await?)
    }

    /// Subscribe a live listener to a job's event stream
    pub fn subscribe(&self, job_id: &str) -> Subscription {
        self.bus.subscribe(job_id)
    }

    /// Fetch the persisted state of a job
    pub async fn job(&self, job_id: &str) -> Result<Job> {
        Ok(self.store.get(job_id).await?)
    }

    /// List the most recent jobs, newest first
    pub async fn list_jobs(&self, limit: usize) -> Result<Vec<Job>> {
        Ok(self.store.list(limit).await?)
    }

    /// Stop workers after their current job and wait for them
    pub async fn shutdown(&mut self) -> Result<()> {
        self.pool.shutdown().await;
        Ok(())
    }
}

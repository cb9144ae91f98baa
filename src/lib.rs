/*!
 * # kalque - Culturally-Adaptive Subtitle Translation
 *
 * A Rust library that turns an uploaded subtitle file into a culturally-adapted
 * translation through a multi-phase, AI-assisted pipeline, streaming live
 * progress to subscribed clients while the work runs in the background.
 *
 * ## Features
 *
 * - Durable job queue with at-least-once delivery and bounded retries
 * - Multi-phase orchestration: blueprint synthesis, batched translation with
 *   per-line model-tier triage, long-term context retrieval
 * - Per-job vector memory: lines are embedded, indexed, queried for context,
 *   and purged on completion
 * - Process-local progress event bus bridging workers to live subscribers
 * - Tolerant subtitle parsing that degrades instead of failing
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Subtitle parsing and rendering
 * - `providers`: AI capability gateway (structured JSON, free text, embeddings)
 * - `memory`: Per-job vector context memory store
 * - `events`: Progress event bus (publish/subscribe keyed by job id)
 * - `queue`: Durable job store, retry policy, and worker pool
 * - `translation`: Blueprint model, prompt templates, and the pipeline
 *   orchestrator
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod events;
pub mod memory;
pub mod providers;
pub mod queue;
pub mod subtitle_processor;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, SubmitOptions};
pub use errors::{AiError, AppError, MemoryError, PipelineError, QueueError};
pub use events::{EventBus, ProgressEvent, Subscription};
pub use memory::ContextMemory;
pub use queue::{Job, JobPayload, JobStatus, JobStore, RetryPolicy, WorkerPool};
pub use subtitle_processor::{SubtitleCollection, SubtitleLine, TranslatedLine};
pub use translation::{TranslationBlueprint, TranslationPipeline};

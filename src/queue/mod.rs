/*!
 * Durable job queue and worker pool.
 *
 * This module provides SQLite-backed persistence for translation jobs and the
 * worker execution model on top of it:
 * - `models`: job entities and the retry policy contract
 * - `store`: the durable, claim-serialized job store
 * - `worker`: the worker pool, stage reporter, and processor trait
 */

pub mod models;
pub mod store;
pub mod worker;

// Re-export main types
pub use models::{Job, JobPayload, JobStatus, RetryPolicy};
pub use store::JobStore;
pub use worker::{JobProcessor, StageReporter, WorkerPool};

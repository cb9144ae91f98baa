/*!
 * Job queue entity models.
 *
 * These structures map to the persisted `jobs` table and define the retry
 * policy contract the worker pool executes against.
 */

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::translation::blueprint::UserGlossaryEntry;

/// Lifecycle status of a queued job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting to be claimed by a worker
    Queued,
    /// Claimed and currently being processed
    Active,
    /// Finished successfully; result stored
    Completed,
    /// Attempts exhausted or terminal error
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Active => write!(f, "active"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(JobStatus::Queued),
            "active" => Ok(JobStatus::Active),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Submission payload carried by a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    /// Raw subtitle content to translate
    pub subtitle_content: String,

    /// Desired tone of the translation (e.g. "Casual", "Formal")
    pub tone: String,

    /// When set, every line is translated on the deep tier and triage is skipped
    #[serde(default)]
    pub thinking_mode: bool,

    /// User-mandated term translations
    #[serde(default)]
    pub user_glossary: Vec<UserGlossaryEntry>,
}

/// A persisted translation job
#[derive(Debug, Clone)]
pub struct Job {
    /// Opaque unique id
    pub id: String,

    /// Submission payload
    pub payload: JobPayload,

    /// Current lifecycle status
    pub status: JobStatus,

    /// Number of processing attempts so far
    pub attempts: u32,

    /// Message of the most recent failure, if any
    pub last_error: Option<String>,

    /// Human-readable label of the current pipeline stage
    pub progress: String,

    /// Rendered output, present once completed
    pub result: Option<String>,

    /// When the job was submitted
    pub created_at: DateTime<Utc>,

    /// When the job row last changed
    pub updated_at: DateTime<Utc>,
}

/// Retry and backoff policy executed by the worker pool.
///
/// Passed into the pool constructor rather than hardcoded, so tests and
/// deployments can tune attempt counts and delays independently.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts allowed per job (first run included)
    pub max_attempts: u32,

    /// Delay before the first retry; doubles per subsequent attempt
    pub base_delay: Duration,

    /// Add up to 10% random jitter to each delay
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy with no jitter and a tiny base delay, for tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(10),
            jitter: false,
        }
    }

    /// Backoff before retrying after the given completed attempt (1-based).
    ///
    /// Exponential: `base_delay * 2^(attempt - 1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self.base_delay.saturating_mul(1u32 << exponent);

        if !self.jitter {
            return base;
        }

        let jitter_factor = rand::rng().random_range(0.0..0.1);
        base + base.mul_f64(jitter_factor)
    }
}

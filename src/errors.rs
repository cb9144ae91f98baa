/*!
 * Error types for the kalque pipeline.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Errors raised by the AI capability gateway.
///
/// Every upstream fault (transport, quota, safety block, malformed payload)
/// collapses into this single type so callers never see provider-specific shapes.
#[derive(Error, Debug)]
pub enum AiError {
    /// Error when making an API request fails
    #[error("AI request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse AI response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("AI service responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Generation stopped by the provider's safety filters
    #[error("AI generation blocked by safety settings: {0}")]
    SafetyBlocked(String),

    /// Response contained no usable candidate
    #[error("AI returned an empty response")]
    EmptyResponse,
}

/// Errors that can occur in the context memory store
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Embedding call failed while building or querying the index
    #[error("Embedding failed: {0}")]
    Embedding(#[from] AiError),

    /// Vector upsert failed; the whole index operation is aborted
    #[error("Vector upsert failed for namespace {namespace}: {message}")]
    UpsertFailed {
        /// Job namespace being written
        namespace: String,
        /// Underlying failure description
        message: String,
    },

    /// Vector query failed
    #[error("Vector query failed for namespace {namespace}: {message}")]
    QueryFailed {
        /// Job namespace being searched
        namespace: String,
        /// Underlying failure description
        message: String,
    },
}

/// Errors that can occur during pipeline orchestration
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The assembled blueprint is unusable (missing required glossary)
    #[error("AI returned an invalid blueprint: {0}")]
    InvalidBlueprint(String),

    /// Error from the AI gateway
    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    /// Error from the context memory store
    #[error("Context memory error: {0}")]
    Memory(#[from] MemoryError),
}

/// Errors that can occur in the job queue and worker pool
#[derive(Error, Debug)]
pub enum QueueError {
    /// Error from the backing store
    #[error("Job store error: {0}")]
    Store(String),

    /// Job id not present in the store
    #[error("Unknown job id: {0}")]
    UnknownJob(String),

    /// Job payload could not be serialized or deserialized
    #[error("Job payload error: {0}")]
    Payload(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration problem detected at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from the AI gateway
    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    /// Error from the context memory store
    #[error("Context memory error: {0}")]
    Memory(#[from] MemoryError),

    /// Error from pipeline orchestration
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Error from the job queue
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<rusqlite::Error> for QueueError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Store(error.to_string())
    }
}

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Application configuration module
/// Handles loading, validating and defaulting configuration for the
/// translation service: AI gateway credentials, vector index identity,
/// queue/worker tuning, and log verbosity.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// AI gateway settings
    pub gemini: GeminiConfig,

    /// Vector index settings
    pub pinecone: PineconeConfig,

    /// Pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Queue and worker tuning
    #[serde(default)]
    pub queue: QueueSettings,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Gemini gateway configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeminiConfig {
    /// API key; falls back to the GEMINI_API_KEY environment variable
    #[serde(default = "String::new")]
    pub api_key: String,

    /// API endpoint override, empty for the public API
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Model id for the fast tier
    #[serde(default = "default_fast_model")]
    pub fast_model: String,

    /// Model id for the deep tier
    #[serde(default = "default_deep_model")]
    pub deep_model: String,

    /// Model id for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

/// Pinecone index configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PineconeConfig {
    /// Index host URL; falls back to the PINECONE_INDEX_HOST environment variable
    #[serde(default = "String::new")]
    pub index_host: String,

    /// API key; falls back to the PINECONE_API_KEY environment variable
    #[serde(default = "String::new")]
    pub api_key: String,
}

/// Pipeline tuning knobs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineSettings {
    /// Lines per translation batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Context lines retrieved per translated line
    #[serde(default = "default_context_top_k")]
    pub context_top_k: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            context_top_k: default_context_top_k(),
        }
    }
}

/// Queue and worker tuning knobs
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QueueSettings {
    /// Explicit database path; the platform data directory when unset
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Number of concurrent workers
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Total attempts allowed per job
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base retry delay in seconds, doubling per attempt
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            worker_count: default_worker_count(),
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
        }
    }
}

/// Log level configuration
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level
    #[default]
    Info,
    /// Debug level
    Debug,
    /// Trace level
    Trace,
}

impl LogLevel {
    /// Convert to the log crate's level filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_fast_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_deep_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

fn default_batch_size() -> usize {
    15
}

fn default_context_top_k() -> usize {
    5
}

fn default_worker_count() -> usize {
    1
}

fn default_max_attempts() -> u32 {
    2
}

fn default_base_delay_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig {
                api_key: String::new(),
                endpoint: String::new(),
                fast_model: default_fast_model(),
                deep_model: default_deep_model(),
                embedding_model: default_embedding_model(),
            },
            pinecone: PineconeConfig {
                index_host: String::new(),
                api_key: String::new(),
            },
            pipeline: PipelineSettings::default(),
            queue: QueueSettings::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;

        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path.display(), e))?;

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from the given file if it exists, defaults plus env otherwise
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let mut config = Config::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Credentials from the environment take precedence over file values
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.is_empty() {
                self.gemini.api_key = key;
            }
        }
        if let Ok(key) = std::env::var("PINECONE_API_KEY") {
            if !key.is_empty() {
                self.pinecone.api_key = key;
            }
        }
        if let Ok(host) = std::env::var("PINECONE_INDEX_HOST") {
            if !host.is_empty() {
                self.pinecone.index_host = host;
            }
        }
    }

    /// Validate the configuration, failing fast on missing credentials.
    ///
    /// The process must not start accepting jobs without a usable gateway key
    /// and vector index identity.
    pub fn validate(&self) -> Result<()> {
        if self.gemini.api_key.trim().is_empty() {
            return Err(anyhow!(
                "Gemini API key is required (config gemini.api_key or GEMINI_API_KEY)"
            ));
        }
        if self.pinecone.index_host.trim().is_empty() {
            return Err(anyhow!(
                "Vector index host is required (config pinecone.index_host or PINECONE_INDEX_HOST)"
            ));
        }
        if self.pinecone.api_key.trim().is_empty() {
            return Err(anyhow!(
                "Vector index API key is required (config pinecone.api_key or PINECONE_API_KEY)"
            ));
        }
        if self.queue.worker_count == 0 {
            return Err(anyhow!("queue.worker_count must be at least 1"));
        }
        if self.pipeline.batch_size == 0 {
            return Err(anyhow!("pipeline.batch_size must be at least 1"));
        }

        Ok(())
    }
}

/*!
 * AI capability gateway.
 *
 * This module exposes the three generation capabilities the pipeline consumes:
 * - structured JSON generation from a prompt
 * - free-text generation from a prompt
 * - batch embedding of texts
 *
 * All implementations wrap upstream faults into the single [`AiError`] type and
 * apply consistent safety configuration, so callers never deal with
 * provider-specific shapes.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::errors::AiError;

/// Quality tier of the generation model handling a call.
///
/// The gateway never picks a tier itself; callers resolve a tier to a concrete
/// model identifier through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Cheap, low-latency model for simple declarative lines
    Fast,
    /// High-quality model for idiom, slang, and nuanced lines
    Deep,
}

impl ModelTier {
    /// Lowercase identifier used in triage payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Deep => "deep",
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModelTier {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "deep" => Ok(Self::Deep),
            other => Err(AiError::ParseError(format!("unknown model tier: {other}"))),
        }
    }
}

/// Common trait for AI generation providers
///
/// Implementations must preserve input order for `embed_batch` (one vector per
/// input text, 1:1) and must fold every upstream failure mode into [`AiError`].
#[async_trait]
pub trait AiProvider: Send + Sync + Debug {
    /// Generate a JSON value from a prompt using the named model
    async fn generate_structured(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<serde_json::Value, AiError>;

    /// Generate free text from a prompt using the named model
    async fn generate_text(&self, model: &str, prompt: &str) -> Result<String, AiError>;

    /// Embed a batch of texts, returning one vector per input in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError>;
}

pub mod gemini;

pub use gemini::GeminiClient;

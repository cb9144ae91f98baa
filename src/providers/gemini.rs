use std::time::Duration;

use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::AiProvider;
use crate::errors::AiError;

/// Default public API endpoint
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Request timeout for generation and embedding calls
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Gemini client for generation and embedding requests
#[derive(Debug)]
pub struct GeminiClient {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL (optional, defaults to public API)
    endpoint: String,
    /// Model used for embedding calls
    embedding_model: String,
}

/// Gemini content generation request
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    /// The conversation contents
    contents: Vec<Content>,

    /// Generation parameters
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,

    /// Safety thresholds applied to every request
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
}

/// One conversation turn
#[derive(Debug, Serialize, Deserialize)]
struct Content {
    /// Content parts (text only in this client)
    parts: Vec<Part>,
}

/// A single content part
#[derive(Debug, Serialize, Deserialize)]
struct Part {
    /// Text payload
    text: String,
}

/// Generation parameters
#[derive(Debug, Serialize)]
struct GenerationConfig {
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Response MIME type; "application/json" forces structured output
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

/// Safety category threshold
#[derive(Debug, Serialize)]
struct SafetySetting {
    /// Harm category identifier
    category: String,
    /// Blocking threshold for the category
    threshold: String,
}

/// Gemini generation response
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    /// Generated candidates
    #[serde(default)]
    candidates: Vec<Candidate>,

    /// Prompt-level feedback (populated when the prompt itself was blocked)
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

/// A single generated candidate
#[derive(Debug, Deserialize)]
struct Candidate {
    /// Candidate content
    content: Option<Content>,

    /// Why generation stopped
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

/// Prompt-level safety feedback
#[derive(Debug, Deserialize)]
struct PromptFeedback {
    /// Block reason when the prompt was rejected
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

/// Batch embedding request
#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    /// One embed request per input text
    requests: Vec<EmbedRequest>,
}

/// Single embedding request within a batch
#[derive(Debug, Serialize)]
struct EmbedRequest {
    /// Fully-qualified model name
    model: String,
    /// Text content to embed
    content: Content,
}

/// Batch embedding response
#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    /// One embedding per request, in request order
    embeddings: Vec<Embedding>,
}

/// A single embedding vector
#[derive(Debug, Deserialize)]
struct Embedding {
    /// Vector components
    values: Vec<f32>,
}

impl GeminiClient {
    /// Create a new Gemini client.
    ///
    /// Fails fast when the API key is empty so a misconfigured process never
    /// starts accepting jobs it cannot run.
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Result<Self, AiError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AiError::RequestFailed(
                "missing Gemini API key".to_string(),
            ));
        }

        let endpoint = endpoint.into();
        let endpoint = if endpoint.is_empty() {
            DEFAULT_ENDPOINT.to_string()
        } else {
            endpoint.trim_end_matches('/').to_string()
        };

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            api_key,
            endpoint,
            embedding_model: embedding_model.into(),
        })
    }

    /// Safety thresholds applied uniformly to every generation request
    fn safety_settings() -> Vec<SafetySetting> {
        [
            "HARM_CATEGORY_HARASSMENT",
            "HARM_CATEGORY_HATE_SPEECH",
            "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ]
        .iter()
        .map(|category| SafetySetting {
            category: category.to_string(),
            threshold: "BLOCK_ONLY_HIGH".to_string(),
        })
        .collect()
    }

    /// Run one generateContent call and extract the first candidate's text
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        response_mime_type: Option<&str>,
    ) -> Result<String, AiError> {
        let api_url = format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, model, self.api_key
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.7),
                response_mime_type: response_mime_type.map(|s| s.to_string()),
            }),
            safety_settings: Self::safety_settings(),
        };

        let response = self
            .client
            .post(&api_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::RequestFailed(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Gemini API error ({}): {}", status, error_text);
            return Err(AiError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        let body = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| AiError::ParseError(format!("invalid Gemini response body: {e}")))?;

        if let Some(feedback) = &body.prompt_feedback {
            if let Some(reason) = &feedback.block_reason {
                return Err(AiError::SafetyBlocked(reason.clone()));
            }
        }

        let candidate = body.candidates.into_iter().next().ok_or(AiError::EmptyResponse)?;

        if let Some(reason) = &candidate.finish_reason {
            if reason == "SAFETY" {
                return Err(AiError::SafetyBlocked(reason.clone()));
            }
        }

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AiError::EmptyResponse);
        }

        Ok(text)
    }
}

#[async_trait]
impl AiProvider for GeminiClient {
    async fn generate_structured(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<serde_json::Value, AiError> {
        let text = self.generate(model, prompt, Some("application/json")).await?;

        serde_json::from_str(&text)
            .map_err(|e| AiError::ParseError(format!("model returned malformed JSON: {e}")))
    }

    async fn generate_text(&self, model: &str, prompt: &str) -> Result<String, AiError> {
        let text = self.generate(model, prompt, None).await?;
        Ok(text.trim().to_string())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let api_url = format!(
            "{}/models/{}:batchEmbedContents?key={}",
            self.endpoint, self.embedding_model, self.api_key
        );

        let model_path = format!("models/{}", self.embedding_model);
        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: model_path.clone(),
                    content: Content {
                        parts: vec![Part { text: text.clone() }],
                    },
                })
                .collect(),
        };

        let response = self
            .client
            .post(&api_url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::RequestFailed(format!("Gemini embed request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Gemini embedding API error ({}): {}", status, error_text);
            return Err(AiError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        let body = response
            .json::<BatchEmbedResponse>()
            .await
            .map_err(|e| AiError::ParseError(format!("invalid embedding response body: {e}")))?;

        if body.embeddings.len() != texts.len() {
            return Err(AiError::ParseError(format!(
                "embedding count mismatch: {} vectors for {} inputs",
                body.embeddings.len(),
                texts.len()
            )));
        }

        Ok(body
            .embeddings
            .into_iter()
            .map(|embedding| embedding.values)
            .collect())
    }
}

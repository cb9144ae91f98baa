use std::time::Duration;

use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::errors::MemoryError;

/// Request timeout for index operations
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// A vector record ready to be written to an index
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    /// Record id, unique within its namespace
    pub id: String,
    /// Embedding vector
    pub values: Vec<f32>,
    /// Original text carried as metadata for retrieval
    pub text: String,
}

/// A scored match returned by a similarity query
#[derive(Debug, Clone)]
pub struct ScoredMatch {
    /// Record id of the match
    pub id: String,
    /// Similarity score
    pub score: f32,
    /// Original text stored with the vector
    pub text: String,
}

/// Vector index capability contract.
///
/// Namespaces partition records per job; implementations must never let a query
/// in one namespace observe vectors written to another.
#[async_trait]
pub trait VectorIndex: Send + Sync + std::fmt::Debug {
    /// Upsert records into a namespace
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<(), MemoryError>;

    /// Query a namespace for the nearest records to a vector
    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredMatch>, MemoryError>;

    /// Delete every record in a namespace
    async fn delete_namespace(&self, namespace: &str) -> Result<(), MemoryError>;
}

/// Pinecone-backed vector index client
#[derive(Debug)]
pub struct PineconeIndex {
    /// HTTP client for index requests
    client: Client,
    /// Index host URL, e.g. `https://my-index-abc123.svc.pinecone.io`
    host: String,
    /// API key for authentication
    api_key: String,
}

/// One match entry in a Pinecone query response
#[derive(Debug, Deserialize)]
struct PineconeMatch {
    /// Record id
    id: String,
    /// Similarity score
    #[serde(default)]
    score: f32,
    /// Stored metadata
    metadata: Option<PineconeMetadata>,
}

/// Metadata payload stored with each vector
#[derive(Debug, Deserialize)]
struct PineconeMetadata {
    /// Original text
    #[serde(default)]
    text: String,
}

/// Pinecone query response body
#[derive(Debug, Deserialize)]
struct PineconeQueryResponse {
    /// Matches ordered by descending score
    #[serde(default)]
    matches: Vec<PineconeMatch>,
}

impl PineconeIndex {
    /// Create a new Pinecone index client.
    ///
    /// Fails fast when the index host or API key is missing.
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Result<Self, MemoryError> {
        let host = host.into();
        let api_key = api_key.into();

        if host.trim().is_empty() {
            return Err(MemoryError::UpsertFailed {
                namespace: String::new(),
                message: "missing vector index host".to_string(),
            });
        }
        if let Err(e) = Url::parse(host.trim()) {
            return Err(MemoryError::UpsertFailed {
                namespace: String::new(),
                message: format!("invalid vector index host {host}: {e}"),
            });
        }
        if api_key.trim().is_empty() {
            return Err(MemoryError::UpsertFailed {
                namespace: String::new(),
                message: "missing vector index API key".to_string(),
            });
        }

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            host: host.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Issue one POST against the index host
    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, String> {
        self.client
            .post(format!("{}{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("index request failed: {e}"))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, namespace: &str, records: Vec<VectorRecord>) -> Result<(), MemoryError> {
        let vectors: Vec<serde_json::Value> = records
            .iter()
            .map(|record| {
                json!({
                    "id": record.id,
                    "values": record.values,
                    "metadata": { "text": record.text },
                })
            })
            .collect();

        let body = json!({ "vectors": vectors, "namespace": namespace });

        let response =
            self.post("/vectors/upsert", body)
                .await
                .map_err(|message| MemoryError::UpsertFailed {
                    namespace: namespace.to_string(),
                    message,
                })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("Vector upsert rejected ({}): {}", status, text);
            return Err(MemoryError::UpsertFailed {
                namespace: namespace.to_string(),
                message: format!("{status}: {text}"),
            });
        }

        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredMatch>, MemoryError> {
        // Namespace filter is mandatory on every query
        let body = json!({
            "vector": vector,
            "topK": top_k,
            "namespace": namespace,
            "includeMetadata": true,
        });

        let response =
            self.post("/query", body)
                .await
                .map_err(|message| MemoryError::QueryFailed {
                    namespace: namespace.to_string(),
                    message,
                })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("Vector query rejected ({}): {}", status, text);
            return Err(MemoryError::QueryFailed {
                namespace: namespace.to_string(),
                message: format!("{status}: {text}"),
            });
        }

        let body: PineconeQueryResponse =
            response
                .json()
                .await
                .map_err(|e| MemoryError::QueryFailed {
                    namespace: namespace.to_string(),
                    message: format!("invalid query response body: {e}"),
                })?;

        Ok(body
            .matches
            .into_iter()
            .map(|m| ScoredMatch {
                id: m.id,
                score: m.score,
                text: m.metadata.map(|meta| meta.text).unwrap_or_default(),
            })
            .collect())
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), MemoryError> {
        let body = json!({ "deleteAll": true, "namespace": namespace });

        let response =
            self.post("/vectors/delete", body)
                .await
                .map_err(|message| MemoryError::UpsertFailed {
                    namespace: namespace.to_string(),
                    message,
                })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MemoryError::UpsertFailed {
                namespace: namespace.to_string(),
                message: format!("namespace delete rejected {status}: {text}"),
            });
        }

        Ok(())
    }
}

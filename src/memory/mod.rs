/*!
 * Long-term context memory store.
 *
 * Wraps a vector index with per-job namespacing: a job's lines are embedded and
 * indexed at the start of translation, queried for nearest-neighbor context
 * while each line is translated, and purged once the job completes.
 */

use std::sync::Arc;

use log::{debug, info, warn};

use crate::errors::MemoryError;
use crate::providers::AiProvider;
use crate::subtitle_processor::SubtitleLine;

pub mod pinecone;

pub use pinecone::{PineconeIndex, ScoredMatch, VectorIndex, VectorRecord};

/// Upsert chunk limit imposed by vector index providers
const UPSERT_CHUNK_SIZE: usize = 100;

/// Returned by [`ContextMemory::query`] when nothing relevant is indexed
pub const NO_CONTEXT_SENTINEL: &str = "No relevant context found.";

/// Default number of context lines retrieved per query
pub const DEFAULT_TOP_K: usize = 5;

/// Context memory store scoped by job namespace
#[derive(Debug, Clone)]
pub struct ContextMemory {
    /// Gateway used for embedding calls
    provider: Arc<dyn AiProvider>,
    /// Backing vector index
    index: Arc<dyn VectorIndex>,
}

impl ContextMemory {
    /// Create a store over the given gateway and index
    pub fn new(provider: Arc<dyn AiProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { provider, index }
    }

    /// Embed and index every line of a job under its namespace.
    ///
    /// Upserts are chunked to stay under provider limits. Any chunk failure
    /// aborts the whole operation: a partially indexed namespace is not a
    /// valid substrate for translation.
    pub async fn index(&self, job_id: &str, lines: &[SubtitleLine]) -> Result<(), MemoryError> {
        if lines.is_empty() {
            debug!("No lines to index for job {job_id}");
            return Ok(());
        }

        let texts: Vec<String> = lines.iter().map(|line| line.text.clone()).collect();

        let mut records = Vec::with_capacity(lines.len());
        for (chunk_start, text_chunk) in texts.chunks(UPSERT_CHUNK_SIZE).enumerate() {
            let vectors = self.provider.embed_batch(text_chunk).await?;

            let offset = chunk_start * UPSERT_CHUNK_SIZE;
            for (i, values) in vectors.into_iter().enumerate() {
                let line = &lines[offset + i];
                records.push(VectorRecord {
                    id: format!("{}-{}", job_id, line.seq_num),
                    values,
                    text: line.text.clone(),
                });
            }
        }

        for chunk in records.chunks(UPSERT_CHUNK_SIZE) {
            self.index.upsert(job_id, chunk.to_vec()).await?;
        }

        info!("Indexed {} lines for job {}", lines.len(), job_id);
        Ok(())
    }

    /// Retrieve up to `top_k` semantically relevant prior lines as one text blob.
    ///
    /// Queries are restricted to the job's namespace; a job can never observe
    /// another job's lines. Returns the sentinel string when nothing matches.
    pub async fn query(
        &self,
        job_id: &str,
        text: &str,
        top_k: usize,
    ) -> Result<String, MemoryError> {
        let vectors = self.provider.embed_batch(&[text.to_string()]).await?;
        let vector = vectors.into_iter().next().unwrap_or_default();

        let matches = self.index.query(job_id, &vector, top_k).await?;

        let texts: Vec<String> = matches
            .into_iter()
            .map(|m| m.text)
            .filter(|text| !text.is_empty())
            .collect();

        if texts.is_empty() {
            return Ok(NO_CONTEXT_SENTINEL.to_string());
        }

        Ok(texts.join("\n"))
    }

    /// Delete the job's namespace.
    ///
    /// Best-effort: a failed purge leaks storage for one namespace, never
    /// correctness, so failures are logged and swallowed.
    pub async fn purge(&self, job_id: &str) {
        match self.index.delete_namespace(job_id).await {
            Ok(()) => debug!("Purged context memory for job {job_id}"),
            Err(e) => warn!("Context memory purge failed for job {job_id}: {e}"),
        }
    }
}

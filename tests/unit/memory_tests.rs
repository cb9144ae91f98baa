/*!
 * Unit tests for the context memory store against the in-process index.
 */

use std::sync::Arc;

use kalque::memory::{ContextMemory, NO_CONTEXT_SENTINEL};
use kalque::subtitle_processor::SubtitleLine;

use crate::common::mocks::{MemoryVectorIndex, MockProvider};

fn lines(count: usize) -> Vec<SubtitleLine> {
    (1..=count)
        .map(|i| {
            SubtitleLine::new(
                i,
                (i as u64 - 1) * 1000,
                i as u64 * 1000,
                format!("Line number {i}"),
            )
        })
        .collect()
}

fn store_with(index: Arc<MemoryVectorIndex>) -> ContextMemory {
    ContextMemory::new(Arc::new(MockProvider::working()), index)
}

#[tokio::test]
async fn test_query_withUnindexedJob_shouldReturnSentinelNotError() {
    let memory = store_with(Arc::new(MemoryVectorIndex::new()));

    let context = memory
        .query("never-indexed-job", "anything at all", 5)
        .await
        .expect("query must not error for unknown namespaces");

    assert_eq!(context, NO_CONTEXT_SENTINEL);
}

#[tokio::test]
async fn test_index_withManyLines_shouldChunkUpserts() {
    let index = Arc::new(MemoryVectorIndex::new());
    let memory = store_with(index.clone());

    memory.index("job-1", &lines(230)).await.expect("index failed");

    let sizes = index.upsert_sizes();
    assert_eq!(sizes, vec![100, 100, 30]);
    assert_eq!(index.namespace_len("job-1"), 230);
}

#[tokio::test]
async fn test_index_withFailingUpsert_shouldAbortWholeOperation() {
    let index = Arc::new(MemoryVectorIndex::failing());
    let memory = store_with(index.clone());

    let result = memory.index("job-1", &lines(10)).await;

    assert!(result.is_err());
    assert_eq!(index.namespace_len("job-1"), 0);
}

#[tokio::test]
async fn test_query_shouldNotCrossNamespaces() {
    let index = Arc::new(MemoryVectorIndex::new());
    let memory = store_with(index.clone());

    memory.index("job-a", &lines(5)).await.unwrap();

    let context = memory.query("job-b", "Line number 1", 5).await.unwrap();
    assert_eq!(context, NO_CONTEXT_SENTINEL);
}

#[tokio::test]
async fn test_query_withIndexedLines_shouldReturnJoinedTexts() {
    let index = Arc::new(MemoryVectorIndex::new());
    let memory = store_with(index.clone());
    memory.index("job-1", &lines(10)).await.unwrap();

    let context = memory.query("job-1", "Line number 3", 3).await.unwrap();

    assert_ne!(context, NO_CONTEXT_SENTINEL);
    assert_eq!(context.lines().count(), 3);
    assert!(context.contains("Line number"));
}

#[tokio::test]
async fn test_purge_shouldEmptyNamespaceAndNeverFail() {
    let index = Arc::new(MemoryVectorIndex::new());
    let memory = store_with(index.clone());
    memory.index("job-1", &lines(5)).await.unwrap();

    memory.purge("job-1").await;

    assert_eq!(index.namespace_len("job-1"), 0);

    // Purging an already-empty namespace is also fine
    memory.purge("job-1").await;
}

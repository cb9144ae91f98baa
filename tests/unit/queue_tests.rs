/*!
 * Unit tests for the durable job store, including restart behavior.
 */

use kalque::queue::models::{JobPayload, JobStatus};
use kalque::queue::store::JobStore;

fn payload() -> JobPayload {
    JobPayload {
        subtitle_content: "1\n00:00:01,000 --> 00:00:02,000\nHello\n".to_string(),
        tone: "Casual".to_string(),
        thinking_mode: false,
        user_glossary: Vec::new(),
    }
}

#[tokio::test]
async fn test_store_shouldSurviveReopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("jobs.db");

    let job_id = {
        let store = JobStore::new(&db_path).expect("store should open");
        store.submit(payload()).await.expect("submit failed")
    };

    // Reopen the same file as a fresh process would
    let reopened = JobStore::new(&db_path).expect("store should reopen");
    let job = reopened.get(&job_id).await.expect("job should persist");

    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.payload.tone, "Casual");
}

#[tokio::test]
async fn test_recoverInterrupted_afterReopen_shouldRequeueActiveJob() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("jobs.db");

    let job_id = {
        let store = JobStore::new(&db_path).expect("store should open");
        let id = store.submit(payload()).await.unwrap();
        // Claim but never settle, simulating a crash mid-job
        store.claim().await.unwrap().expect("claim should succeed");
        id
    };

    let reopened = JobStore::new(&db_path).expect("store should reopen");
    let recovered = reopened.recover_interrupted().await.unwrap();
    assert_eq!(recovered, 1);

    let job = reopened.get(&job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Queued);

    // The interrupted attempt still counts
    let reclaimed = reopened.claim().await.unwrap().expect("should reclaim");
    assert_eq!(reclaimed.attempts, 2);
}

#[tokio::test]
async fn test_claim_shouldPickOldestSubmittedFirst() {
    let store = JobStore::new_in_memory().expect("store");

    let first = store.submit(payload()).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let _second = store.submit(payload()).await.unwrap();

    let claimed = store.claim().await.unwrap().expect("claim");
    assert_eq!(claimed.id, first);
}

#[tokio::test]
async fn test_payload_shouldRoundTripThroughStore() {
    let store = JobStore::new_in_memory().expect("store");

    let mut p = payload();
    p.thinking_mode = true;
    p.user_glossary = vec![kalque::translation::blueprint::UserGlossaryEntry {
        term: "dojo".to_string(),
        translation: "dojo".to_string(),
    }];

    let job_id = store.submit(p).await.unwrap();
    let job = store.get(&job_id).await.unwrap();

    assert!(job.payload.thinking_mode);
    assert_eq!(job.payload.user_glossary.len(), 1);
    assert_eq!(job.payload.user_glossary[0].term, "dojo");
}

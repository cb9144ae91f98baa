/*!
 * Unit tests for the progress event bus.
 */

use kalque::events::{EventBus, ProgressEvent};

fn progress(stage: &str) -> ProgressEvent {
    ProgressEvent::Progress {
        stage: stage.to_string(),
    }
}

#[tokio::test]
async fn test_bus_shouldDeliverEventsInPublishOrder() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe("job-1");

    for stage in ["one", "two", "three"] {
        bus.publish("job-1", progress(stage));
    }

    let mut received = Vec::new();
    for _ in 0..3 {
        match sub.recv().await.unwrap() {
            ProgressEvent::Progress { stage } => received.push(stage),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    assert_eq!(received, vec!["one", "two", "three"]);
}

#[tokio::test]
async fn test_lateSubscriber_shouldOnlySeeSubsequentEvents() {
    let bus = EventBus::new();

    // Keeps the channel alive while the early events flow past
    let _early = bus.subscribe("job-1");
    bus.publish("job-1", progress("missed"));

    let mut late = bus.subscribe("job-1");
    bus.publish("job-1", progress("seen"));

    match late.recv().await.unwrap() {
        ProgressEvent::Progress { stage } => assert_eq!(stage, "seen"),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_unsubscribe_shouldNotAffectOtherListeners() {
    let bus = EventBus::new();
    let first = bus.subscribe("job-1");
    let mut second = bus.subscribe("job-1");

    drop(first);
    bus.publish("job-1", progress("still flowing"));

    assert!(second.recv().await.is_some());
    assert_eq!(bus.subscriber_count("job-1"), 1);
}

#[test]
fn test_allVariants_shouldSerializeAsTaggedJson() {
    let completed = ProgressEvent::Completed {
        result: "1\n00:00:01,000 --> 00:00:02,000\nHallo\n\n".to_string(),
    };
    let failed = ProgressEvent::Failed {
        error: "AI request failed: quota".to_string(),
    };

    let completed_json = serde_json::to_value(&completed).unwrap();
    assert_eq!(completed_json["type"], "completed");
    assert!(completed_json["payload"]["result"]
        .as_str()
        .unwrap()
        .contains("Hallo"));

    let failed_json = serde_json::to_value(&failed).unwrap();
    assert_eq!(failed_json["type"], "failed");
    assert_eq!(failed_json["payload"]["error"], "AI request failed: quota");
}

#[test]
fn test_progressEvent_shouldRoundTripThroughJson() {
    let event = progress("Translating batch 2 of 4");
    let json = serde_json::to_string(&event).unwrap();
    let parsed: ProgressEvent = serde_json::from_str(&json).unwrap();

    match parsed {
        ProgressEvent::Progress { stage } => assert_eq!(stage, "Translating batch 2 of 4"),
        other => panic!("unexpected event: {other:?}"),
    }
}

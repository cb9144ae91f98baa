/*!
 * End-to-end pipeline tests: submission through terminal event, with the AI
 * gateway and vector index replaced by scripted in-process mocks.
 */

use std::sync::Arc;

use serde_json::{json, Value};

use kalque::app_controller::{Controller, SubmitOptions};
use kalque::events::ProgressEvent;
use kalque::queue::models::RetryPolicy;
use kalque::queue::store::JobStore;
use kalque::subtitle_processor::SubtitleCollection;
use kalque::translation::blueprint::UserGlossaryEntry;
use kalque::translation::pipeline::PipelineConfig;

use crate::common::mocks::{MemoryVectorIndex, MockProvider};
use crate::common::{drain_until_terminal, numbered_srt, THREE_LINE_SRT};

/// Wire a controller around scripted components
fn controller_with(
    provider: Arc<MockProvider>,
    index: Arc<MemoryVectorIndex>,
    policy: RetryPolicy,
) -> Controller {
    Controller::with_components(
        provider,
        index,
        JobStore::new_in_memory().expect("in-memory store"),
        PipelineConfig {
            batch_size: 15,
            context_top_k: 5,
            fast_model: "fast-model".to_string(),
            deep_model: "deep-model".to_string(),
        },
        policy,
        1,
    )
}

#[tokio::test]
async fn test_threeLineJob_shouldEmitOrderedEventsAndCompleteInOrder() {
    let provider = Arc::new(MockProvider::working());
    let index = Arc::new(MemoryVectorIndex::new());
    let mut controller = controller_with(provider.clone(), index, RetryPolicy::immediate(2));

    let job_id = controller
        .submit(
            THREE_LINE_SRT.to_string(),
            SubmitOptions {
                tone: "Casual".to_string(),
                thinking_mode: false,
                user_glossary: Vec::new(),
            },
        )
        .await
        .expect("submit should return a job id");
    assert!(!job_id.is_empty());

    let mut sub = controller.subscribe(&job_id);
    controller.start().await.unwrap();

    let events = drain_until_terminal(&mut sub).await;
    controller.shutdown().await.unwrap();

    // The first event mentions the blueprint phase
    match &events[0] {
        ProgressEvent::Progress { stage } => {
            assert!(stage.to_lowercase().contains("blueprint"), "got stage {stage}")
        }
        other => panic!("expected a progress event first, got {other:?}"),
    }

    // A blueprint_ready event with a non-empty summary arrives before translation
    let blueprint_pos = events
        .iter()
        .position(|e| matches!(e, ProgressEvent::BlueprintReady(_)))
        .expect("blueprint_ready event missing");
    match &events[blueprint_pos] {
        ProgressEvent::BlueprintReady(blueprint) => assert!(!blueprint.summary.is_empty()),
        _ => unreachable!(),
    }

    // Some progress event mentions the single batch
    let batch_pos = events
        .iter()
        .position(|e| match e {
            ProgressEvent::Progress { stage } => stage.to_lowercase().contains("batch 1 of 1"),
            _ => false,
        })
        .expect("no progress event mentioning batch 1 of 1");
    assert!(batch_pos > blueprint_pos, "batches must follow the blueprint");

    // The terminal event carries exactly three translated blocks in order
    let result = match events.last().unwrap() {
        ProgressEvent::Completed { result } => result.clone(),
        other => panic!("expected completion, got {other:?}"),
    };

    let rendered = SubtitleCollection::parse(&result);
    assert!(!rendered.degraded);
    assert_eq!(rendered.lines.len(), 3);
    for (i, expected) in ["Hello there.", "General Kenobi!", "You are a bold one."]
        .iter()
        .enumerate()
    {
        assert_eq!(rendered.lines[i].seq_num, i + 1);
        assert_eq!(rendered.lines[i].text, format!("{expected} [translated]"));
    }

    // One structured call each for extraction, grounding, assembly, and the
    // single batch's triage
    assert_eq!(provider.structured_call_count(), 4);
}

#[tokio::test]
async fn test_progressStages_shouldFollowPipelinePhaseOrder() {
    let provider = Arc::new(MockProvider::working());
    let index = Arc::new(MemoryVectorIndex::new());
    let mut controller = controller_with(provider, index, RetryPolicy::immediate(2));

    let job_id = controller
        .submit(THREE_LINE_SRT.to_string(), SubmitOptions::default())
        .await
        .unwrap();
    let mut sub = controller.subscribe(&job_id);
    controller.start().await.unwrap();

    let events = drain_until_terminal(&mut sub).await;
    controller.shutdown().await.unwrap();

    let stages: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Progress { stage } => Some(stage.to_lowercase()),
            _ => None,
        })
        .collect();

    let position = |needle: &str| {
        stages
            .iter()
            .position(|s| s.contains(needle))
            .unwrap_or_else(|| panic!("no stage containing {needle:?} in {stages:?}"))
    };

    let keywords = position("extracting keywords");
    let grounding = position("grounding");
    let assembling = position("assembling");
    let indexing = position("indexing");
    let translating = position("batch");
    let cleanup = position("cleaning up");

    assert!(keywords < grounding);
    assert!(grounding < assembling);
    assert!(assembling < indexing);
    assert!(indexing < translating);
    assert!(translating < cleanup);

    // Exactly one terminal event closes the stream
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
}

#[tokio::test]
async fn test_userGlossary_shouldOverrideAiProposedTranslation() {
    let provider = Arc::new(MockProvider::working());
    let index = Arc::new(MemoryVectorIndex::new());
    let mut controller = controller_with(provider, index, RetryPolicy::immediate(2));

    // The mock blueprint proposes "training hall" for dojo; the user mandates otherwise
    let job_id = controller
        .submit(
            THREE_LINE_SRT.to_string(),
            SubmitOptions {
                tone: "Casual".to_string(),
                thinking_mode: false,
                user_glossary: vec![UserGlossaryEntry {
                    term: "dojo".to_string(),
                    translation: "the dojo itself".to_string(),
                }],
            },
        )
        .await
        .unwrap();

    let mut sub = controller.subscribe(&job_id);
    controller.start().await.unwrap();

    let events = drain_until_terminal(&mut sub).await;
    controller.shutdown().await.unwrap();

    let blueprint = events
        .iter()
        .find_map(|e| match e {
            ProgressEvent::BlueprintReady(blueprint) => Some(blueprint.clone()),
            _ => None,
        })
        .expect("blueprint_ready event missing");

    let entry = blueprint
        .glossary
        .iter()
        .find(|term| term.term.eq_ignore_ascii_case("dojo"))
        .expect("user term missing from blueprint glossary");

    assert_eq!(entry.proposed_translation, "the dojo itself");
}

#[tokio::test]
async fn test_triage_withOmittedLine_shouldDefaultThatLineToFastTier() {
    let provider = Arc::new(MockProvider::working());
    let index = Arc::new(MemoryVectorIndex::new());

    // Classify every line of the 15-line batch as deep, except line 7 which
    // the triage response omits entirely
    let triage: Vec<Value> = (1..=15)
        .filter(|&i| i != 7)
        .map(|i| json!({"lineId": i, "tier": "deep"}))
        .collect();
    provider.set_triage_response(Value::Array(triage));

    let mut controller = controller_with(provider.clone(), index, RetryPolicy::immediate(2));

    let job_id = controller
        .submit(numbered_srt(15), SubmitOptions::default())
        .await
        .unwrap();
    let mut sub = controller.subscribe(&job_id);
    controller.start().await.unwrap();

    let events = drain_until_terminal(&mut sub).await;
    controller.shutdown().await.unwrap();
    assert!(matches!(events.last().unwrap(), ProgressEvent::Completed { .. }));

    let calls = provider.text_calls();
    assert_eq!(calls.len(), 15);

    // Identify each call by the line under translation, not by the retrieved
    // context, which may echo other lines' texts
    for call in &calls {
        let line_under_translation = call
            .prompt
            .split("## Line to translate\n")
            .nth(1)
            .and_then(|rest| rest.lines().next())
            .expect("prompt should contain a line section");

        if line_under_translation == "Line number 7" {
            assert_eq!(call.model, "fast-model", "omitted line must default to fast");
        } else {
            assert_eq!(call.model, "deep-model");
        }
    }
}

#[tokio::test]
async fn test_thinkingMode_shouldRouteEveryLineToDeepTier() {
    let provider = Arc::new(MockProvider::working());
    let index = Arc::new(MemoryVectorIndex::new());
    let mut controller = controller_with(provider.clone(), index, RetryPolicy::immediate(2));

    let job_id = controller
        .submit(
            THREE_LINE_SRT.to_string(),
            SubmitOptions {
                tone: "Formal".to_string(),
                thinking_mode: true,
                user_glossary: Vec::new(),
            },
        )
        .await
        .unwrap();
    let mut sub = controller.subscribe(&job_id);
    controller.start().await.unwrap();

    drain_until_terminal(&mut sub).await;
    controller.shutdown().await.unwrap();

    let calls = provider.text_calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|call| call.model == "deep-model"));
}

#[tokio::test]
async fn test_blueprintWithoutGlossary_shouldFailJobWithInvalidBlueprint() {
    let provider = Arc::new(MockProvider::missing_glossary());
    let index = Arc::new(MemoryVectorIndex::new());
    let mut controller = controller_with(provider, index, RetryPolicy::immediate(1));

    let job_id = controller
        .submit(THREE_LINE_SRT.to_string(), SubmitOptions::default())
        .await
        .unwrap();
    let mut sub = controller.subscribe(&job_id);
    controller.start().await.unwrap();

    let events = drain_until_terminal(&mut sub).await;
    controller.shutdown().await.unwrap();

    match events.last().unwrap() {
        ProgressEvent::Failed { error } => {
            assert!(error.contains("invalid blueprint"), "got error {error}")
        }
        other => panic!("expected failure, got {other:?}"),
    }

    let job = controller.job(&job_id).await.unwrap();
    assert_eq!(job.attempts, 1);
}

#[tokio::test]
async fn test_indexingFailure_shouldBeFatalToTheJob() {
    let provider = Arc::new(MockProvider::working());
    let index = Arc::new(MemoryVectorIndex::failing());
    let mut controller = controller_with(provider, index, RetryPolicy::immediate(1));

    let job_id = controller
        .submit(THREE_LINE_SRT.to_string(), SubmitOptions::default())
        .await
        .unwrap();
    let mut sub = controller.subscribe(&job_id);
    controller.start().await.unwrap();

    let events = drain_until_terminal(&mut sub).await;
    controller.shutdown().await.unwrap();

    match events.last().unwrap() {
        ProgressEvent::Failed { error } => {
            assert!(error.contains("upsert failed"), "got error {error}")
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_degradedInput_shouldStillTranslateEveryLine() {
    let provider = Arc::new(MockProvider::working());
    let index = Arc::new(MemoryVectorIndex::new());
    let mut controller = controller_with(provider, index, RetryPolicy::immediate(2));

    let job_id = controller
        .submit(
            "no structure here\njust two lines".to_string(),
            SubmitOptions::default(),
        )
        .await
        .unwrap();
    let mut sub = controller.subscribe(&job_id);
    controller.start().await.unwrap();

    let events = drain_until_terminal(&mut sub).await;
    controller.shutdown().await.unwrap();

    let result = match events.last().unwrap() {
        ProgressEvent::Completed { result } => result.clone(),
        other => panic!("expected completion, got {other:?}"),
    };

    assert!(result.contains("no structure here [translated]"));
    assert!(result.contains("just two lines [translated]"));
}

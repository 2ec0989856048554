//! End-to-end pipeline tests over the request handler.
//!
//! Exercise the composed pipeline (limiter -> cache -> engine -> cache write)
//! against scripted fakes: cache hit behavior, admission control, input
//! errors, and telemetry accounting. No sockets involved.

use helpdeskd::config::{Config, LimiterConfig};
use helpdeskd::handler::{process_ask, AskReply};
use helpdeskd::server::AppState;
use helpdeskd::test_support::{FakeLlmClient, FakeToolExecutor};
use helpdesk_common::AskRequest;
use serde_json::json;
use std::sync::Arc;

fn ask_request() -> AskRequest {
    AskRequest {
        issue: "My computer won't turn on".to_string(),
        os: "Windows".to_string(),
        device: "Desktop".to_string(),
    }
}

fn answer_json() -> String {
    json!({
        "answer_title": "Computer will not power on",
        "one_paragraph_summary": "Work through power and cabling checks in order.",
        "prereqs": [],
        "steps": [
            {
                "title": "Check the power cable",
                "detail": "Reseat the cable and try a known-good outlet.",
                "os": ["Windows"]
            }
        ],
        "decision_tree": [],
        "diagrams": [],
        "citations": [
            { "url": "https://support.example.com/power", "title": "Power troubleshooting", "quote": "" },
            { "url": "https://kb.vendor.org/no-boot", "title": "No-boot checklist", "quote": "" }
        ],
        "warnings": []
    })
    .to_string()
}

fn state_with(llm: Arc<FakeLlmClient>, config: Config) -> AppState {
    let tools = Arc::new(FakeToolExecutor::returning(json!({})));
    AppState::new(config, llm, tools)
}

#[tokio::test]
async fn test_miss_then_hit_returns_identical_answer() {
    let llm = Arc::new(FakeLlmClient::new().push_text(&answer_json()));
    let state = state_with(Arc::clone(&llm), Config::default());

    let first = process_ask(&state, "10.0.0.1", ask_request()).await;
    let second = process_ask(&state, "10.0.0.1", ask_request()).await;

    let (answer_a, hit_a) = match first {
        AskReply::Answer {
            answer, cache_hit, ..
        } => (answer, cache_hit),
        other => panic!("expected answer, got {:?}", other),
    };
    let (answer_b, hit_b) = match second {
        AskReply::Answer {
            answer, cache_hit, ..
        } => (answer, cache_hit),
        other => panic!("expected answer, got {:?}", other),
    };

    assert!(!hit_a);
    assert!(hit_b);
    assert_eq!(llm.call_count(), 1, "second request must not re-orchestrate");
    // byte-identical on the wire
    assert_eq!(
        serde_json::to_vec(&answer_a).unwrap(),
        serde_json::to_vec(&answer_b).unwrap()
    );
    assert_eq!(state.cache.len().await, 1);
}

#[tokio::test]
async fn test_eleventh_request_is_rate_limited() {
    let llm = Arc::new(FakeLlmClient::new().push_text(&answer_json()));
    let state = state_with(Arc::clone(&llm), Config::default());

    for i in 0..10 {
        let reply = process_ask(&state, "10.0.0.9", ask_request()).await;
        assert!(
            matches!(reply, AskReply::Answer { .. }),
            "request {} should be admitted",
            i + 1
        );
    }
    let denied = process_ask(&state, "10.0.0.9", ask_request()).await;
    match denied {
        AskReply::RateLimited { retry_after_secs } => {
            assert!(retry_after_secs > 0 && retry_after_secs <= 60);
        }
        other => panic!("expected rate limit denial, got {:?}", other),
    }
    // one orchestration, nine cache hits, one denial
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_denied_requests_never_reach_the_engine() {
    let config = Config {
        limiter: LimiterConfig {
            max_tokens: 1,
            window_secs: 600,
        },
        ..Default::default()
    };
    let llm = Arc::new(FakeLlmClient::new().push_text(&answer_json()));
    let state = state_with(Arc::clone(&llm), config);

    assert!(matches!(
        process_ask(&state, "10.1.1.1", ask_request()).await,
        AskReply::Answer { .. }
    ));
    assert!(matches!(
        process_ask(&state, "10.1.1.1", ask_request()).await,
        AskReply::RateLimited { .. }
    ));
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_identities_do_not_share_buckets() {
    let config = Config {
        limiter: LimiterConfig {
            max_tokens: 1,
            window_secs: 600,
        },
        ..Default::default()
    };
    let llm = Arc::new(FakeLlmClient::new().push_text(&answer_json()));
    let state = state_with(Arc::clone(&llm), config);

    assert!(matches!(
        process_ask(&state, "10.1.1.1", ask_request()).await,
        AskReply::Answer { .. }
    ));
    // different caller, fresh bucket, cache hit serves it
    assert!(matches!(
        process_ask(&state, "10.1.1.2", ask_request()).await,
        AskReply::Answer { cache_hit: true, .. }
    ));
}

#[tokio::test]
async fn test_invalid_payload_reports_fields() {
    let llm = Arc::new(FakeLlmClient::new());
    let state = state_with(Arc::clone(&llm), Config::default());

    let reply = process_ask(
        &state,
        "10.0.0.2",
        AskRequest {
            issue: "  ".to_string(),
            os: "Solaris".to_string(),
            device: "Desktop".to_string(),
        },
    )
    .await;

    match reply {
        AskReply::InvalidInput { fields } => {
            assert_eq!(fields, vec!["issue".to_string(), "os".to_string()]);
        }
        other => panic!("expected input error, got {:?}", other),
    }
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_orchestration_failure_maps_to_generic_reply() {
    // Script is empty: the model call fails outright.
    let llm = Arc::new(FakeLlmClient::new());
    let state = state_with(Arc::clone(&llm), Config::default());
    let reply = process_ask(&state, "10.0.0.3", ask_request()).await;
    assert_eq!(reply, AskReply::Unanswerable);
    assert_eq!(state.cache.len().await, 0, "failures are never cached");
}

#[tokio::test]
async fn test_clarification_is_not_cached() {
    let llm = Arc::new(
        FakeLlmClient::new()
            .push_text(r#"{"clarifying_question": "Laptop or desktop?"}"#)
            .push_text(&answer_json()),
    );
    let state = state_with(Arc::clone(&llm), Config::default());

    let first = process_ask(&state, "10.0.0.4", ask_request()).await;
    assert!(matches!(first, AskReply::Clarification { .. }));
    assert_eq!(state.cache.len().await, 0);

    // the follow-up run orchestrates again and caches the real answer
    let second = process_ask(&state, "10.0.0.4", ask_request()).await;
    assert!(matches!(
        second,
        AskReply::Answer {
            cache_hit: false,
            ..
        }
    ));
    assert_eq!(llm.call_count(), 2);
    assert_eq!(state.cache.len().await, 1);
}

#[tokio::test]
async fn test_remaining_tokens_decrease_per_request() {
    let llm = Arc::new(FakeLlmClient::new().push_text(&answer_json()));
    let state = state_with(Arc::clone(&llm), Config::default());

    let first = process_ask(&state, "10.0.0.5", ask_request()).await;
    let second = process_ask(&state, "10.0.0.5", ask_request()).await;
    let remaining_first = match first {
        AskReply::Answer { remaining, .. } => remaining,
        other => panic!("expected answer, got {:?}", other),
    };
    let remaining_second = match second {
        AskReply::Answer { remaining, .. } => remaining,
        other => panic!("expected answer, got {:?}", other),
    };
    assert!(remaining_first > remaining_second);
}

#[tokio::test]
async fn test_every_terminal_outcome_is_recorded() {
    let llm = Arc::new(FakeLlmClient::new().push_text(&answer_json()));
    let state = state_with(Arc::clone(&llm), Config::default());

    let _ = process_ask(&state, "10.0.0.6", ask_request()).await; // answered
    let _ = process_ask(&state, "10.0.0.6", ask_request()).await; // cache hit
    let _ = process_ask(
        &state,
        "10.0.0.6",
        AskRequest {
            issue: String::new(),
            os: "Windows".to_string(),
            device: "Desktop".to_string(),
        },
    )
    .await; // invalid input

    let snapshot = state.recorder.snapshot();
    assert_eq!(snapshot.total, 3);
    assert_eq!(snapshot.by_outcome.get("answered"), Some(&1));
    assert_eq!(snapshot.by_outcome.get("cache_hit"), Some(&1));
    assert_eq!(snapshot.by_outcome.get("invalid_input"), Some(&1));
}

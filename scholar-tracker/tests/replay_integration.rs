//! End-to-end replay tests against a mocked HTTP backend
//!
//! Runs a short script through a real `HttpInteractionApi`, then inspects the
//! requests the mock server received.

use std::sync::{Arc, Mutex};

use scholar_core::{ApiConfig, HttpInteractionApi, InterestLevel, TrackerConfig};
use scholar_tracker::replay::{run_script, ReplayScript};
use scholar_tracker::{InteractionTracker, PageEvents};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn replay_config() -> TrackerConfig {
    TrackerConfig {
        min_summary_duration_secs: 0,
        realtime_analysis_interval_ms: 3_600_000,
        retry_worker_enabled: false,
        ..TrackerConfig::default()
    }
}

fn tracker_for(server: &MockServer) -> InteractionTracker {
    let api_config = ApiConfig {
        base_url: String::new(),
        token: Some("replay-token".to_string()),
        timeout_secs: 5,
    };
    let api = HttpInteractionApi::with_base_url(&api_config, server.uri())
        .expect("Failed to create client");
    InteractionTracker::new(replay_config(), Arc::new(api), PageEvents::new(16))
}

async fn mount_ok(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn script() -> ReplayScript {
    serde_json::from_value(json!({
        "steps": [
            { "at_ms": 0,   "action": { "type": "open", "paper_id": "P1", "title": "X" } },
            { "at_ms": 50,  "action": { "type": "click", "href": "https://example.org/paper.pdf" } },
            { "at_ms": 100, "action": { "type": "like" } },
            { "at_ms": 150, "action": { "type": "close" } }
        ]
    }))
    .expect("script should parse")
}

async fn bodies_for(server: &MockServer, route: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .map(|r| r.body_json::<Value>().expect("request body should be JSON"))
        .collect()
}

#[tokio::test]
async fn test_replay_drives_full_reading_session() {
    let server = MockServer::start().await;
    mount_ok(&server, "/interactions/track", json!({ "success": true })).await;
    mount_ok(&server, "/interactions/interest", json!({ "success": true })).await;
    mount_ok(
        &server,
        "/interactions/view",
        json!({
            "success": true,
            "data": {
                "interest_level": "high",
                "interest_score": 66.0,
                "signals": ["Opened the PDF"]
            }
        }),
    )
    .await;

    let tracker = tracker_for(&server);
    let surfaced = Arc::new(Mutex::new(Vec::new()));
    let sink = surfaced.clone();
    tracker
        .on_interest_analyzed(move |paper_id, result| {
            sink.lock().unwrap().push((paper_id.to_string(), result.clone()));
        })
        .await;

    let summary = run_script(&tracker, &script()).await.expect("replay should succeed");
    assert_eq!(summary.steps_run, 4);
    assert_eq!(summary.interest_failures, 0);

    let session_id = tracker.session_id().await;

    let tracked = bodies_for(&server, "/interactions/track").await;
    let kinds: Vec<_> = tracked.iter().map(|b| b["interaction_type"].clone()).collect();
    assert_eq!(kinds, vec![json!("view_start"), json!("click_pdf")]);
    assert_eq!(tracked[1]["click_count"], json!(1));
    assert!(tracked.iter().all(|b| b["session_id"] == json!(session_id)));

    let interests = bodies_for(&server, "/interactions/interest").await;
    assert_eq!(interests.len(), 1);
    assert_eq!(interests[0]["paper_id"], json!("P1"));
    assert_eq!(interests[0]["interest_type"], json!("like"));

    let views = bodies_for(&server, "/interactions/view").await;
    assert_eq!(views.len(), 1);
    assert_eq!(views[0]["paper_id"], json!("P1"));

    let surfaced = surfaced.lock().unwrap();
    assert_eq!(surfaced.len(), 1);
    assert_eq!(surfaced[0].0, "P1");
    assert_eq!(surfaced[0].1.interest_level, InterestLevel::High);
    assert!(!surfaced[0].1.is_real_time);
}

#[tokio::test]
async fn test_replay_counts_interest_failures_and_keeps_going() {
    let server = MockServer::start().await;
    mount_ok(&server, "/interactions/track", json!({ "success": true })).await;
    mount_ok(&server, "/interactions/view", json!({ "success": true })).await;
    Mock::given(method("POST"))
        .and(path("/interactions/interest"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "boom" })))
        .mount(&server)
        .await;

    let tracker = tracker_for(&server);
    let summary = run_script(&tracker, &script()).await.expect("replay should succeed");

    assert_eq!(summary.steps_run, 4);
    assert_eq!(summary.interest_failures, 1);
    assert_eq!(bodies_for(&server, "/interactions/view").await.len(), 1);
    assert!(!tracker.is_tracking().await);
}

#[tokio::test]
async fn test_replay_queues_telemetry_when_backend_is_down() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let tracker = tracker_for(&server);
    let summary = run_script(&tracker, &script()).await.expect("replay should succeed");

    assert_eq!(summary.interest_failures, 1);
    let status = tracker.status().await;
    // view_start, click_pdf and the final view report
    assert_eq!(status.pending_retries, 3);
    assert!(status.current_paper.is_none());
}

//! End-to-end tests for the analysis pipeline over real HTTP.
//!
//! An in-process axum server stands in for both the YouTube Data API and
//! the view prediction service. API keys listed in `spent_keys` answer
//! every call with a `quotaExceeded` error body.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use vpi_analyzer::analyze::Analyzer;
use vpi_analyzer::config::Config;
use vpi_analyzer::error::DispatchError;
use vpi_analyzer::models::{Band, RecordStatus};
use vpi_analyzer::prediction::NETWORK_ERROR_MESSAGE;

#[derive(Debug, Clone)]
struct Recorded {
    path: &'static str,
    key: String,
    params: HashMap<String, String>,
}

#[derive(Clone, Default)]
struct MockState {
    spent_keys: Arc<Vec<String>>,
    forbidden: bool,
    search_delay: Option<Duration>,
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl MockState {
    fn with_spent(keys: &[&str]) -> Self {
        Self {
            spent_keys: Arc::new(keys.iter().map(|k| k.to_string()).collect()),
            ..Default::default()
        }
    }

    /// Record the call and return an error response if the request should fail.
    fn gate(&self, path: &'static str, params: &HashMap<String, String>) -> Option<Response> {
        let key = params.get("key").cloned().unwrap_or_default();
        self.calls.lock().unwrap().push(Recorded {
            path,
            key: key.clone(),
            params: params.clone(),
        });

        if self.spent_keys.contains(&key) {
            let body = json!({
                "error": {
                    "code": 403,
                    "message": "The request cannot be completed because you have exceeded your quota.",
                    "errors": [{ "domain": "youtube.quota", "reason": "quotaExceeded" }]
                }
            });
            return Some((StatusCode::FORBIDDEN, Json(body)).into_response());
        }
        if self.forbidden {
            let body = json!({
                "error": {
                    "code": 403,
                    "message": "YouTube Data API v3 has not been used in project 1 before or it is disabled.",
                    "errors": [{ "domain": "usageLimits", "reason": "accessNotConfigured" }]
                }
            });
            return Some((StatusCode::FORBIDDEN, Json(body)).into_response());
        }
        None
    }

    fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }
}

async fn search(State(s): State<MockState>, Query(p): Query<HashMap<String, String>>) -> Response {
    if let Some(delay) = s.search_delay {
        tokio::time::sleep(delay).await;
    }
    if let Some(r) = s.gate("search", &p) {
        return r;
    }
    if p.get("q").map(String::as_str) == Some("nothing") {
        return Json(json!({ "items": [] })).into_response();
    }
    Json(json!({
        "items": [
            { "id": { "kind": "youtube#video", "videoId": "A" },
              "snippet": { "title": "Video A", "channelId": "G1", "channelTitle": "Group One",
                           "description": "first", "publishedAt": "2024-03-01T00:00:00Z" } },
            { "id": { "kind": "youtube#video", "videoId": "B" },
              "snippet": { "title": "Video B", "channelId": "G1", "channelTitle": "Group One",
                           "description": "second", "publishedAt": "2024-03-02T00:00:00Z" } }
        ]
    }))
    .into_response()
}

async fn videos(State(s): State<MockState>, Query(p): Query<HashMap<String, String>>) -> Response {
    if let Some(r) = s.gate("videos", &p) {
        return r;
    }
    Json(json!({
        "items": [
            { "id": "A",
              "snippet": { "channelId": "G1", "publishedAt": "2024-03-01T00:00:00Z", "tags": ["a"] },
              "statistics": { "viewCount": "600", "likeCount": "100", "commentCount": "3" },
              "contentDetails": { "duration": "PT4M13S" } },
            { "id": "B",
              "snippet": { "channelId": "G1", "publishedAt": "2024-03-02T00:00:00Z" },
              "statistics": { "viewCount": "50", "likeCount": "200", "commentCount": "0" },
              "contentDetails": { "duration": "PT30S" } }
        ]
    }))
    .into_response()
}

async fn channels(State(s): State<MockState>, Query(p): Query<HashMap<String, String>>) -> Response {
    if let Some(r) = s.gate("channels", &p) {
        return r;
    }
    Json(json!({
        "items": [{ "id": "G1", "statistics": { "subscriberCount": "1000" } }]
    }))
    .into_response()
}

async fn predict(Json(body): Json<Value>) -> Response {
    match body["like_count"].as_u64() {
        Some(100) => Json(json!({ "predicted_view_count": 500 })).into_response(),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "model failure" })),
        )
            .into_response(),
    }
}

async fn spawn(state: MockState) -> SocketAddr {
    let app = Router::new()
        .route("/youtube/v3/search", get(search))
        .route("/youtube/v3/videos", get(videos))
        .route("/youtube/v3/channels", get(channels))
        .route("/predict/views", post(predict))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config(addr: SocketAddr, keys: &[&str]) -> Config {
    let mut config = Config::default();
    config.youtube.base_url = format!("http://{}/youtube/v3", addr);
    config.youtube.api_keys = keys.iter().map(|k| k.to_string()).collect();
    config.youtube.timeout_secs = 2;
    config.prediction.url = format!("http://{}/predict/views", addr);
    config.prediction.timeout_secs = 2;
    config
}

#[tokio::test]
async fn test_scenario_rotation_scoring_and_isolation() {
    let state = MockState::with_spent(&["K1"]);
    let addr = spawn(state.clone()).await;
    let analyzer = Analyzer::from_config(&config(addr, &["K1", "K2"])).unwrap();

    let report = analyzer.analyze("test").await.unwrap().unwrap();
    assert_eq!(report.query, "test");
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.units_consumed, 102);

    let a = &report.records[0];
    assert_eq!(a.record.id, "A");
    assert_eq!(a.record.snippet.title.as_deref(), Some("Video A"));
    assert_eq!(a.record.snippet.tags, Some(vec!["a".to_string()]));
    match &a.status {
        RecordStatus::Scored { score, band } => {
            assert_eq!(score.actual_views, 600);
            assert_eq!(score.predicted_views, 500);
            assert_eq!(score.ratio, 1.2);
            assert_eq!(*band, Band::High);
        }
        other => panic!("expected A to be scored, got {:?}", other),
    }

    assert_eq!(
        report.records[1].status,
        RecordStatus::PredictionError {
            message: "model failure".into()
        }
    );

    let calls = state.calls();
    let trail: Vec<_> = calls.iter().map(|c| (c.path, c.key.as_str())).collect();
    assert_eq!(
        trail,
        vec![
            ("search", "K1"),
            ("search", "K2"),
            ("videos", "K2"),
            ("channels", "K2"),
        ]
    );

    let search = &calls[1].params;
    assert_eq!(search.get("type").map(String::as_str), Some("video"));
    assert_eq!(search.get("maxResults").map(String::as_str), Some("50"));
    assert_eq!(calls[2].params.get("id").map(String::as_str), Some("A,B"));
    // Both videos belong to G1; the channel call must not repeat it.
    assert_eq!(calls[3].params.get("id").map(String::as_str), Some("G1"));
}

#[tokio::test]
async fn test_zero_hits_makes_single_call() {
    let state = MockState::default();
    let addr = spawn(state.clone()).await;
    let analyzer = Analyzer::from_config(&config(addr, &["K1"])).unwrap();

    let report = analyzer.analyze("nothing").await.unwrap().unwrap();
    assert!(report.records.is_empty());
    assert_eq!(state.calls().len(), 1);
}

#[tokio::test]
async fn test_all_keys_spent() {
    let state = MockState::with_spent(&["K1", "K2", "K3"]);
    let addr = spawn(state.clone()).await;
    let analyzer = Analyzer::from_config(&config(addr, &["K1", "K2", "K3"])).unwrap();

    let err = analyzer.analyze("test").await.unwrap_err();
    assert_eq!(err, DispatchError::AllCredentialsExhausted);
    let keys: Vec<_> = state.calls().into_iter().map(|c| c.key).collect();
    assert_eq!(keys, vec!["K1", "K2", "K3"]);
    assert_eq!(analyzer.api().dispatcher().rotator().remaining(), 0);
}

#[tokio::test]
async fn test_non_quota_403_does_not_rotate() {
    let state = MockState {
        forbidden: true,
        ..Default::default()
    };
    let addr = spawn(state.clone()).await;
    let analyzer = Analyzer::from_config(&config(addr, &["K1", "K2"])).unwrap();

    let err = analyzer.analyze("test").await.unwrap_err();
    assert!(matches!(err, DispatchError::Api(ref m) if m.contains("disabled")));
    assert_eq!(state.calls().len(), 1);
    assert_eq!(analyzer.api().dispatcher().rotator().remaining(), 2);
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let state = MockState {
        search_delay: Some(Duration::from_secs(3)),
        ..Default::default()
    };
    let addr = spawn(state).await;
    let mut cfg = config(addr, &["K1", "K2"]);
    cfg.youtube.timeout_secs = 1;
    let analyzer = Analyzer::from_config(&cfg).unwrap();

    let err = analyzer.analyze("test").await.unwrap_err();
    assert!(matches!(err, DispatchError::Transport(_)));
    assert_eq!(analyzer.api().dispatcher().rotator().remaining(), 2);
}

#[tokio::test]
async fn test_unreachable_prediction_service() {
    let addr = spawn(MockState::default()).await;

    // Reserve a port and close it so nothing is listening there.
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let mut cfg = config(addr, &["K1"]);
    cfg.prediction.url = format!("http://{}/predict/views", closed);
    let analyzer = Analyzer::from_config(&cfg).unwrap();

    let report = analyzer.analyze("test").await.unwrap().unwrap();
    assert_eq!(report.records.len(), 2);
    for scored in &report.records {
        assert_eq!(
            scored.status,
            RecordStatus::PredictionError {
                message: NETWORK_ERROR_MESSAGE.into()
            }
        );
    }
}

#[test]
fn test_no_keys_is_rejected_up_front() {
    let err = match Analyzer::from_config(&Config::default()) {
        Ok(_) => panic!("expected an error without API keys"),
        Err(e) => e,
    };
    assert_eq!(
        err.downcast_ref::<DispatchError>(),
        Some(&DispatchError::NoCredentialsConfigured)
    );
}

//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` over a live
//! processing loop and exercise the /api/v1/* endpoints using
//! `tower::ServiceExt::oneshot()`. No binary spawn, no network port.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use motion_gauge::api::{create_app, ApiState};
use motion_gauge::config::{EngineConfig, TickMode};
use motion_gauge::engine::{Engine, EngineHandle};
use motion_gauge::pipeline::{ChannelSource, FrameRecord, ProcessingLoop};
use motion_gauge::storage::ResultLedger;
use motion_gauge::types::landmark_index as idx;
use motion_gauge::types::{Landmark, LandmarkFrame};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// A running engine loop plus the pieces a test needs to drive it.
struct Harness {
    handle: EngineHandle,
    frames: mpsc::Sender<FrameRecord>,
    cancel: CancellationToken,
    config: EngineConfig,
}

impl Harness {
    fn start() -> Self {
        let mut config = EngineConfig::default();
        config.engine.tick_mode = TickMode::PerFrame;
        // checks read the last fed frame on the wall clock
        config.engine.stale_frame_ms = 5_000;
        let engine = Engine::new(&config, ResultLedger::in_memory(200));
        let cancel = CancellationToken::new();
        let (frames, source) = ChannelSource::channel(8);
        let (pl, handle) = ProcessingLoop::new(engine, &config, cancel.clone());
        tokio::spawn(pl.run(source));
        Self {
            handle,
            frames,
            cancel,
            config,
        }
    }

    fn app(&self) -> Router {
        create_app(ApiState::new(self.handle.clone(), self.config.clone()))
    }

    /// Feed one frame and wait until the loop has ticked on it.
    async fn feed(&self, frame: LandmarkFrame) {
        let mut rx = self.handle.subscribe();
        let before = rx.borrow_and_update().ticks;
        self.frames
            .send(FrameRecord {
                t_ms: 0,
                landmarks: Some(frame),
            })
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while rx.borrow_and_update().ticks <= before {
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn arm_frame(wrist_y: f64) -> LandmarkFrame {
    LandmarkFrame::empty()
        .with(idx::RIGHT_SHOULDER, Landmark::new(0.42, 0.35))
        .with(idx::RIGHT_WRIST, Landmark::new(0.39, wrist_y))
}

async fn send(app: Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// All GET endpoints should return 200.
#[tokio::test]
async fn test_get_endpoints_return_200() {
    let h = Harness::start();
    let endpoints = [
        "/api/v1/health",
        "/api/v1/snapshot",
        "/api/v1/tasks",
        "/api/v1/config",
        "/api/v1/results",
        "/api/v1/results/export.json",
        "/api/v1/results/export.csv",
    ];
    for endpoint in endpoints {
        let (status, _) = send(h.app(), "GET", endpoint, None).await;
        assert_eq!(status, StatusCode::OK, "GET {endpoint}");
    }
}

#[tokio::test]
async fn test_json_endpoints_use_envelope() {
    let h = Harness::start();
    let (_, v) = send_json(h.app(), "GET", "/api/v1/health", None).await;
    assert_eq!(v["data"]["status"], "ok");
    assert_eq!(v["meta"]["version"], "1");

    let (_, v) = send_json(h.app(), "GET", "/api/v1/tasks", None).await;
    let tasks = v["data"].as_array().unwrap();
    assert_eq!(tasks.len(), 4);
    assert_eq!(tasks[0]["task"], "arm_raise_right");
    assert_eq!(tasks[2]["units"], "s");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let h = Harness::start();
    let (status, v) = send_json(h.app(), "GET", "/api/v1/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(v["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_select_task_and_bad_payloads() {
    let h = Harness::start();
    let (status, v) = send_json(
        h.app(),
        "POST",
        "/api/v1/task",
        Some(r#"{"task":"arm_raise_right"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["task"], "arm_raise_right");
    assert_eq!(v["data"]["phase"], "accumulating");

    let (status, _) = send(h.app(), "POST", "/api/v1/task", Some(r#"{"task":"walk"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(h.app(), "POST", "/api/v1/task", Some("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, v) = send_json(h.app(), "POST", "/api/v1/task", Some(r#"{"task":null}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(v["data"]["task"].is_null());
    assert_eq!(v["data"]["status"], "Select a task");
}

#[tokio::test]
async fn test_commands_without_matching_task_conflict() {
    let h = Harness::start();
    let (status, v) = send_json(h.app(), "POST", "/api/v1/check", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(v["error"]["code"], "CONFLICT");

    send(
        h.app(),
        "POST",
        "/api/v1/task",
        Some(r#"{"task":"arm_raise_right"}"#),
    )
    .await;
    let (status, _) = send(h.app(), "POST", "/api/v1/task/finish", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(h.app(), "POST", "/api/v1/task", Some(r#"{"task":"one_leg_left"}"#)).await;
    let (status, _) = send(h.app(), "POST", "/api/v1/check", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_check_records_and_results_flow() {
    let h = Harness::start();
    send(
        h.app(),
        "POST",
        "/api/v1/task",
        Some(r#"{"task":"arm_raise_right"}"#),
    )
    .await;

    h.feed(arm_frame(0.55)).await;
    let (status, v) = send_json(h.app(), "POST", "/api/v1/check", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["recorded"]["status"], "fail");
    assert_eq!(v["data"]["recorded"]["value"], 0.0);
    assert_eq!(v["data"]["recorded"]["note"], "Wrist not above shoulder");
    assert_eq!(v["data"]["status"], "Right arm not raised");

    h.feed(arm_frame(0.18)).await;
    let (_, v) = send_json(h.app(), "POST", "/api/v1/check", None).await;
    assert_eq!(v["data"]["recorded"]["status"], "pass");

    let (_, v) = send_json(h.app(), "GET", "/api/v1/results", None).await;
    assert_eq!(v["data"].as_array().unwrap().len(), 2);

    let (status, csv) = send(h.app(), "GET", "/api/v1/results/export.csv", None).await;
    assert_eq!(status, StatusCode::OK);
    let csv = String::from_utf8(csv).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains(",arm_raise_right,1,-,pass,"));

    let (status, v) = send_json(h.app(), "DELETE", "/api/v1/results", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["cleared"], 2);
    let (_, v) = send_json(h.app(), "GET", "/api/v1/results", None).await;
    assert!(v["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_export_sets_download_headers() {
    let h = Harness::start();
    let resp = h
        .app()
        .oneshot(
            Request::builder()
                .uri("/api/v1/results/export.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let disposition = resp.headers()["content-disposition"].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"session_"));
    assert!(disposition.ends_with(".json\""));
    assert_eq!(resp.headers()["content-type"], "application/json");
}

#[tokio::test]
async fn test_stopped_engine_is_503() {
    let h = Harness::start();
    h.cancel.cancel();
    // wait for the loop to drop its command receiver
    tokio::time::timeout(Duration::from_secs(5), async {
        while !h.handle.is_closed() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    let (status, v) = send_json(h.app(), "POST", "/api/v1/task/restart", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(v["error"]["code"], "SERVICE_UNAVAILABLE");
}

//! HTTP handlers
//!
//! Reads come straight from the latest published [`EngineSnapshot`]; writes
//! go through the [`EngineHandle`] command channel and are applied by the
//! tick loop.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::config::EngineConfig;
use crate::engine::{EngineError, EngineHandle};
use crate::storage::{export_file_name, ExportFormat};
use crate::types::{HoldKind, Task, TaskResult, ThresholdPolicy};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct ApiState {
    pub engine: EngineHandle,
    pub config: Arc<EngineConfig>,
    pub started_at: Instant,
}

impl ApiState {
    pub fn new(engine: EngineHandle, config: EngineConfig) -> Self {
        Self {
            engine,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}

// ============================================================================
// Response bodies
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub active_task: Option<Task>,
    pub ticks: u64,
    pub results: usize,
}

#[derive(Debug, Serialize)]
pub struct TaskInfo {
    pub task: Task,
    pub name: &'static str,
    pub instruction: &'static str,
    pub threshold: ThresholdPolicy,
    pub hold: HoldKind,
    pub units: &'static str,
}

/// Outcome of `/task/finish` and `/check`.
#[derive(Debug, Serialize)]
pub struct RecordResponse {
    /// `None` when nothing was recorded (e.g. no pose detected).
    pub recorded: Option<TaskResult>,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

#[derive(Debug, Deserialize)]
pub struct SelectTaskRequest {
    /// `null` deselects.
    pub task: Option<Task>,
}

// ============================================================================
// Reads
// ============================================================================

/// Any unmatched route.
pub async fn not_found(uri: Uri) -> Response {
    ApiErrorResponse::not_found(format!("No route for {uri}"))
}

/// GET /health
pub async fn health(State(state): State<ApiState>) -> Response {
    let snap = state.engine.snapshot();
    ApiResponse::ok(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        active_task: snap.task,
        ticks: snap.ticks,
        results: snap.results.len(),
    })
}

/// GET /snapshot
pub async fn snapshot(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.engine.snapshot())
}

/// GET /tasks
pub async fn list_tasks(State(state): State<ApiState>) -> Response {
    let tasks: Vec<TaskInfo> = Task::ALL
        .into_iter()
        .map(|task| {
            let spec = task.spec(&state.config);
            TaskInfo {
                task,
                name: task.display_name(),
                instruction: task.instruction(),
                threshold: spec.threshold,
                hold: spec.hold,
                units: spec.units(),
            }
        })
        .collect();
    ApiResponse::ok(tasks)
}

/// GET /config
pub async fn get_config(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.config.as_ref())
}

/// GET /results
pub async fn results(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.engine.snapshot().results)
}

/// GET /results/export.json
pub async fn export_json(State(state): State<ApiState>) -> Response {
    export(&state, ExportFormat::Json)
}

/// GET /results/export.csv
pub async fn export_csv(State(state): State<ApiState>) -> Response {
    export(&state, ExportFormat::Csv)
}

fn export(state: &ApiState, format: ExportFormat) -> Response {
    let results = state.engine.snapshot().results;
    let body = match format.render(&results) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "Failed to render export");
            return ApiErrorResponse::internal(e.to_string());
        }
    };
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(Utc::now(), format)
    );
    (
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

// ============================================================================
// Commands
// ============================================================================

/// POST /task
pub async fn select_task(
    State(state): State<ApiState>,
    payload: Result<Json<SelectTaskRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return ApiErrorResponse::bad_request(rejection.body_text()),
    };
    match state.engine.select_task(req.task).await {
        Ok(()) => ApiResponse::ok(state.engine.snapshot()),
        Err(e) => e.into_response(),
    }
}

/// POST /task/restart
pub async fn restart_task(State(state): State<ApiState>) -> Result<Response, EngineError> {
    state.engine.restart().await?;
    Ok(ApiResponse::ok(state.engine.snapshot()))
}

/// POST /task/finish
pub async fn finish_task(State(state): State<ApiState>) -> Result<Response, EngineError> {
    let recorded = state.engine.finish().await?;
    Ok(record_response(&state, recorded))
}

/// POST /check
pub async fn check(State(state): State<ApiState>) -> Result<Response, EngineError> {
    let recorded = state.engine.check().await?;
    Ok(record_response(&state, recorded))
}

/// DELETE /results
pub async fn clear_results(State(state): State<ApiState>) -> Result<Response, EngineError> {
    let cleared = state.engine.snapshot().results.len();
    state.engine.clear_results().await?;
    tracing::info!(cleared, "Results cleared via API");
    Ok(ApiResponse::ok(ClearResponse { cleared }))
}

fn record_response(state: &ApiState, recorded: Option<TaskResult>) -> Response {
    ApiResponse::ok(RecordResponse {
        recorded,
        status: state.engine.snapshot().status,
    })
}

//! API route definitions
//!
//! - /api/v1/health, /snapshot, /tasks, /config - read-only state
//! - /api/v1/results (+ export.json / export.csv) - ledger access and clear
//! - /api/v1/task, /task/restart, /task/finish, /check - engine commands

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{self, ApiState};

pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/snapshot", get(handlers::snapshot))
        .route("/tasks", get(handlers::list_tasks))
        .route("/config", get(handlers::get_config))
        // Ledger
        .route(
            "/results",
            get(handlers::results).delete(handlers::clear_results),
        )
        .route("/results/export.json", get(handlers::export_json))
        .route("/results/export.csv", get(handlers::export_csv))
        // Commands
        .route("/task", post(handlers::select_task))
        .route("/task/restart", post(handlers::restart_task))
        .route("/task/finish", post(handlers::finish_task))
        .route("/check", post(handlers::check))
        .with_state(state)
}

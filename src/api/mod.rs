//! REST API module using Axum
//!
//! HTTP surface for rendering clients: snapshots, the result ledger and its
//! exports, and the task commands. Everything lives under `/api/v1`.

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::ApiState;

use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Comma-separated list of origins allowed cross-origin access.
pub const CORS_ORIGINS_ENV_VAR: &str = "MOTION_GAUGE_CORS_ORIGINS";

/// Build a CORS layer that is same-origin unless origins are configured.
///
/// Set `MOTION_GAUGE_CORS_ORIGINS` (e.g. `http://localhost:5173`) for a
/// renderer served from another origin.
fn build_cors_layer() -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);
    match std::env::var(CORS_ORIGINS_ENV_VAR) {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            base.allow_origin(allowed)
        }
        Err(_) => base,
    }
}

/// Create the application router.
pub fn create_app(state: ApiState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes(state))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

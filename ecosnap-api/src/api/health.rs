//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Returns status, module name, version, and detection service reachability
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    /// "ok" or "unreachable"; reported, not required
    pub classifier: String,
    pub uptime_seconds: i64,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let classifier = if state.workflow.classifier().is_healthy().await {
        "ok"
    } else {
        "unreachable"
    };
    let uptime = state.workflow.clock().now() - state.startup_time;

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "ecosnap-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        classifier: classifier.to_string(),
        uptime_seconds: uptime.num_seconds().max(0),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

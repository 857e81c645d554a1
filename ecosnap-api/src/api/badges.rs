//! Badge catalog endpoint

use axum::{extract::State, routing::get, Json, Router};
use ecosnap_common::progression::Badge;

use crate::AppState;

/// GET /api/badges
///
/// The configured catalog in evaluation order.
pub async fn list_badges(State(state): State<AppState>) -> Json<Vec<Badge>> {
    Json(state.workflow.catalog().iter().cloned().collect())
}

pub fn badge_routes() -> Router<AppState> {
    Router::new().route("/api/badges", get(list_badges))
}

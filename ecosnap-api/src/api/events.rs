//! Server-sent progression events

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use ecosnap_common::sse::create_event_sse_stream;
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EventFilter {
    /// Only stream this user's events
    pub user_id: Option<Uuid>,
}

/// GET /events
pub async fn event_stream(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> impl IntoResponse {
    create_event_sse_stream("ecosnap-api", &state.event_bus, filter.user_id)
}

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/events", get(event_stream))
}

//! ecosnap-api library - EcoSnap progression service
//!
//! Accepts waste sighting reports, classifies them through the detection
//! service, and maintains each user's eco points, rank, streak and badges.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use ecosnap_common::events::EventBus;
use ecosnap_common::progression::BadgeCatalog;
use ecosnap_common::Clock;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod classifier;
pub mod db;
pub mod error;
pub mod workflow;

use classifier::Classifier;
use workflow::ReportWorkflow;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Report submission pipeline (classifier, clock, per-user locks)
    pub workflow: Arc<ReportWorkflow>,
    /// Event bus feeding `/events`
    pub event_bus: EventBus,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        db: SqlitePool,
        classifier: Arc<dyn Classifier>,
        clock: Arc<dyn Clock>,
        catalog: BadgeCatalog,
        event_bus: EventBus,
        max_write_attempts: u32,
    ) -> Self {
        let startup_time = clock.now();
        let workflow = ReportWorkflow::new(
            db.clone(),
            classifier,
            clock,
            Arc::new(catalog),
            event_bus.clone(),
            max_write_attempts,
        );

        Self {
            db,
            workflow: Arc::new(workflow),
            event_bus,
            startup_time,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::user_routes())
        .merge(api::report_routes())
        .merge(api::leaderboard_routes())
        .merge(api::badge_routes())
        .merge(api::event_routes())
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

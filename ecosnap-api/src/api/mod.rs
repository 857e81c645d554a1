//! HTTP API handlers

mod badges;
mod events;
mod health;
mod leaderboard;
mod reports;
mod users;

pub use badges::badge_routes;
pub use events::event_routes;
pub use health::{health_routes, HealthResponse};
pub use leaderboard::{leaderboard_routes, LeaderboardEntry};
pub use reports::{report_routes, SubmitReportRequest, SubmitReportResponse};
pub use users::{user_routes, BadgeProgress, CreateUserRequest, UserProfile};

use serde::Deserialize;

pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

/// `?limit=` for list endpoints
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

impl LimitQuery {
    /// Requested limit clamped to 1..=[`MAX_LIMIT`]
    pub fn resolve(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

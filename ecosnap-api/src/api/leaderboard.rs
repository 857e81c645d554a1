//! Leaderboard endpoint

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use ecosnap_common::Rank;
use serde::Serialize;
use uuid::Uuid;

use super::LimitQuery;
use crate::error::ApiResult;
use crate::{db, AppState};

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based
    pub position: u32,
    pub user_id: Uuid,
    pub username: String,
    pub eco_points: u64,
    pub rank: Rank,
    pub report_count: u64,
    pub streak_days: u32,
}

/// GET /api/leaderboard?limit=
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    let users = db::leaderboard(&state.db, query.resolve()).await?;

    let entries = users
        .into_iter()
        .zip(1u32..)
        .map(|(user, position)| LeaderboardEntry {
            position,
            user_id: user.guid,
            username: user.username,
            eco_points: user.state.eco_points,
            rank: user.state.rank,
            report_count: user.state.report_count,
            streak_days: user.state.streak_days,
        })
        .collect();

    Ok(Json(entries))
}

pub fn leaderboard_routes() -> Router<AppState> {
    Router::new().route("/api/leaderboard", get(get_leaderboard))
}

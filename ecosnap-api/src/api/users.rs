//! User registration and progression views

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use ecosnap_common::db::UserRecord;
use ecosnap_common::progression::CriterionKind;
use ecosnap_common::Rank;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
}

/// A user's progression as shown to clients
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub username: String,
    pub eco_points: u64,
    pub report_count: u64,
    pub accuracy: u8,
    pub rank: Rank,
    pub rank_name: String,
    pub streak_days: u32,
    pub last_report_at: Option<DateTime<Utc>>,
    pub badges_earned: Vec<String>,
    pub next_rank: Option<Rank>,
    pub points_to_next_rank: Option<u64>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserProfile {
    fn from(user: &UserRecord) -> Self {
        let state = &user.state;
        Self {
            user_id: user.guid,
            username: user.username.clone(),
            eco_points: state.eco_points,
            report_count: state.report_count,
            accuracy: state.accuracy,
            rank: state.rank,
            rank_name: state.rank.display_name().to_string(),
            streak_days: state.streak_days,
            last_report_at: state.last_report_at,
            badges_earned: state.badges_earned.iter().cloned().collect(),
            next_rank: state.rank.next(),
            points_to_next_rank: state.points_to_next_rank(),
            created_at: user.created_at,
        }
    }
}

/// One catalog badge measured against a user
#[derive(Debug, Serialize)]
pub struct BadgeProgress {
    pub id: String,
    pub name: String,
    pub description: String,
    pub criterion: CriterionKind,
    pub threshold: u64,
    pub reward: u64,
    pub current_value: u64,
    pub progress_percent: f64,
    pub earned: bool,
    pub earned_at: Option<DateTime<Utc>>,
}

fn validate_username(raw: &str) -> ApiResult<String> {
    let username = raw.trim();
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(ApiError::BadRequest(format!(
            "Username must be {}-{} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(ApiError::BadRequest(
            "Username may contain letters, digits, '_', '-' and '.'".to_string(),
        ));
    }
    Ok(username.to_string())
}

pub(crate) async fn require_user(state: &AppState, user_id: Uuid) -> ApiResult<UserRecord> {
    db::load_user(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {}", user_id)))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let username = validate_username(&request.username)?;
    let now = state.workflow.clock().now();
    let user = db::create_user(&state.db, &username, now).await?;

    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    let user = require_user(&state, user_id).await?;
    Ok(Json(UserProfile::from(&user)))
}

/// GET /api/users/:id/badges
///
/// Every catalog badge in catalog order. A badge can show 100 % without being
/// earned when the catalog gained it after the user's last report; it is
/// awarded on their next report.
pub async fn get_user_badges(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<BadgeProgress>>> {
    let user = require_user(&state, user_id).await?;
    let earned: HashMap<String, DateTime<Utc>> = db::load_earned_badges(&state.db, user_id)
        .await?
        .into_iter()
        .map(|b| (b.badge_id, b.earned_at))
        .collect();

    let progress = state
        .workflow
        .catalog()
        .iter()
        .map(|badge| {
            let earned_at = earned.get(&badge.id).copied();
            BadgeProgress {
                id: badge.id.clone(),
                name: badge.name.clone(),
                description: badge.description.clone(),
                criterion: badge.criterion,
                threshold: badge.threshold,
                reward: badge.reward,
                current_value: badge.current_value(&user.state),
                progress_percent: badge.progress_percent(&user.state),
                earned: earned_at.is_some(),
                earned_at,
            }
        })
        .collect();

    Ok(Json(progress))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", post(create_user))
        .route("/api/users/:id", get(get_user))
        .route("/api/users/:id/badges", get(get_user_badges))
}

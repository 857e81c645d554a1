//! User rows and earned badges

use chrono::{DateTime, Utc};
use ecosnap_common::db::UserRecord;
use ecosnap_common::{Error, ProgressionState, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;
use uuid::Uuid;

const USER_COLUMNS: &str = "guid, username, eco_points, report_count, accuracy, rank, \
     streak_days, last_report_at, version, created_at, updated_at";

/// A badge a user holds, with when it was earned
#[derive(Debug, Clone, Serialize)]
pub struct EarnedBadge {
    pub badge_id: String,
    pub earned_at: DateTime<Utc>,
}

/// Register a user with the zero progression state
///
/// A taken username is a `Conflict`.
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    now: DateTime<Utc>,
) -> Result<UserRecord> {
    let guid = Uuid::new_v4();
    let state = ProgressionState::default();

    let result = sqlx::query(
        r#"
        INSERT INTO users (guid, username, eco_points, report_count, accuracy, rank,
                           streak_days, last_report_at, version, created_at, updated_at)
        VALUES (?, ?, 0, 0, 0, ?, 0, NULL, 0, ?, ?)
        "#,
    )
    .bind(guid.to_string())
    .bind(username)
    .bind(state.rank.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(_) => {}
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(Error::Conflict(format!("Username already taken: {}", username)));
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(user_id = %guid, username = %username, "Registered user");

    Ok(UserRecord {
        guid,
        username: username.to_string(),
        state,
        version: 0,
        created_at: now,
        updated_at: now,
    })
}

/// Load a user's progression snapshot including earned badge ids
pub async fn load_user(pool: &SqlitePool, user_id: Uuid) -> Result<Option<UserRecord>> {
    let sql = format!("SELECT {} FROM users WHERE guid = ?", USER_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut user = UserRecord::from_row(&row)?;
    user.state.badges_earned = load_earned_badges(pool, user_id)
        .await?
        .into_iter()
        .map(|b| b.badge_id)
        .collect::<BTreeSet<_>>();
    Ok(Some(user))
}

/// Badges held by a user, oldest first
pub async fn load_earned_badges(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<EarnedBadge>> {
    let rows = sqlx::query(
        "SELECT badge_id, earned_at FROM user_badges \
         WHERE user_id = ? ORDER BY earned_at, badge_id",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(EarnedBadge {
                badge_id: row.try_get("badge_id")?,
                earned_at: row.try_get("earned_at")?,
            })
        })
        .collect()
}

/// Top users by eco points, then report count, then username
///
/// Badge sets are not loaded.
pub async fn leaderboard(pool: &SqlitePool, limit: u32) -> Result<Vec<UserRecord>> {
    let sql = format!(
        "SELECT {} FROM users ORDER BY eco_points DESC, report_count DESC, username ASC LIMIT ?",
        USER_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(limit).fetch_all(pool).await?;

    rows.iter().map(UserRecord::from_row).collect()
}

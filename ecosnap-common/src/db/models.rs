//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::classification::{Confidence, RiskLevel, WasteCategory};
use crate::progression::{ProgressionState, Rank};
use crate::{Error, Result};

/// A user with their progression snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub guid: Uuid,
    pub username: String,
    pub state: ProgressionState,
    /// Optimistic-concurrency token, bumped on every committed transition
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One submitted sighting; immutable once written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRecord {
    pub guid: Uuid,
    pub user_id: Uuid,
    pub submission_id: String,
    pub category: WasteCategory,
    pub confidence: Confidence,
    pub risk_level: RiskLevel,
    pub image_sha256: String,
    pub image_size: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
    pub points_awarded: u64,
    pub created_at: DateTime<Utc>,
}

fn parse_uuid(value: &str, column: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Invalid UUID in {}: {} ({})", column, value, e)))
}

fn non_negative(value: i64, column: &str) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| Error::Internal(format!("Negative value in {}: {}", column, value)))
}

impl UserRecord {
    /// Decode a `users` row; `badges_earned` is left empty for the caller to
    /// fill from `user_badges`
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let guid: String = row.try_get("guid")?;
        let accuracy: i64 = row.try_get("accuracy")?;
        let streak_days: i64 = row.try_get("streak_days")?;
        let rank: String = row.try_get("rank")?;

        let state = ProgressionState {
            eco_points: non_negative(row.try_get("eco_points")?, "eco_points")?,
            report_count: non_negative(row.try_get("report_count")?, "report_count")?,
            accuracy: u8::try_from(accuracy)
                .ok()
                .filter(|a| *a <= 100)
                .ok_or_else(|| Error::Internal(format!("Accuracy out of range: {}", accuracy)))?,
            rank: rank.parse::<Rank>()?,
            streak_days: u32::try_from(streak_days)
                .map_err(|_| Error::Internal(format!("Streak out of range: {}", streak_days)))?,
            last_report_at: row.try_get("last_report_at")?,
            badges_earned: Default::default(),
        };

        Ok(Self {
            guid: parse_uuid(&guid, "users.guid")?,
            username: row.try_get("username")?,
            state,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl ReportRecord {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let guid: String = row.try_get("guid")?;
        let user_id: String = row.try_get("user_id")?;
        let category: String = row.try_get("category")?;
        let confidence: i64 = row.try_get("confidence")?;
        let risk_level: String = row.try_get("risk_level")?;

        Ok(Self {
            guid: parse_uuid(&guid, "reports.guid")?,
            user_id: parse_uuid(&user_id, "reports.user_id")?,
            submission_id: row.try_get("submission_id")?,
            category: category.parse()?,
            confidence: u8::try_from(confidence)
                .map_err(|_| Error::Internal(format!("Confidence out of range: {}", confidence)))
                .and_then(Confidence::new)?,
            risk_level: risk_level.parse()?,
            image_sha256: row.try_get("image_sha256")?,
            image_size: row.try_get("image_size")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            description: row.try_get("description")?,
            points_awarded: non_negative(row.try_get("points_awarded")?, "points_awarded")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

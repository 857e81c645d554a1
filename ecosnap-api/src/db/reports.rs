//! Report rows and the progression commit

use ecosnap_common::db::{ReportRecord, UserRecord};
use ecosnap_common::{Result, Transition};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::to_i64;

const REPORT_COLUMNS: &str = "guid, user_id, submission_id, category, confidence, risk_level, \
     image_sha256, image_size, latitude, longitude, description, points_awarded, created_at";

/// Result of attempting to commit one transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The user row changed since it was read; nothing was written
    StaleSnapshot,
    /// Another report already holds this submission id; nothing was written
    DuplicateSubmission,
}

pub async fn get_report(pool: &SqlitePool, report_id: Uuid) -> Result<Option<ReportRecord>> {
    let sql = format!("SELECT {} FROM reports WHERE guid = ?", REPORT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(report_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(ReportRecord::from_row).transpose()
}

pub async fn find_by_submission(
    pool: &SqlitePool,
    submission_id: &str,
) -> Result<Option<ReportRecord>> {
    let sql = format!("SELECT {} FROM reports WHERE submission_id = ?", REPORT_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(submission_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(ReportRecord::from_row).transpose()
}

/// A user's reports, newest first
pub async fn list_user_reports(
    pool: &SqlitePool,
    user_id: Uuid,
    limit: u32,
) -> Result<Vec<ReportRecord>> {
    let sql = format!(
        "SELECT {} FROM reports WHERE user_id = ? ORDER BY created_at DESC, guid LIMIT ?",
        REPORT_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(user_id.to_string())
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter().map(ReportRecord::from_row).collect()
}

/// Persist a report together with the transition it produced
///
/// One transaction: insert the report, record newly unlocked badges, then
/// write the new state guarded by the snapshot's `version`. Either everything
/// lands or nothing does.
pub async fn commit_report(
    pool: &SqlitePool,
    snapshot: &UserRecord,
    transition: &Transition,
    report: &ReportRecord,
) -> Result<CommitOutcome> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO reports (guid, user_id, submission_id, category, confidence, risk_level,
                             image_sha256, image_size, latitude, longitude, description,
                             points_awarded, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(report.guid.to_string())
    .bind(report.user_id.to_string())
    .bind(&report.submission_id)
    .bind(report.category.as_str())
    .bind(report.confidence.value())
    .bind(report.risk_level.as_str())
    .bind(&report.image_sha256)
    .bind(report.image_size)
    .bind(report.latitude)
    .bind(report.longitude)
    .bind(&report.description)
    .bind(to_i64(report.points_awarded, "points_awarded")?)
    .bind(report.created_at)
    .execute(&mut *tx)
    .await;

    match inserted {
        Ok(_) => {}
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            tx.rollback().await?;
            return Ok(CommitOutcome::DuplicateSubmission);
        }
        Err(e) => return Err(e.into()),
    }

    for badge in &transition.unlocked {
        sqlx::query(
            "INSERT OR IGNORE INTO user_badges (user_id, badge_id, earned_at) VALUES (?, ?, ?)",
        )
        .bind(snapshot.guid.to_string())
        .bind(&badge.id)
        .bind(report.created_at)
        .execute(&mut *tx)
        .await?;
    }

    let state = &transition.state;
    let updated = sqlx::query(
        r#"
        UPDATE users
        SET eco_points = ?, report_count = ?, accuracy = ?, rank = ?,
            streak_days = ?, last_report_at = ?, version = version + 1, updated_at = ?
        WHERE guid = ? AND version = ?
        "#,
    )
    .bind(to_i64(state.eco_points, "eco_points")?)
    .bind(to_i64(state.report_count, "report_count")?)
    .bind(state.accuracy)
    .bind(state.rank.as_str())
    .bind(state.streak_days)
    .bind(state.last_report_at)
    .bind(report.created_at)
    .bind(snapshot.guid.to_string())
    .bind(snapshot.version)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(CommitOutcome::StaleSnapshot);
    }

    tx.commit().await?;
    Ok(CommitOutcome::Committed)
}

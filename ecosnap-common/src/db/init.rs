//! Database initialization
//!
//! Creates the database file on first run and brings the schema up to date on
//! every start. All statements are idempotent.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// SQLite busy timeout applied to every connection
const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        // WAL allows concurrent readers with one writer
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema_version_table(&pool).await?;
    create_users_table(&pool).await?;
    create_user_badges_table(&pool).await?;
    create_reports_table(&pool).await?;

    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            eco_points INTEGER NOT NULL DEFAULT 0,
            report_count INTEGER NOT NULL DEFAULT 0,
            accuracy INTEGER NOT NULL DEFAULT 0,
            rank TEXT NOT NULL DEFAULT 'Beginner',
            streak_days INTEGER NOT NULL DEFAULT 0,
            last_report_at TIMESTAMP,
            version INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (eco_points >= 0),
            CHECK (report_count >= 0),
            CHECK (accuracy BETWEEN 0 AND 100),
            CHECK (streak_days >= 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_users_leaderboard \
         ON users(eco_points DESC, report_count DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_user_badges_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_badges (
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            badge_id TEXT NOT NULL,
            earned_at TIMESTAMP NOT NULL,
            PRIMARY KEY (user_id, badge_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn create_reports_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            submission_id TEXT NOT NULL UNIQUE,
            category TEXT NOT NULL,
            confidence INTEGER NOT NULL,
            risk_level TEXT NOT NULL,
            image_sha256 TEXT NOT NULL,
            image_size INTEGER NOT NULL,
            latitude REAL,
            longitude REAL,
            description TEXT,
            points_awarded INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL,
            CHECK (category IN ('Plastic', 'Chemical', 'Oil', 'MixedWaste')),
            CHECK (confidence BETWEEN 0 AND 100),
            CHECK (risk_level IN ('Medium', 'High', 'Critical')),
            CHECK (image_size > 0),
            CHECK (latitude IS NULL OR latitude BETWEEN -90.0 AND 90.0),
            CHECK (longitude IS NULL OR longitude BETWEEN -180.0 AND 180.0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reports_user ON reports(user_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

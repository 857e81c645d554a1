//! Database schema migrations
//!
//! Versioned, idempotent migrations tracked in the `schema_version` table.
//! Never modify an existing migration; add a new one and bump
//! [`CURRENT_SCHEMA_VERSION`].

use crate::progression::RANK_LADDER;
use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Proceeding with caution.");
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    info!("All migrations completed successfully");
    Ok(())
}

/// Migration v1: Add the optimistic-concurrency `version` column to users
///
/// Databases created before per-user write conflicts were detected lack it.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: Add version column to users");

    let has_column: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('users') WHERE name = 'version'",
    )
    .fetch_one(pool)
    .await?;

    if has_column > 0 {
        info!("  version column already exists - skipping");
        return Ok(());
    }

    sqlx::query("ALTER TABLE users ADD COLUMN version INTEGER NOT NULL DEFAULT 0")
        .execute(pool)
        .await?;

    info!("  ✓ Added version column to users table");
    Ok(())
}

/// SQL expression mapping `eco_points` onto the rank ladder
pub fn rank_case_sql() -> String {
    let mut sql = String::from("CASE");
    for (threshold, rank) in RANK_LADDER.iter().rev() {
        sql.push_str(&format!(" WHEN eco_points >= {} THEN '{}'", threshold, rank.as_str()));
    }
    sql.push_str(" ELSE 'Beginner' END");
    sql
}

/// Migration v2: Recompute stored ranks that contradict the ladder
///
/// Rows written by administrative edits or older builds may hold a rank that
/// no longer matches their points.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v2: Repair stored ranks");

    let case = rank_case_sql();
    let sql = format!("UPDATE users SET rank = {case} WHERE rank IS NOT {case}");
    let result = sqlx::query(&sql).execute(pool).await?;

    if result.rows_affected() > 0 {
        warn!("  Repaired rank on {} user(s)", result.rows_affected());
    } else {
        info!("  All stored ranks consistent");
    }
    Ok(())
}

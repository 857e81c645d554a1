//! Tests for database initialization and migrations

use ecosnap_common::db::init::init_database;
use ecosnap_common::db::migrations::{get_schema_version, run_migrations, CURRENT_SCHEMA_VERSION};
use sqlx::SqlitePool;

async fn table_exists(pool: &SqlitePool, name: &str) -> bool {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("data").join("ecosnap.db");

    let pool = init_database(&db_path).await;

    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_all_tables_created() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("ecosnap.db")).await.unwrap();

    for table in ["schema_version", "users", "user_badges", "reports"] {
        assert!(table_exists(&pool, table).await, "missing table {}", table);
    }
    assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ecosnap.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO users (guid, username) VALUES ('u1', 'alice')")
        .execute(&pool1)
        .await
        .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1, "existing data must survive re-initialization");
}

#[tokio::test]
async fn test_accuracy_check_constraint() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("ecosnap.db")).await.unwrap();

    let result =
        sqlx::query("INSERT INTO users (guid, username, accuracy) VALUES ('u1', 'bob', 101)")
            .execute(&pool)
            .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_rank_repair_migration() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("ecosnap.db")).await.unwrap();

    // Contradicting ranks, as an administrative edit might leave them
    sqlx::query(
        "INSERT INTO users (guid, username, eco_points, rank) \
         VALUES ('u1', 'carol', 320, 'Beginner')",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO users (guid, username, eco_points, rank) VALUES ('u2', 'dave', 10, 'Legend')",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("DELETE FROM schema_version WHERE version = 2")
        .execute(&pool)
        .await
        .unwrap();

    run_migrations(&pool).await.unwrap();

    let carol: String = sqlx::query_scalar("SELECT rank FROM users WHERE guid = 'u1'")
        .fetch_one(&pool)
        .await
        .unwrap();
    let dave: String = sqlx::query_scalar("SELECT rank FROM users WHERE guid = 'u2'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(carol, "PlanetProtector");
    assert_eq!(dave, "Beginner");
    assert_eq!(get_schema_version(&pool).await.unwrap(), 2);
}

#[tokio::test]
async fn test_version_column_migration_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("ecosnap.db")).await.unwrap();

    sqlx::query("DELETE FROM schema_version").execute(&pool).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let columns: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('users') WHERE name = 'version'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(columns, 1);
}

//! Unit tests for database initialization
//!
//! Covers automatic database creation, idempotent re-initialization, and
//! the schema constraints the experiment layer relies on.

use binge_common::db::init_database;
use std::path::PathBuf;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let test_db = format!("/tmp/binge-test-db-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    // Ensure database doesn't exist
    let _ = std::fs::remove_file(&db_path);

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");

    // Cleanup
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_database_opens_existing() {
    let test_db = format!("/tmp/binge-test-db-existing-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);

    // Create database first time
    let pool1 = init_database(&db_path).await;
    assert!(pool1.is_ok());

    // Open database second time (should succeed)
    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());

    drop(pool1);
    drop(pool2);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_action_check_constraint() {
    let test_db = format!("/tmp/binge-test-db-check-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);
    let pool = init_database(&db_path).await.unwrap();

    // Valid action inserts fine
    let ok = sqlx::query(
        "INSERT INTO behavior_events (guid, user_id, content_id, action, occurred_at) VALUES (?, ?, 0, 'viewed', ?)",
    )
    .bind("e-1")
    .bind("user-1")
    .bind(chrono::Utc::now())
    .execute(&pool)
    .await;
    assert!(ok.is_ok());

    // Unknown action is rejected by the CHECK constraint
    let bad = sqlx::query(
        "INSERT INTO behavior_events (guid, user_id, content_id, action, occurred_at) VALUES (?, ?, 0, 'scrolled', ?)",
    )
    .bind("e-2")
    .bind("user-1")
    .bind(chrono::Utc::now())
    .execute(&pool)
    .await;
    assert!(bad.is_err(), "CHECK constraint on action should reject unknown values");

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_assignment_primary_key_is_user_experiment() {
    let test_db = format!("/tmp/binge-test-db-pk-{}.db", std::process::id());
    let db_path = PathBuf::from(&test_db);

    let _ = std::fs::remove_file(&db_path);
    let pool = init_database(&db_path).await.unwrap();

    let insert = "INSERT INTO experiment_assignments (user_id, experiment, variant, assigned_at) VALUES (?, ?, ?, ?)";

    sqlx::query(insert)
        .bind("user-1")
        .bind("row_layout")
        .bind("dense")
        .bind(chrono::Utc::now())
        .execute(&pool)
        .await
        .unwrap();

    // Same user in a different experiment is a distinct row
    sqlx::query(insert)
        .bind("user-1")
        .bind("artwork_style")
        .bind("stills")
        .bind(chrono::Utc::now())
        .execute(&pool)
        .await
        .unwrap();

    // Duplicate (user, experiment) violates the composite primary key
    let dup = sqlx::query(insert)
        .bind("user-1")
        .bind("row_layout")
        .bind("classic")
        .bind(chrono::Utc::now())
        .execute(&pool)
        .await;
    assert!(dup.is_err(), "one assignment per (user, experiment) pair");

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

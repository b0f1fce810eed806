//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up to
//! date. All statements are idempotent, so initialization is safe to call
//! from every service at startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer; event recording and
    // result queries overlap constantly
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_behavior_events_table(&pool).await?;
    create_experiments_table(&pool).await?;
    create_experiment_assignments_table(&pool).await?;

    Ok(pool)
}

/// Create the behavior_events table
///
/// One row per recorded user behavior. Experiment-only rows carry
/// content_id = 0 and the experiment/variant tags.
pub async fn create_behavior_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS behavior_events (
            guid TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            content_id INTEGER NOT NULL DEFAULT 0,
            action TEXT NOT NULL CHECK (action IN ('viewed', 'completed', 'clicked', 'rated', 'abandoned')),
            rating REAL,
            experiment TEXT,
            variant TEXT,
            metric TEXT,
            device TEXT,
            location TEXT,
            time_of_day TEXT CHECK (time_of_day IS NULL OR time_of_day IN ('night', 'morning', 'afternoon', 'evening')),
            day_of_week TEXT,
            occurred_at TIMESTAMP NOT NULL,
            CHECK (content_id >= 0),
            CHECK (rating IS NULL OR rating >= 0.0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Covering index for the per-variant aggregate query
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_behavior_events_experiment ON behavior_events(experiment, variant, action)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_behavior_events_user ON behavior_events(user_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_behavior_events_occurred ON behavior_events(occurred_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the experiments table
///
/// The experiment definition (variants, weights, metrics, dates) is stored
/// as a JSON document; the name is the lookup key.
pub async fn create_experiments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS experiments (
            name TEXT PRIMARY KEY,
            description TEXT,
            config TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the experiment_assignments table
///
/// One assignment per (user, experiment) pair. The assignment is written
/// once and reused, so repeated assignment calls stay stable and do not
/// duplicate view events.
pub async fn create_experiment_assignments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS experiment_assignments (
            user_id TEXT NOT NULL,
            experiment TEXT NOT NULL,
            variant TEXT NOT NULL,
            assigned_at TIMESTAMP NOT NULL,
            device TEXT,
            location TEXT,
            PRIMARY KEY (user_id, experiment)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_assignments_experiment ON experiment_assignments(experiment)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

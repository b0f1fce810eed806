//! SQLite-backed store
//!
//! Production implementation of both store traits over the shared
//! `behavior_events`, `experiments`, and `experiment_assignments` tables.
//! Every service instance pointed at the same database file sees the same
//! experiments and counters.

use async_trait::async_trait;
use binge_common::events::BehaviorEvent;
use binge_common::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::experiment::{AssignmentContext, ExperimentConfig, UserAssignment};
use crate::store::{BehaviorStore, DateRange, ExperimentStore, VariantCounts};

/// Store over a shared SQLite pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExperimentStore for SqliteStore {
    async fn insert(&self, config: &ExperimentConfig) -> Result<()> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM experiments WHERE name = ?)")
                .bind(&config.name)
                .fetch_one(&self.pool)
                .await?;
        if exists {
            return Err(Error::Conflict(format!("experiment '{}' already exists", config.name)));
        }

        let json = serde_json::to_string(config)
            .map_err(|e| Error::Internal(format!("serialize experiment: {e}")))?;

        sqlx::query("INSERT INTO experiments (name, description, config) VALUES (?, ?, ?)")
            .bind(&config.name)
            .bind(&config.description)
            .bind(json)
            .execute(&self.pool)
            .await?;

        debug!("Stored experiment '{}'", config.name);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<ExperimentConfig>> {
        let json: Option<String> =
            sqlx::query_scalar("SELECT config FROM experiments WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        match json {
            Some(json) => {
                let config = serde_json::from_str(&json)
                    .map_err(|e| Error::Internal(format!("deserialize experiment '{name}': {e}")))?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<ExperimentConfig>> {
        let rows: Vec<String> = sqlx::query_scalar("SELECT config FROM experiments ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|json| {
                serde_json::from_str(json)
                    .map_err(|e| Error::Internal(format!("deserialize experiment: {e}")))
            })
            .collect()
    }

    async fn get_assignment(
        &self,
        user_id: &str,
        experiment: &str,
    ) -> Result<Option<UserAssignment>> {
        let row: Option<(String, DateTime<Utc>, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT variant, assigned_at, device, location FROM experiment_assignments WHERE user_id = ? AND experiment = ?",
        )
        .bind(user_id)
        .bind(experiment)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(variant, assigned_at, device, location)| {
            let context = if device.is_some() || location.is_some() {
                Some(AssignmentContext { device, location })
            } else {
                None
            };
            UserAssignment {
                user_id: user_id.to_string(),
                experiment: experiment.to_string(),
                variant,
                assigned_at,
                context,
            }
        }))
    }

    async fn save_assignment(&self, assignment: &UserAssignment) -> Result<()> {
        let (device, location) = match &assignment.context {
            Some(context) => (context.device.clone(), context.location.clone()),
            None => (None, None),
        };

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO experiment_assignments
                (user_id, experiment, variant, assigned_at, device, location)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&assignment.user_id)
        .bind(&assignment.experiment)
        .bind(&assignment.variant)
        .bind(assignment.assigned_at)
        .bind(device)
        .bind(location)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl BehaviorStore for SqliteStore {
    async fn record_event(&self, event: &BehaviorEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO behavior_events
                (guid, user_id, content_id, action, rating, experiment, variant,
                 metric, device, location, time_of_day, day_of_week, occurred_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.guid.to_string())
        .bind(&event.user_id)
        .bind(event.content_id)
        .bind(event.action.as_str())
        .bind(event.rating)
        .bind(&event.context.experiment)
        .bind(&event.context.variant)
        .bind(&event.context.metric)
        .bind(&event.context.device)
        .bind(&event.context.location)
        .bind(event.context.time_of_day.map(|t| t.as_str()))
        .bind(&event.context.day_of_week)
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn variant_counts(
        &self,
        experiment: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<VariantCounts>> {
        let rows: Vec<(String, i64, i64)> = match range {
            Some(range) => {
                sqlx::query_as(
                    r#"
                    SELECT variant,
                           SUM(CASE WHEN action = 'viewed' THEN 1 ELSE 0 END),
                           SUM(CASE WHEN action = 'completed' THEN 1 ELSE 0 END)
                    FROM behavior_events
                    WHERE experiment = ? AND variant IS NOT NULL
                      AND occurred_at >= ? AND occurred_at <= ?
                    GROUP BY variant
                    ORDER BY variant
                    "#,
                )
                .bind(experiment)
                .bind(range.from)
                .bind(range.to)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT variant,
                           SUM(CASE WHEN action = 'viewed' THEN 1 ELSE 0 END),
                           SUM(CASE WHEN action = 'completed' THEN 1 ELSE 0 END)
                    FROM behavior_events
                    WHERE experiment = ? AND variant IS NOT NULL
                    GROUP BY variant
                    ORDER BY variant
                    "#,
                )
                .bind(experiment)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .into_iter()
            .map(|(variant, views, conversions)| VariantCounts {
                variant,
                views: views.max(0) as u64,
                conversions: conversions.max(0) as u64,
            })
            .collect())
    }
}

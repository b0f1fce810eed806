//! Persistence seams for experiments, assignments, and behavioral events
//!
//! The framework is stateless; everything durable goes through these two
//! traits. `SqliteStore` is the production implementation, `MemoryStore`
//! backs tests and embedded use.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use binge_common::events::BehaviorEvent;
use binge_common::Result;
use chrono::{DateTime, Utc};

use crate::experiment::{ExperimentConfig, UserAssignment};

/// Inclusive time window for result queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Raw per-variant counters aggregated from recorded events
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCounts {
    pub variant: String,
    pub views: u64,
    pub conversions: u64,
}

/// Repository for experiment definitions and user assignments
#[async_trait]
pub trait ExperimentStore: Send + Sync {
    /// Store a new experiment definition. Fails with `Error::Conflict`
    /// when an experiment with the same name already exists.
    async fn insert(&self, config: &ExperimentConfig) -> Result<()>;

    async fn get(&self, name: &str) -> Result<Option<ExperimentConfig>>;

    async fn list(&self) -> Result<Vec<ExperimentConfig>>;

    async fn get_assignment(&self, user_id: &str, experiment: &str)
        -> Result<Option<UserAssignment>>;

    /// Persist an assignment. Writing the same (user, experiment) pair
    /// again replaces the row.
    async fn save_assignment(&self, assignment: &UserAssignment) -> Result<()>;
}

/// Collaborator for behavioral event recording and aggregation
#[async_trait]
pub trait BehaviorStore: Send + Sync {
    async fn record_event(&self, event: &BehaviorEvent) -> Result<()>;

    /// Per-variant view/conversion counts for one experiment, optionally
    /// restricted to a time window. Variants without events are absent
    /// from the result.
    async fn variant_counts(
        &self,
        experiment: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<VariantCounts>>;
}

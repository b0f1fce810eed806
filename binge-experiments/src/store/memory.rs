//! In-memory store for tests and embedded use
//!
//! Holds everything in process-local maps. Multiple service instances do
//! NOT share this state; use `SqliteStore` for anything beyond a single
//! process.

use async_trait::async_trait;
use binge_common::events::{BehaviorAction, BehaviorEvent};
use binge_common::{Error, Result};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::experiment::{ExperimentConfig, UserAssignment};
use crate::store::{BehaviorStore, DateRange, ExperimentStore, VariantCounts};

/// Process-local implementation of both store traits
#[derive(Default)]
pub struct MemoryStore {
    experiments: RwLock<HashMap<String, ExperimentConfig>>,
    assignments: RwLock<HashMap<(String, String), UserAssignment>>,
    events: RwLock<Vec<BehaviorEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded events, for test assertions
    pub fn event_count(&self) -> usize {
        self.events.read().unwrap().len()
    }
}

#[async_trait]
impl ExperimentStore for MemoryStore {
    async fn insert(&self, config: &ExperimentConfig) -> Result<()> {
        let mut experiments = self.experiments.write().unwrap();
        if experiments.contains_key(&config.name) {
            return Err(Error::Conflict(format!("experiment '{}' already exists", config.name)));
        }
        experiments.insert(config.name.clone(), config.clone());
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<ExperimentConfig>> {
        Ok(self.experiments.read().unwrap().get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<ExperimentConfig>> {
        let mut experiments: Vec<_> = self.experiments.read().unwrap().values().cloned().collect();
        experiments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(experiments)
    }

    async fn get_assignment(
        &self,
        user_id: &str,
        experiment: &str,
    ) -> Result<Option<UserAssignment>> {
        let key = (user_id.to_string(), experiment.to_string());
        Ok(self.assignments.read().unwrap().get(&key).cloned())
    }

    async fn save_assignment(&self, assignment: &UserAssignment) -> Result<()> {
        let key = (assignment.user_id.clone(), assignment.experiment.clone());
        self.assignments.write().unwrap().insert(key, assignment.clone());
        Ok(())
    }
}

#[async_trait]
impl BehaviorStore for MemoryStore {
    async fn record_event(&self, event: &BehaviorEvent) -> Result<()> {
        self.events.write().unwrap().push(event.clone());
        Ok(())
    }

    async fn variant_counts(
        &self,
        experiment: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<VariantCounts>> {
        let events = self.events.read().unwrap();

        let mut by_variant: HashMap<String, (u64, u64)> = HashMap::new();
        for event in events.iter() {
            if event.context.experiment.as_deref() != Some(experiment) {
                continue;
            }
            if let Some(range) = range {
                if event.occurred_at < range.from || event.occurred_at > range.to {
                    continue;
                }
            }
            let Some(variant) = event.context.variant.as_deref() else {
                continue;
            };

            let entry = by_variant.entry(variant.to_string()).or_default();
            match event.action {
                BehaviorAction::Viewed => entry.0 += 1,
                BehaviorAction::Completed => entry.1 += 1,
                _ => {}
            }
        }

        let mut counts: Vec<VariantCounts> = by_variant
            .into_iter()
            .map(|(variant, (views, conversions))| VariantCounts { variant, views, conversions })
            .collect();
        counts.sort_by(|a, b| a.variant.cmp(&b.variant));
        Ok(counts)
    }
}

//! A/B testing framework
//!
//! Coordinates experiment creation, deterministic variant assignment,
//! conversion recording, and result aggregation. The framework holds no
//! experiment state of its own; everything durable lives behind the
//! injected stores, so any number of instances observe the same
//! experiments and counters.

use binge_common::events::BehaviorEvent;
use binge_common::{Error, Result};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::assignment::{bucket_for, select_variant};
use crate::experiment::{
    AssignmentContext, ExperimentConfig, UserAssignment, Variant, VariantPayload, VariantResult,
};
use crate::stats::ConfidenceMode;
use crate::store::{BehaviorStore, DateRange, ExperimentStore};

/// Confidence threshold for the significance flag
const SIGNIFICANCE_THRESHOLD: f64 = 0.95;

/// Target metrics for recommendation-algorithm experiments
const ML_TARGET_METRICS: &[&str] = &["recommendation_click", "watch_started", "watch_completed"];

/// Target metrics for UI-variant experiments
const UI_TARGET_METRICS: &[&str] = &["click_through", "engagement"];

/// Stateless experiment coordinator over injected stores
pub struct AbTestFramework {
    experiments: Arc<dyn ExperimentStore>,
    behavior: Arc<dyn BehaviorStore>,
    confidence_mode: ConfidenceMode,
}

impl AbTestFramework {
    pub fn new(experiments: Arc<dyn ExperimentStore>, behavior: Arc<dyn BehaviorStore>) -> Self {
        Self {
            experiments,
            behavior,
            confidence_mode: ConfidenceMode::default(),
        }
    }

    /// Switch the confidence computation used by result queries.
    pub fn with_confidence_mode(mut self, mode: ConfidenceMode) -> Self {
        self.confidence_mode = mode;
        self
    }

    /// Validate and store a new experiment.
    ///
    /// A name that is already in use is rejected with `Error::Conflict`;
    /// experiments are never overwritten in place.
    pub async fn create_experiment(&self, config: ExperimentConfig) -> Result<()> {
        config.validate()?;
        self.experiments.insert(&config).await?;

        info!(
            "Created experiment '{}' with {} variants, minimum sample size {}",
            config.name,
            config.variants.len(),
            config.minimum_sample_size
        );
        Ok(())
    }

    /// Assign a user to a variant of the experiment.
    ///
    /// The first call hashes the user into a weight bucket, persists the
    /// assignment, and records one `viewed` event. Later calls return the
    /// persisted assignment unchanged and record nothing, so a user's
    /// variant stays stable and view counts stay one-per-user.
    pub async fn assign_user_to_variant(
        &self,
        user_id: &str,
        experiment_name: &str,
        context: Option<AssignmentContext>,
    ) -> Result<UserAssignment> {
        let experiment = self
            .experiments
            .get(experiment_name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("experiment '{experiment_name}'")))?;

        if let Some(existing) = self.experiments.get_assignment(user_id, experiment_name).await? {
            debug!(
                "User {} already assigned to '{}' in experiment '{}'",
                user_id, existing.variant, experiment_name
            );
            return Ok(existing);
        }

        let bucket = bucket_for(user_id);
        let variant = select_variant(&experiment.variants, bucket);

        let assignment = UserAssignment {
            user_id: user_id.to_string(),
            experiment: experiment_name.to_string(),
            variant: variant.name.clone(),
            assigned_at: Utc::now(),
            context,
        };
        self.experiments.save_assignment(&assignment).await?;

        let (device, location) = match &assignment.context {
            Some(context) => (context.device.clone(), context.location.clone()),
            None => (None, None),
        };
        let event = BehaviorEvent::experiment_view(
            user_id,
            experiment_name,
            &variant.name,
            device,
            location,
            assignment.assigned_at,
        );
        self.behavior.record_event(&event).await?;

        debug!(
            "Assigned user {} to variant '{}' of experiment '{}' (bucket {})",
            user_id, variant.name, experiment_name, bucket
        );
        Ok(assignment)
    }

    /// Record a conversion for the user's assigned variant.
    ///
    /// A user without an assignment is a soft failure: the call warns,
    /// records nothing, and returns Ok.
    pub async fn record_conversion(
        &self,
        user_id: &str,
        experiment_name: &str,
        metric: &str,
        value: f64,
    ) -> Result<()> {
        let Some(assignment) = self.experiments.get_assignment(user_id, experiment_name).await?
        else {
            warn!(
                "Conversion '{}' ignored: user {} has no assignment in experiment '{}'",
                metric, user_id, experiment_name
            );
            return Ok(());
        };

        let event = BehaviorEvent::experiment_conversion(
            user_id,
            experiment_name,
            &assignment.variant,
            metric,
            value,
            Utc::now(),
        );
        self.behavior.record_event(&event).await
    }

    /// Per-variant results for an experiment, sorted by conversion rate
    /// descending.
    ///
    /// Variants with no recorded events appear with zeroed counters. The
    /// significance flag requires both the confidence threshold and the
    /// experiment's minimum sample size.
    pub async fn get_experiment_results(
        &self,
        experiment_name: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<VariantResult>> {
        let experiment = self
            .experiments
            .get(experiment_name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("experiment '{experiment_name}'")))?;

        let counts = self.behavior.variant_counts(experiment_name, range).await?;
        let by_variant: HashMap<&str, (u64, u64)> = counts
            .iter()
            .map(|c| (c.variant.as_str(), (c.views, c.conversions)))
            .collect();

        let total_views: u64 = counts.iter().map(|c| c.views).sum();
        let total_conversions: u64 = counts.iter().map(|c| c.conversions).sum();
        let minimum_sample = u64::from(experiment.minimum_sample_size);

        let mut results: Vec<VariantResult> = experiment
            .variants
            .iter()
            .map(|variant| {
                let (views, conversions) =
                    by_variant.get(variant.name.as_str()).copied().unwrap_or((0, 0));
                let rest = (total_conversions - conversions, total_views - views);

                let conversion_rate = if views == 0 {
                    0.0
                } else {
                    conversions as f64 / views as f64
                };
                let confidence = self.confidence_mode.confidence(conversions, views, rest);

                VariantResult {
                    variant: variant.name.clone(),
                    views,
                    conversions,
                    conversion_rate,
                    confidence,
                    statistically_significant: confidence >= SIGNIFICANCE_THRESHOLD
                        && views >= minimum_sample,
                    sample_size: views,
                }
            })
            .collect();

        results.sort_by(|a, b| b.conversion_rate.total_cmp(&a.conversion_rate));
        Ok(results)
    }

    /// Best-performing variant among those flagged statistically
    /// significant, or None while the experiment is undecided.
    pub async fn get_winning_variant(&self, experiment_name: &str) -> Result<Option<VariantResult>> {
        let results = self.get_experiment_results(experiment_name, None).await?;
        Ok(results.into_iter().find(|r| r.statistically_significant))
    }

    /// Convenience wrapper: equal-weighted recommendation-algorithm
    /// experiment with the standard engagement metrics.
    pub async fn create_ml_algorithm_test(
        &self,
        name: &str,
        algorithms: Vec<(String, serde_json::Value)>,
    ) -> Result<()> {
        let variants = equal_weighted(
            algorithms
                .into_iter()
                .map(|(algorithm, params)| {
                    let payload = VariantPayload::MlAlgorithm {
                        algorithm: algorithm.clone(),
                        params,
                    };
                    (algorithm, payload)
                })
                .collect(),
        );

        let now = Utc::now();
        self.create_experiment(ExperimentConfig {
            name: name.to_string(),
            description: Some("Recommendation algorithm comparison".to_string()),
            variants,
            start_date: now,
            end_date: Some(now + Duration::days(30)),
            target_metrics: ML_TARGET_METRICS.iter().map(|m| m.to_string()).collect(),
            minimum_sample_size: 100,
        })
        .await
    }

    /// Convenience wrapper: equal-weighted UI experiment with the standard
    /// interaction metrics.
    pub async fn create_ui_variant_test(
        &self,
        name: &str,
        variants: Vec<(String, serde_json::Value)>,
    ) -> Result<()> {
        let variants = equal_weighted(
            variants
                .into_iter()
                .map(|(variant_name, properties)| {
                    (variant_name, VariantPayload::Ui { properties })
                })
                .collect(),
        );

        let now = Utc::now();
        self.create_experiment(ExperimentConfig {
            name: name.to_string(),
            description: Some("UI variant comparison".to_string()),
            variants,
            start_date: now,
            end_date: Some(now + Duration::days(14)),
            target_metrics: UI_TARGET_METRICS.iter().map(|m| m.to_string()).collect(),
            minimum_sample_size: 50,
        })
        .await
    }
}

/// Split traffic evenly across the given arms.
fn equal_weighted(arms: Vec<(String, VariantPayload)>) -> Vec<Variant> {
    let weight = 100.0 / arms.len().max(1) as f64;
    arms.into_iter()
        .map(|(name, payload)| Variant { name, weight, payload })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn framework() -> (Arc<MemoryStore>, AbTestFramework) {
        let store = Arc::new(MemoryStore::new());
        let framework = AbTestFramework::new(store.clone(), store.clone());
        (store, framework)
    }

    fn two_variant_config(name: &str) -> ExperimentConfig {
        ExperimentConfig {
            name: name.to_string(),
            description: None,
            variants: vec![
                Variant {
                    name: "control".to_string(),
                    weight: 50.0,
                    payload: VariantPayload::Ui { properties: serde_json::json!({"layout": "classic"}) },
                },
                Variant {
                    name: "dense".to_string(),
                    weight: 50.0,
                    payload: VariantPayload::Ui { properties: serde_json::json!({"layout": "dense"}) },
                },
            ],
            start_date: Utc::now(),
            end_date: None,
            target_metrics: vec!["click_through".to_string()],
            minimum_sample_size: 10,
        }
    }

    #[tokio::test]
    async fn duplicate_experiment_name_is_a_conflict() {
        let (_store, framework) = framework();

        framework.create_experiment(two_variant_config("row_layout")).await.unwrap();
        let err = framework.create_experiment(two_variant_config("row_layout")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_storage() {
        let (store, framework) = framework();

        let mut config = two_variant_config("bad_weights");
        config.variants[1].weight = 40.0;
        assert!(framework.create_experiment(config).await.is_err());
        assert!(ExperimentStore::get(store.as_ref(), "bad_weights").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn assignment_to_unknown_experiment_fails() {
        let (_store, framework) = framework();

        let err = framework.assign_user_to_variant("user-1", "missing", None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn assignment_is_stable_and_records_one_view() {
        let (store, framework) = framework();
        framework.create_experiment(two_variant_config("row_layout")).await.unwrap();

        let first = framework.assign_user_to_variant("user-1", "row_layout", None).await.unwrap();
        let second = framework.assign_user_to_variant("user-1", "row_layout", None).await.unwrap();

        assert_eq!(first.variant, second.variant);
        assert_eq!(first.assigned_at, second.assigned_at);
        // Re-assignment must not duplicate the view event
        assert_eq!(store.event_count(), 1);
    }

    #[tokio::test]
    async fn conversion_without_assignment_is_a_soft_noop() {
        let (store, framework) = framework();
        framework.create_experiment(two_variant_config("row_layout")).await.unwrap();

        framework
            .record_conversion("stranger", "row_layout", "click_through", 1.0)
            .await
            .unwrap();

        assert_eq!(store.event_count(), 0);
        let results = framework.get_experiment_results("row_layout", None).await.unwrap();
        assert!(results.iter().all(|r| r.conversions == 0));
    }

    #[tokio::test]
    async fn results_include_variants_without_events() {
        let (_store, framework) = framework();
        framework.create_experiment(two_variant_config("row_layout")).await.unwrap();

        let results = framework.get_experiment_results("row_layout", None).await.unwrap();
        assert_eq!(results.len(), 2);
        for result in results {
            assert_eq!(result.views, 0);
            assert_eq!(result.conversion_rate, 0.0);
            assert!(!result.statistically_significant);
        }
    }

    #[tokio::test]
    async fn winner_is_none_below_thresholds() {
        let (_store, framework) = framework();
        framework.create_experiment(two_variant_config("row_layout")).await.unwrap();

        let user = "user-1";
        framework.assign_user_to_variant(user, "row_layout", None).await.unwrap();
        framework.record_conversion(user, "row_layout", "click_through", 1.0).await.unwrap();

        assert!(framework.get_winning_variant("row_layout").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ml_wrapper_builds_equal_weights_and_metrics() {
        let (store, framework) = framework();

        framework
            .create_ml_algorithm_test(
                "ranker_comparison",
                vec![
                    ("collaborative_filtering".to_string(), serde_json::json!({"neighbors": 25})),
                    ("matrix_factorization".to_string(), serde_json::json!({"rank": 64})),
                ],
            )
            .await
            .unwrap();

        let config = ExperimentStore::get(store.as_ref(), "ranker_comparison")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.variants.len(), 2);
        assert!(config.variants.iter().all(|v| (v.weight - 50.0).abs() < 1e-9));
        assert_eq!(config.target_metrics, vec![
            "recommendation_click",
            "watch_started",
            "watch_completed"
        ]);
        assert_eq!(config.minimum_sample_size, 100);
        assert!(matches!(config.variants[0].payload, VariantPayload::MlAlgorithm { .. }));
    }

    #[tokio::test]
    async fn ui_wrapper_builds_equal_weights_for_three_arms() {
        let (store, framework) = framework();

        framework
            .create_ui_variant_test(
                "artwork_style",
                vec![
                    ("stills".to_string(), serde_json::json!({"artwork": "stills"})),
                    ("posters".to_string(), serde_json::json!({"artwork": "posters"})),
                    ("animated".to_string(), serde_json::json!({"artwork": "animated"})),
                ],
            )
            .await
            .unwrap();

        let config = ExperimentStore::get(store.as_ref(), "artwork_style")
            .await
            .unwrap()
            .unwrap();
        let total: f64 = config.variants.iter().map(|v| v.weight).sum();
        assert!((total - 100.0).abs() < 0.01);
        assert_eq!(config.minimum_sample_size, 50);
    }
}

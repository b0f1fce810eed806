//! Recommendation configuration and feature flags
//!
//! Single source of truth, selected by deployment environment, for which
//! optional recommendation behaviors are active and for operational tuning
//! (cache timeout, batch size, alert thresholds, pool size).
//!
//! Flag getters AND-combine the static per-environment toggle with a
//! runtime environment-variable override: a flag is active only when the
//! configuration enables it and the matching `ENABLE_*` variable is not
//! set to the literal string `"false"`.

use binge_common::config::Environment;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Optional algorithmic behaviors, toggled per environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureToggles {
    pub advanced_personalization: bool,
    pub seasonal_boosts: bool,
    pub device_optimization: bool,
    pub contextual_recommendations: bool,
    pub ab_testing: bool,
    pub performance_tracking: bool,
    pub anomaly_detection: bool,
    pub pre_aggregation: bool,
}

/// Recommendation cache tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    pub timeout_secs: u64,
    pub batch_size: u32,
}

/// Performance monitoring thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitoringSettings {
    /// Queries slower than this are reported
    pub slow_query_threshold_ms: u64,
    /// Alert when the rolling error rate exceeds this percentage
    pub error_rate_alert_pct: f64,
}

/// Per-environment recommendation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub environment: Environment,
    pub features: FeatureToggles,
    pub cache: CacheSettings,
    pub monitoring: MonitoringSettings,
    pub db_pool_size: u32,
}

/// Structured validation outcome; never panics, callers decide whether
/// errors are fatal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

static CONFIGS: Lazy<HashMap<Environment, RecommendationConfig>> = Lazy::new(|| {
    let mut configs = HashMap::new();

    configs.insert(
        Environment::Development,
        RecommendationConfig {
            environment: Environment::Development,
            features: FeatureToggles {
                advanced_personalization: true,
                seasonal_boosts: true,
                device_optimization: true,
                contextual_recommendations: true,
                ab_testing: true,
                performance_tracking: true,
                anomaly_detection: false,
                pre_aggregation: false,
            },
            cache: CacheSettings { timeout_secs: 60, batch_size: 50 },
            monitoring: MonitoringSettings {
                slow_query_threshold_ms: 1000,
                error_rate_alert_pct: 5.0,
            },
            db_pool_size: 5,
        },
    );

    configs.insert(
        Environment::Staging,
        RecommendationConfig {
            environment: Environment::Staging,
            features: FeatureToggles {
                advanced_personalization: true,
                seasonal_boosts: true,
                device_optimization: true,
                contextual_recommendations: true,
                ab_testing: true,
                performance_tracking: true,
                anomaly_detection: true,
                pre_aggregation: false,
            },
            cache: CacheSettings { timeout_secs: 300, batch_size: 100 },
            monitoring: MonitoringSettings {
                slow_query_threshold_ms: 750,
                error_rate_alert_pct: 2.0,
            },
            db_pool_size: 10,
        },
    );

    configs.insert(
        Environment::Production,
        RecommendationConfig {
            environment: Environment::Production,
            features: FeatureToggles {
                advanced_personalization: true,
                seasonal_boosts: true,
                device_optimization: true,
                contextual_recommendations: true,
                ab_testing: true,
                performance_tracking: true,
                anomaly_detection: true,
                pre_aggregation: true,
            },
            cache: CacheSettings { timeout_secs: 900, batch_size: 200 },
            monitoring: MonitoringSettings {
                slow_query_threshold_ms: 500,
                error_rate_alert_pct: 1.0,
            },
            db_pool_size: 20,
        },
    );

    configs
});

impl RecommendationConfig {
    /// Configuration for the given environment. Pure lookup, no side
    /// effects.
    pub fn for_environment(environment: Environment) -> &'static Self {
        CONFIGS
            .get(&environment)
            .expect("configuration must exist for every environment")
    }

    /// Configuration for the environment resolved from `BINGE_ENV`
    /// (falls back to development).
    pub fn current() -> &'static Self {
        Self::for_environment(Environment::detect())
    }

    pub fn advanced_personalization_enabled(&self) -> bool {
        flag_enabled(self.features.advanced_personalization, "ENABLE_ADVANCED_PERSONALIZATION")
    }

    pub fn seasonal_boosts_enabled(&self) -> bool {
        flag_enabled(self.features.seasonal_boosts, "ENABLE_SEASONAL_BOOSTS")
    }

    pub fn device_optimization_enabled(&self) -> bool {
        flag_enabled(self.features.device_optimization, "ENABLE_DEVICE_OPTIMIZATION")
    }

    pub fn contextual_recommendations_enabled(&self) -> bool {
        flag_enabled(self.features.contextual_recommendations, "ENABLE_CONTEXTUAL_RECOMMENDATIONS")
    }

    pub fn ab_testing_enabled(&self) -> bool {
        flag_enabled(self.features.ab_testing, "ENABLE_AB_TESTING")
    }

    pub fn performance_tracking_enabled(&self) -> bool {
        flag_enabled(self.features.performance_tracking, "ENABLE_PERFORMANCE_TRACKING")
    }

    pub fn anomaly_detection_enabled(&self) -> bool {
        flag_enabled(self.features.anomaly_detection, "ENABLE_ANOMALY_DETECTION")
    }

    pub fn pre_aggregation_enabled(&self) -> bool {
        flag_enabled(self.features.pre_aggregation, "ENABLE_PRE_AGGREGATION")
    }

    /// Check each numeric setting against its acceptable range.
    ///
    /// Returns the full error list instead of failing on the first
    /// violation; startup code decides whether to halt.
    pub fn validate(&self) -> ConfigValidation {
        let mut errors = Vec::new();

        if !(30..=3600).contains(&self.cache.timeout_secs) {
            errors.push(format!(
                "cache.timeout_secs: {} out of range [30, 3600]",
                self.cache.timeout_secs
            ));
        }
        if !(1..=1000).contains(&self.cache.batch_size) {
            errors.push(format!(
                "cache.batch_size: {} out of range [1, 1000]",
                self.cache.batch_size
            ));
        }
        if !(50..=60_000).contains(&self.monitoring.slow_query_threshold_ms) {
            errors.push(format!(
                "monitoring.slow_query_threshold_ms: {} out of range [50, 60000]",
                self.monitoring.slow_query_threshold_ms
            ));
        }
        if !(0.1..=50.0).contains(&self.monitoring.error_rate_alert_pct) {
            errors.push(format!(
                "monitoring.error_rate_alert_pct: {} out of range [0.1, 50.0]",
                self.monitoring.error_rate_alert_pct
            ));
        }
        if !(1..=100).contains(&self.db_pool_size) {
            errors.push(format!("db_pool_size: {} out of range [1, 100]", self.db_pool_size));
        }

        ConfigValidation { valid: errors.is_empty(), errors }
    }

    /// Log the resolved configuration at startup.
    pub fn log_active(&self) {
        info!(
            "Recommendation config ({}): personalization={} seasonal={} device={} contextual={} ab_testing={} perf_tracking={} anomaly={} pre_agg={}",
            self.environment,
            self.advanced_personalization_enabled(),
            self.seasonal_boosts_enabled(),
            self.device_optimization_enabled(),
            self.contextual_recommendations_enabled(),
            self.ab_testing_enabled(),
            self.performance_tracking_enabled(),
            self.anomaly_detection_enabled(),
            self.pre_aggregation_enabled(),
        );
        info!(
            "Cache: timeout={}s batch={} | monitoring: slow_query={}ms error_alert={}% | pool={}",
            self.cache.timeout_secs,
            self.cache.batch_size,
            self.monitoring.slow_query_threshold_ms,
            self.monitoring.error_rate_alert_pct,
            self.db_pool_size,
        );
    }
}

/// A flag is active when the static toggle is on AND the runtime override
/// is not explicitly "false". Unset variables leave the toggle untouched.
fn flag_enabled(configured: bool, env_var: &str) -> bool {
    configured && std::env::var(env_var).map(|v| v != "false").unwrap_or(true)
}

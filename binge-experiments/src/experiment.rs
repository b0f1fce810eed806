//! Experiment data model
//!
//! An experiment is a named set of weighted variants with target metrics
//! and a minimum sample size. Variant behavior payloads are tagged per
//! experiment kind rather than free-form maps, so callers get typed access
//! for the known kinds and a JSON escape hatch for everything else.

use binge_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Behavior configuration carried by a variant, interpreted by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum VariantPayload {
    /// Recommendation-algorithm experiment arm
    MlAlgorithm {
        algorithm: String,
        params: serde_json::Value,
    },
    /// UI-variant experiment arm (layouts, colors, copy)
    Ui { properties: serde_json::Value },
    /// Escape hatch for experiment kinds the model does not know yet
    Custom(serde_json::Value),
}

/// One arm of an experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    /// Traffic share in percent; all weights of an experiment sum to 100
    pub weight: f64,
    pub payload: VariantPayload,
}

/// Experiment definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub name: String,
    pub description: Option<String>,
    pub variants: Vec<Variant>,
    pub start_date: DateTime<Utc>,
    /// Informational only; experiments are not closed automatically
    pub end_date: Option<DateTime<Utc>>,
    pub target_metrics: Vec<String>,
    pub minimum_sample_size: u32,
}

impl ExperimentConfig {
    /// Validate the definition before it is stored.
    ///
    /// Weight tolerance absorbs floating-point drift from equal splits
    /// like 100/3.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("experiment name must not be empty".to_string()));
        }

        if self.variants.len() < 2 {
            return Err(Error::InvalidInput(format!(
                "experiment '{}' needs at least 2 variants, got {}",
                self.name,
                self.variants.len()
            )));
        }

        for variant in &self.variants {
            if !(0.0..=100.0).contains(&variant.weight) {
                return Err(Error::InvalidInput(format!(
                    "variant '{}' weight {} out of range [0, 100]",
                    variant.name, variant.weight
                )));
            }
        }

        let total: f64 = self.variants.iter().map(|v| v.weight).sum();
        if (total - 100.0).abs() > 0.01 {
            return Err(Error::InvalidInput(format!(
                "variant weights of '{}' sum to {}, expected 100",
                self.name, total
            )));
        }

        if self.minimum_sample_size < 10 {
            return Err(Error::InvalidInput(format!(
                "experiment '{}' minimum sample size {} is below 10",
                self.name, self.minimum_sample_size
            )));
        }

        Ok(())
    }
}

/// Context captured at assignment time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentContext {
    pub device: Option<String>,
    pub location: Option<String>,
}

/// A user's stable variant assignment within one experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAssignment {
    pub user_id: String,
    pub experiment: String,
    pub variant: String,
    pub assigned_at: DateTime<Utc>,
    pub context: Option<AssignmentContext>,
}

/// Per-variant aggregate computed on demand from recorded events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantResult {
    pub variant: String,
    pub views: u64,
    pub conversions: u64,
    /// conversions / views; 0 when the variant has no views
    pub conversion_rate: f64,
    pub confidence: f64,
    /// confidence >= 0.95 and views >= the experiment's minimum sample size
    pub statistically_significant: bool,
    pub sample_size: u64,
}

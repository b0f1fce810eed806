//! # BingeBoard Experimentation Library
//!
//! The experimentation layer of BingeBoard:
//! - Per-environment recommendation configuration and feature flags
//! - A/B experiment definitions with weighted variants
//! - Deterministic user-to-variant assignment
//! - Conversion tracking over the behavioral event store
//! - Per-variant result aggregation with confidence estimation
//!
//! The framework itself is stateless; experiment definitions, assignments
//! and events live behind the [`store::ExperimentStore`] and
//! [`store::BehaviorStore`] seams, so any number of service instances
//! share a consistent view.

pub mod assignment;
pub mod config;
pub mod experiment;
pub mod framework;
pub mod stats;
pub mod store;

pub use config::{ConfigValidation, RecommendationConfig};
pub use experiment::{
    AssignmentContext, ExperimentConfig, UserAssignment, Variant, VariantPayload, VariantResult,
};
pub use framework::AbTestFramework;
pub use stats::ConfidenceMode;
pub use store::{BehaviorStore, DateRange, ExperimentStore, MemoryStore, SqliteStore, VariantCounts};

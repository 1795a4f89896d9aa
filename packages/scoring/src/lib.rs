#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Multi-factor site suitability scoring.
//!
//! Given a validated [`Grid`](locate_spatial::Grid) and a
//! [`PoiCatalogue`](locate_spatial::PoiCatalogue), the [`ScoringEngine`]
//! computes five normalized factors per cell, combines them with the target
//! POI type's [`Strategy`](locate_scoring_models::Strategy), and returns a
//! ranked table covering every cell. An optional growth pass classifies
//! cells by density trend.
//!
//! The engine performs no I/O. Missing data never becomes a zero score: it
//! is carried as [`FactorValue::Undetermined`](locate_scoring_models::FactorValue)
//! and the affected weights are redistributed per cell.

pub mod analysis;
pub mod engine;
pub mod explain;
pub mod factors;
pub mod growth;
pub mod strategy;

pub use engine::{ScoringConfig, ScoringEngine, ScoringRun};
pub use explain::explain;
pub use factors::{AccessibilitySettings, FactorSettings};
pub use growth::{GrowthClassifier, GrowthInputs};
pub use strategy::StrategyRegistry;

use locate_poi_models::UnknownPoiTypeError;
use locate_spatial::GridError;

/// Errors that can occur while scoring.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    /// The requested POI type has no registered strategy.
    #[error("unknown POI type: {0}")]
    UnknownPoiType(String),

    /// The grid failed validation.
    #[error("invalid grid configuration: {0}")]
    InvalidGridConfiguration(#[from] GridError),

    /// A strategy in the registry is malformed.
    #[error("invalid strategy for {poi_type}: {message}")]
    InvalidStrategy {
        /// POI type the strategy was registered for.
        poi_type: String,
        /// What is wrong with it.
        message: String,
    },

    /// A factor setting is out of range.
    #[error("invalid factor settings: {0}")]
    InvalidSettings(String),

    /// The strategy document could not be parsed.
    #[error("strategy config error: {0}")]
    StrategyConfig(#[from] toml::de::Error),

    /// The run was cancelled before it completed.
    #[error("scoring run cancelled")]
    Cancelled,
}

impl From<UnknownPoiTypeError> for ScoringError {
    fn from(e: UnknownPoiTypeError) -> Self {
        Self::UnknownPoiType(e.name)
    }
}

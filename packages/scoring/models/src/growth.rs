//! Growth trend types.

use locate_geography_models::CellId;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Trend category for a cell's density change.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GrowthCategory {
    /// Growing fast from a below-median base.
    Emerging,
    /// Growing fast from an at-or-above-median base.
    HighGrowth,
    /// Growing moderately.
    Growing,
    /// Flat, shrinking, or not enough history.
    Stable,
}

/// How much the classification can be trusted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Confidence {
    /// Both snapshots were available.
    High,
    /// At least one snapshot was missing.
    Low,
}

/// Baseline and recent densities for one cell, in POIs per square
/// kilometre. Either may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensitySnapshot {
    /// Density at the start of the comparison.
    #[serde(default)]
    pub baseline: Option<f64>,
    /// Density at the end of the comparison.
    #[serde(default)]
    pub recent: Option<f64>,
}

impl DensitySnapshot {
    /// A snapshot with both densities present.
    #[must_use]
    pub const fn new(baseline: f64, recent: f64) -> Self {
        Self {
            baseline: Some(baseline),
            recent: Some(recent),
        }
    }

    /// Both densities, if present and finite.
    #[must_use]
    pub fn both(&self) -> Option<(f64, f64)> {
        match (self.baseline, self.recent) {
            (Some(b), Some(r)) if b.is_finite() && r.is_finite() => Some((b, r)),
            _ => None,
        }
    }
}

/// Classification result for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthRecord {
    /// Cell identifier.
    pub cell_id: CellId,
    /// Trend category.
    pub category: GrowthCategory,
    /// Relative change, when both snapshots exist.
    pub rate: Option<f64>,
    /// Confidence in the category.
    pub confidence: Confidence,
}

/// Thresholds separating the growth categories.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GrowthThresholds {
    /// Rates strictly above this are high growth (or emerging).
    pub high_growth_rate: f64,
    /// Rates strictly above this (and not high growth) are growing.
    pub growing_rate: f64,
    /// Floor on the baseline used as the rate denominator.
    pub epsilon: f64,
}

impl Default for GrowthThresholds {
    fn default() -> Self {
        Self {
            high_growth_rate: 0.5,
            growing_rate: 0.1,
            epsilon: 1e-9,
        }
    }
}

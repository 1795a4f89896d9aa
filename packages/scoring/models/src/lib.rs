#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Scoring inputs and result types.
//!
//! Defines the factor taxonomy, per-type weight vectors and competitor
//! penalty policies, and the ranked score table the engine returns.
//! Missing data is carried as [`FactorValue::Undetermined`] all the way
//! through to the output so it is never mistaken for a score of zero.

pub mod analysis;
pub mod growth;

use locate_geography_models::{CellId, Coordinates};
use locate_poi_models::PoiKind;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Tolerance for weight vectors summing to one.
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// The five scoring factors.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FactorKind {
    /// Count of all POIs in the cell footprint.
    PoiDensity,
    /// Count of commercial POIs in the cell footprint.
    CommercialDensity,
    /// Count of residential POIs in the cell footprint.
    Residential,
    /// Proximity to transit.
    Accessibility,
    /// Proximity to an existing competitor. Subtracted, not added.
    CompetitorPenalty,
}

impl FactorKind {
    /// All factors in canonical order.
    pub const ALL: [Self; 5] = [
        Self::PoiDensity,
        Self::CommercialDensity,
        Self::Residential,
        Self::Accessibility,
        Self::CompetitorPenalty,
    ];

    /// Whether the factor adds to the composite score.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        !matches!(self, Self::CompetitorPenalty)
    }
}

/// A normalized factor value, or an explicit marker that the factor could
/// not be observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorValue {
    /// Observed value in `[0, 1]`.
    Value(f64),
    /// No data to compute the factor from.
    Undetermined,
}

impl FactorValue {
    /// Wraps `value`, clamping it into `[0, 1]`. Non-finite input is
    /// treated as undetermined.
    #[must_use]
    pub const fn clamped(value: f64) -> Self {
        if value.is_finite() {
            Self::Value(value.clamp(0.0, 1.0))
        } else {
            Self::Undetermined
        }
    }

    /// The value, if determined.
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::Undetermined => None,
        }
    }

    /// Whether a value is present.
    #[must_use]
    pub const fn is_determined(self) -> bool {
        matches!(self, Self::Value(_))
    }
}

impl From<Option<f64>> for FactorValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Undetermined, Self::clamped)
    }
}

/// One value per factor for a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorValues {
    /// POI density.
    pub poi_density: FactorValue,
    /// Commercial density.
    pub commercial_density: FactorValue,
    /// Residential score.
    pub residential: FactorValue,
    /// Accessibility.
    pub accessibility: FactorValue,
    /// Competitor penalty.
    pub competitor_penalty: FactorValue,
}

impl Default for FactorValues {
    fn default() -> Self {
        Self {
            poi_density: FactorValue::Undetermined,
            commercial_density: FactorValue::Undetermined,
            residential: FactorValue::Undetermined,
            accessibility: FactorValue::Undetermined,
            competitor_penalty: FactorValue::Undetermined,
        }
    }
}

impl FactorValues {
    /// Value for `kind`.
    #[must_use]
    pub const fn get(&self, kind: FactorKind) -> FactorValue {
        match kind {
            FactorKind::PoiDensity => self.poi_density,
            FactorKind::CommercialDensity => self.commercial_density,
            FactorKind::Residential => self.residential,
            FactorKind::Accessibility => self.accessibility,
            FactorKind::CompetitorPenalty => self.competitor_penalty,
        }
    }

    /// Sets the value for `kind`.
    pub const fn set(&mut self, kind: FactorKind, value: FactorValue) {
        match kind {
            FactorKind::PoiDensity => self.poi_density = value,
            FactorKind::CommercialDensity => self.commercial_density = value,
            FactorKind::Residential => self.residential = value,
            FactorKind::Accessibility => self.accessibility = value,
            FactorKind::CompetitorPenalty => self.competitor_penalty = value,
        }
    }

    /// Whether at least one additive factor is determined.
    #[must_use]
    pub fn any_positive_determined(&self) -> bool {
        FactorKind::ALL
            .iter()
            .any(|k| k.is_positive() && self.get(*k).is_determined())
    }
}

/// Errors raised when validating a weight vector.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightsError {
    /// A weight is negative or not finite.
    #[error("weight for {factor} must be a non-negative number, got {value}")]
    Invalid {
        /// Offending factor.
        factor: FactorKind,
        /// Rejected value.
        value: f64,
    },

    /// The weights do not sum to one.
    #[error("weights must sum to 1.0, got {sum}")]
    BadSum {
        /// Actual sum.
        sum: f64,
    },
}

/// Per-type emphasis across the five factors. Sums to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoreWeights {
    /// Weight of POI density.
    pub poi_density: f64,
    /// Weight of commercial density.
    pub commercial_density: f64,
    /// Weight of the residential score.
    pub residential: f64,
    /// Weight of accessibility.
    pub accessibility: f64,
    /// Weight of the competitor penalty.
    pub competitor: f64,
}

impl ScoreWeights {
    /// Builds and validates a weight vector.
    ///
    /// # Errors
    ///
    /// Returns [`WeightsError`] if any weight is negative or the weights
    /// do not sum to one.
    pub fn new(
        poi_density: f64,
        commercial_density: f64,
        residential: f64,
        accessibility: f64,
        competitor: f64,
    ) -> Result<Self, WeightsError> {
        let weights = Self {
            poi_density,
            commercial_density,
            residential,
            accessibility,
            competitor,
        };
        weights.validate()?;
        Ok(weights)
    }

    /// Checks every weight is non-negative and the total is one.
    ///
    /// # Errors
    ///
    /// Returns [`WeightsError`] on the first violation.
    pub fn validate(&self) -> Result<(), WeightsError> {
        for factor in FactorKind::ALL {
            let value = self.get(factor);
            if !value.is_finite() || value < 0.0 {
                return Err(WeightsError::Invalid { factor, value });
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_EPSILON {
            return Err(WeightsError::BadSum { sum });
        }

        Ok(())
    }

    /// Weight for `kind`.
    #[must_use]
    pub const fn get(&self, kind: FactorKind) -> f64 {
        match kind {
            FactorKind::PoiDensity => self.poi_density,
            FactorKind::CommercialDensity => self.commercial_density,
            FactorKind::Residential => self.residential,
            FactorKind::Accessibility => self.accessibility,
            FactorKind::CompetitorPenalty => self.competitor,
        }
    }

    const fn set(&mut self, kind: FactorKind, value: f64) {
        match kind {
            FactorKind::PoiDensity => self.poi_density = value,
            FactorKind::CommercialDensity => self.commercial_density = value,
            FactorKind::Residential => self.residential = value,
            FactorKind::Accessibility => self.accessibility = value,
            FactorKind::CompetitorPenalty => self.competitor = value,
        }
    }

    /// Sum of all five weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        FactorKind::ALL.iter().map(|k| self.get(*k)).sum()
    }

    /// Sum of the additive weights.
    #[must_use]
    pub fn positive_sum(&self) -> f64 {
        FactorKind::ALL
            .iter()
            .filter(|k| k.is_positive())
            .map(|k| self.get(*k))
            .sum()
    }

    /// Zeroes the weights of factors for which `keep` is false and scales
    /// the rest back up to sum to one.
    ///
    /// If nothing with positive weight is kept, every weight is zero.
    #[must_use]
    pub fn renormalized(&self, keep: impl Fn(FactorKind) -> bool) -> Self {
        let mut out = *self;
        for kind in FactorKind::ALL {
            if !keep(kind) {
                out.set(kind, 0.0);
            }
        }

        let total = out.sum();
        for kind in FactorKind::ALL {
            let scaled = if total > 0.0 {
                out.get(kind) / total
            } else {
                0.0
            };
            out.set(kind, scaled);
        }
        out
    }
}

/// Curve the competitor penalty follows between the saturation radius and
/// the outer radius. `t` runs from 0 at the saturation radius to 1 at the
/// outer radius.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DecayShape {
    /// `1 - t`
    #[default]
    Linear,
    /// `(1 - t)^2`, falls off quickly past the saturation radius
    Quadratic,
    /// `(1 + cos(pi * t)) / 2`, smooth at both ends
    Cosine,
}

impl DecayShape {
    /// Evaluates the curve at `t`, clamped to `[0, 1]`.
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => 1.0 - t,
            Self::Quadratic => (1.0 - t) * (1.0 - t),
            Self::Cosine => f64::midpoint(1.0, (std::f64::consts::PI * t).cos()),
        }
    }
}

/// Competitor distance policy for one POI type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PenaltyConfig {
    /// Below this distance the penalty is at its maximum and the cell is
    /// disqualified.
    pub saturation_radius_km: f64,
    /// Distance past the saturation radius over which the penalty decays
    /// to zero.
    pub falloff_km: f64,
    /// Decay curve.
    #[serde(default)]
    pub shape: DecayShape,
    /// Kinds counted as competitors. Empty means the target kind only.
    #[serde(default)]
    pub competitor_kinds: Vec<PoiKind>,
}

impl PenaltyConfig {
    /// Distance at and beyond which the penalty is zero.
    #[must_use]
    pub fn outer_radius_km(&self) -> f64 {
        self.saturation_radius_km + self.falloff_km
    }

    /// Whether a competitor `distance_km` away saturates the penalty.
    #[must_use]
    pub fn is_saturated(&self, distance_km: f64) -> bool {
        distance_km <= self.saturation_radius_km
    }

    /// Penalty in `[0, 1]` for a competitor `distance_km` away.
    /// Non-increasing in distance.
    #[must_use]
    pub fn penalty(&self, distance_km: f64) -> f64 {
        if self.is_saturated(distance_km) {
            return 1.0;
        }
        if self.falloff_km <= 0.0 || distance_km >= self.outer_radius_km() {
            return 0.0;
        }
        self.shape
            .apply((distance_km - self.saturation_radius_km) / self.falloff_km)
    }
}

/// The resolved scoring policy for one POI type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Strategy {
    /// Target POI type.
    pub poi_type: PoiKind,
    /// Human-readable label.
    pub label: String,
    /// Factor weights.
    pub weights: ScoreWeights,
    /// Competitor distance policy.
    pub penalty: PenaltyConfig,
}

impl Strategy {
    /// Kinds that count as competitors for this strategy.
    #[must_use]
    pub fn competitor_kinds(&self) -> Vec<PoiKind> {
        if self.penalty.competitor_kinds.is_empty() {
            vec![self.poi_type]
        } else {
            self.penalty.competitor_kinds.clone()
        }
    }
}

/// A scored (or explicitly unscored) grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeScore {
    /// Cell identifier.
    pub cell_id: CellId,
    /// Cell centroid.
    pub centroid: Coordinates,
    /// POI type the score was computed for.
    pub poi_type: PoiKind,
    /// Composite value in `[0, 1]`, or undetermined when no additive
    /// factor could be observed for the cell.
    pub score: FactorValue,
    /// 1-based position in the ranked table.
    pub rank: usize,
    /// Contributing factor values.
    pub factors: FactorValues,
    /// Weights after dropping undetermined factors for this cell.
    pub effective_weights: ScoreWeights,
    /// Whether a competitor sits inside the saturation radius.
    pub disqualified: bool,
    /// Distance to the nearest competitor, when one exists.
    pub nearest_competitor_km: Option<f64>,
}

impl CompositeScore {
    /// Whether the cell could not be scored.
    #[must_use]
    pub const fn is_undetermined(&self) -> bool {
        !self.score.is_determined()
    }
}

/// Ranked composite scores for every cell of a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreTable {
    /// POI type scored.
    pub poi_type: PoiKind,
    /// Factors dropped for the whole run because no data existed
    /// region-wide.
    pub excluded_factors: Vec<FactorKind>,
    /// One entry per cell, best first.
    pub entries: Vec<CompositeScore>,
}

impl ScoreTable {
    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The best `n` recommendations. Undetermined and disqualified cells
    /// are never recommended.
    #[must_use]
    pub fn top(&self, n: usize) -> Vec<&CompositeScore> {
        self.entries
            .iter()
            .filter(|e| !e.is_undetermined() && !e.disqualified)
            .take(n)
            .collect()
    }

    /// Entry for `cell_id`.
    #[must_use]
    pub fn get(&self, cell_id: CellId) -> Option<&CompositeScore> {
        self.entries.iter().find(|e| e.cell_id == cell_id)
    }

    /// Entries whose score is undetermined.
    pub fn undetermined(&self) -> impl Iterator<Item = &CompositeScore> {
        self.entries.iter().filter(|e| e.is_undetermined())
    }
}

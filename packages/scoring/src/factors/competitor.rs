//! Competitor proximity penalty.
//!
//! The raw measurement is the geodesic distance from the centroid to the
//! nearest competitor; normalization maps it through the strategy's
//! [`PenaltyConfig`].

use locate_geography_models::GridCell;
use locate_poi_models::PoiKind;
use locate_scoring_models::{FactorKind, FactorValue, PenaltyConfig};

use super::{FactorCalculator, FactorContext};

/// Penalty for nearby POIs of the competing kinds.
#[derive(Debug, Clone)]
pub struct CompetitorPenalty {
    config: PenaltyConfig,
    kinds: Vec<PoiKind>,
}

impl CompetitorPenalty {
    /// Creates the calculator for the given policy and competitor kinds.
    #[must_use]
    pub const fn new(config: PenaltyConfig, kinds: Vec<PoiKind>) -> Self {
        Self { config, kinds }
    }
}

impl FactorCalculator for CompetitorPenalty {
    fn kind(&self) -> FactorKind {
        FactorKind::CompetitorPenalty
    }

    fn has_data(&self, ctx: &FactorContext<'_>) -> bool {
        ctx.catalogue.has_any(&self.kinds)
    }

    fn compute_for_cell(
        &self,
        _index: usize,
        cell: &GridCell,
        ctx: &FactorContext<'_>,
    ) -> Option<f64> {
        ctx.catalogue
            .nearest(cell.centroid, &self.kinds)
            .map(|hit| hit.distance_km)
    }

    fn normalize(&self, raw: &[Option<f64>]) -> Vec<FactorValue> {
        raw.iter()
            .map(|distance| {
                distance.map_or(FactorValue::Undetermined, |d| {
                    FactorValue::clamped(self.config.penalty(d))
                })
            })
            .collect()
    }
}

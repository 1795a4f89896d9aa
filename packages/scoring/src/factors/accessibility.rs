//! Transit accessibility.
//!
//! Proximity is the sum of inverse distances to the nearest transit POIs,
//! which saturates through `1 - exp(-k * proximity)` so that a dense
//! cluster of stops does not dominate the score.

use locate_geography_models::GridCell;
use locate_poi_models::{PoiCategory, PoiKind};
use locate_scoring_models::{FactorKind, FactorValue};

use super::{AccessibilitySettings, FactorCalculator, FactorContext};

/// Accessibility to transit.
#[derive(Debug, Clone)]
pub struct Accessibility {
    settings: AccessibilitySettings,
    transit_kinds: Vec<PoiKind>,
}

impl Accessibility {
    /// Creates the calculator.
    #[must_use]
    pub fn new(settings: AccessibilitySettings) -> Self {
        Self {
            settings,
            transit_kinds: PoiKind::for_category(PoiCategory::Transit),
        }
    }
}

impl FactorCalculator for Accessibility {
    fn kind(&self) -> FactorKind {
        FactorKind::Accessibility
    }

    fn has_data(&self, ctx: &FactorContext<'_>) -> bool {
        ctx.catalogue.has_any(&self.transit_kinds)
    }

    fn compute_for_cell(
        &self,
        _index: usize,
        cell: &GridCell,
        ctx: &FactorContext<'_>,
    ) -> Option<f64> {
        let hits = ctx.catalogue.nearest_n(
            cell.centroid,
            &self.transit_kinds,
            self.settings.nearest_n,
            self.settings.search_radius_km,
        );
        if hits.is_empty() {
            return None;
        }

        let min_distance = self.settings.min_distance_km.max(f64::EPSILON);
        Some(
            hits.iter()
                .map(|hit| 1.0 / hit.distance_km.max(min_distance))
                .sum(),
        )
    }

    fn normalize(&self, raw: &[Option<f64>]) -> Vec<FactorValue> {
        raw.iter()
            .map(|proximity| {
                proximity.map_or(FactorValue::Undetermined, |p| {
                    FactorValue::clamped(1.0 - (-self.settings.saturation_rate * p).exp())
                })
            })
            .collect()
    }
}

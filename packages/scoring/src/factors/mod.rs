//! Factor calculators.
//!
//! Each calculator produces one raw measurement per cell, then maps the
//! whole column to normalized [`FactorValue`]s in a region-wide pass.
//! Raw measurements are independent per cell and are computed in parallel
//! by the engine.

mod accessibility;
mod competitor;
mod density;

pub use accessibility::Accessibility;
pub use competitor::CompetitorPenalty;
pub use density::{CommercialDensity, PoiDensity, ResidentialScore};

use locate_geography_models::GridCell;
use locate_poi_models::PoiCategory;
use locate_scoring_models::{FactorKind, FactorValue, Strategy};
use locate_spatial::{Grid, PoiCatalogue};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ScoringError;

/// Settings for the transit accessibility factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AccessibilitySettings {
    /// How many of the nearest transit POIs contribute.
    pub nearest_n: usize,
    /// Saturation rate `k` in `1 - exp(-k * proximity)`.
    pub saturation_rate: f64,
    /// Distances below this are clamped up to it.
    pub min_distance_km: f64,
    /// Transit POIs further away than this are ignored.
    pub search_radius_km: f64,
}

impl Default for AccessibilitySettings {
    fn default() -> Self {
        Self {
            nearest_n: 5,
            saturation_rate: 0.5,
            min_distance_km: 0.1,
            search_radius_km: 3.0,
        }
    }
}

/// Settings shared by all factor calculators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct FactorSettings {
    /// When set, POIs are counted within this geodesic radius of each
    /// centroid instead of inside the cell polygon.
    pub buffer_km: Option<f64>,
    /// Transit accessibility settings.
    pub accessibility: AccessibilitySettings,
}

impl FactorSettings {
    /// Checks that every distance and rate is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidSettings`] naming the first bad
    /// setting.
    pub fn validate(&self) -> Result<(), ScoringError> {
        if let Some(buffer_km) = self.buffer_km {
            if !buffer_km.is_finite() || buffer_km <= 0.0 {
                return Err(ScoringError::InvalidSettings(format!(
                    "buffer_km must be positive, got {buffer_km}"
                )));
            }
        }

        let access = &self.accessibility;
        if access.nearest_n == 0 {
            return Err(ScoringError::InvalidSettings(
                "accessibility.nearest_n must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("saturation_rate", access.saturation_rate),
            ("min_distance_km", access.min_distance_km),
            ("search_radius_km", access.search_radius_km),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ScoringError::InvalidSettings(format!(
                    "accessibility.{name} must be positive, got {value}"
                )));
            }
        }

        Ok(())
    }
}

/// POI counts inside one cell's footprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FootprintCounts {
    /// POIs of any kind.
    pub total: usize,
    /// Commercial POIs.
    pub commercial: usize,
    /// Residential POIs.
    pub residential: usize,
}

impl FootprintCounts {
    fn add(&mut self, category: PoiCategory) {
        self.total += 1;
        match category {
            PoiCategory::Commercial => self.commercial += 1,
            PoiCategory::Residential => self.residential += 1,
            PoiCategory::Transit | PoiCategory::Civic | PoiCategory::Other => {}
        }
    }

    /// Whether any POI was seen in the footprint.
    #[must_use]
    pub const fn is_observed(&self) -> bool {
        self.total > 0
    }
}

/// Counts POIs per cell footprint, aligned with [`Grid::cells`].
///
/// Without a buffer each POI is assigned to the single cell covering it
/// (POIs outside the grid are not counted). With a buffer every POI within
/// `buffer_km` of a centroid is counted for that cell, so one POI may
/// contribute to several cells.
#[must_use]
pub fn footprint_counts(
    grid: &Grid,
    catalogue: &PoiCatalogue,
    buffer_km: Option<f64>,
) -> Vec<FootprintCounts> {
    match buffer_km {
        Some(radius) => grid
            .cells()
            .par_iter()
            .map(|cell| {
                let mut counts = FootprintCounts::default();
                for hit in catalogue.within_radius(cell.centroid, radius, None) {
                    counts.add(hit.poi.category());
                }
                counts
            })
            .collect(),
        None => {
            let mut counts = vec![FootprintCounts::default(); grid.len()];
            for poi in catalogue.pois() {
                if let Some(index) = grid.locate(poi.location) {
                    counts[index].add(poi.category());
                }
            }
            counts
        }
    }
}

/// Everything a calculator may read while computing a cell.
#[derive(Debug)]
pub struct FactorContext<'a> {
    /// The grid being scored.
    pub grid: &'a Grid,
    /// Existing POIs.
    pub catalogue: &'a PoiCatalogue,
    /// Factor settings for the run.
    pub settings: &'a FactorSettings,
    footprints: Vec<FootprintCounts>,
}

impl<'a> FactorContext<'a> {
    /// Builds the context and precomputes footprint counts.
    #[must_use]
    pub fn new(grid: &'a Grid, catalogue: &'a PoiCatalogue, settings: &'a FactorSettings) -> Self {
        let footprints = footprint_counts(grid, catalogue, settings.buffer_km);
        Self {
            grid,
            catalogue,
            settings,
            footprints,
        }
    }

    /// Footprint counts for the cell at `index`.
    #[must_use]
    pub fn footprint(&self, index: usize) -> FootprintCounts {
        self.footprints.get(index).copied().unwrap_or_default()
    }
}

/// One scoring factor.
pub trait FactorCalculator: Send + Sync {
    /// Which factor this computes.
    fn kind(&self) -> FactorKind;

    /// Whether the region holds any data for this factor at all. When it
    /// does not, the factor is undetermined for every cell.
    fn has_data(&self, ctx: &FactorContext<'_>) -> bool;

    /// Raw measurement for the cell at `index`, or `None` if the cell
    /// cannot be observed for this factor.
    fn compute_for_cell(&self, index: usize, cell: &GridCell, ctx: &FactorContext<'_>)
    -> Option<f64>;

    /// Maps raw measurements for the whole region to normalized values.
    fn normalize(&self, raw: &[Option<f64>]) -> Vec<FactorValue>;
}

/// The five calculators for `strategy`, in [`FactorKind::ALL`] order.
#[must_use]
pub fn calculators(
    strategy: &Strategy,
    settings: &FactorSettings,
) -> Vec<Box<dyn FactorCalculator>> {
    vec![
        Box::new(PoiDensity),
        Box::new(CommercialDensity),
        Box::new(ResidentialScore),
        Box::new(Accessibility::new(settings.accessibility)),
        Box::new(CompetitorPenalty::new(
            strategy.penalty.clone(),
            strategy.competitor_kinds(),
        )),
    ]
}

/// Divides every observed value by the region maximum.
fn normalize_by_max(raw: &[Option<f64>]) -> Vec<FactorValue> {
    let max = raw.iter().flatten().copied().fold(0.0_f64, f64::max);

    raw.iter()
        .map(|value| match value {
            Some(v) if max > 0.0 => FactorValue::clamped(v / max),
            Some(_) => FactorValue::Value(0.0),
            None => FactorValue::Undetermined,
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::small_grid;
    use super::*;
    use locate_poi_models::{PoiKind, PointOfInterest};

    #[test]
    fn polygon_footprint_counts_each_poi_once() {
        let grid = small_grid();
        let c0 = grid.cells()[0].centroid;
        let catalogue = PoiCatalogue::new(vec![
            PointOfInterest::new("a", PoiKind::Atm, c0),
            PointOfInterest::new("b", PoiKind::Residential, c0),
            PointOfInterest::new("c", PoiKind::TransitStop, c0),
        ]);
        let counts = footprint_counts(&grid, &catalogue, None);
        assert_eq!(
            counts[0],
            FootprintCounts {
                total: 3,
                commercial: 1,
                residential: 1
            }
        );
        assert_eq!(counts.iter().map(|c| c.total).sum::<usize>(), 3);
    }

    #[test]
    fn buffer_footprint_can_reach_neighbours() {
        let grid = small_grid();
        let c0 = grid.cells()[0].centroid;
        let catalogue = PoiCatalogue::new(vec![PointOfInterest::new("a", PoiKind::Atm, c0)]);
        let counts = footprint_counts(&grid, &catalogue, Some(5.0));
        assert!(counts.iter().all(|c| c.total == 1));
    }

    #[test]
    fn normalizes_against_region_maximum() {
        let values = normalize_by_max(&[Some(2.0), Some(4.0), None, Some(0.0)]);
        assert_eq!(
            values,
            vec![
                FactorValue::Value(0.5),
                FactorValue::Value(1.0),
                FactorValue::Undetermined,
                FactorValue::Value(0.0),
            ]
        );
    }

    #[test]
    fn rejects_unusable_buffer() {
        assert!(FactorSettings::default().validate().is_ok());

        for buffer_km in [-1.0, 0.0, f64::NAN, f64::INFINITY] {
            let settings = FactorSettings {
                buffer_km: Some(buffer_km),
                ..FactorSettings::default()
            };
            assert!(
                matches!(settings.validate(), Err(ScoringError::InvalidSettings(_))),
                "accepted {buffer_km}"
            );
        }

        let settings = FactorSettings {
            buffer_km: Some(1.5),
            ..FactorSettings::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn rejects_unusable_accessibility_settings() {
        let mut settings = FactorSettings::default();
        settings.accessibility.nearest_n = 0;
        assert!(matches!(
            settings.validate(),
            Err(ScoringError::InvalidSettings(_))
        ));

        let mut settings = FactorSettings::default();
        settings.accessibility.min_distance_km = -0.1;
        assert!(matches!(
            settings.validate(),
            Err(ScoringError::InvalidSettings(message)) if message.contains("min_distance_km")
        ));
    }
}

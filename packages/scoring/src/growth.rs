//! Growth trend classification.
//!
//! Compares a baseline and a recent density snapshot per cell. Fast growth
//! from a below-median base is flagged as emerging; cells without both
//! snapshots are reported as stable with low confidence rather than being
//! dropped.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use locate_geography_models::CellId;
use locate_scoring_models::growth::{
    Confidence, DensitySnapshot, GrowthCategory, GrowthRecord, GrowthThresholds,
};
use locate_spatial::{Grid, PoiCatalogue};

/// Per-cell density snapshots for a growth pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrowthInputs {
    snapshots: BTreeMap<CellId, DensitySnapshot>,
}

impl GrowthInputs {
    /// Creates inputs from explicit snapshots. Cells without an entry are
    /// treated as having no snapshots.
    #[must_use]
    pub fn new(snapshots: impl IntoIterator<Item = (CellId, DensitySnapshot)>) -> Self {
        Self {
            snapshots: snapshots.into_iter().collect(),
        }
    }

    /// Derives snapshots from POI observation timestamps.
    ///
    /// Each snapshot is the density of POIs present in the cell as of the
    /// given instant: those observed strictly before it, divided by the cell
    /// area. POIs without a timestamp or outside the grid are ignored. If no
    /// POI at all was observed before an instant, that snapshot is missing
    /// for every cell.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_observations(
        grid: &Grid,
        catalogue: &PoiCatalogue,
        baseline_as_of: DateTime<Utc>,
        recent_as_of: DateTime<Utc>,
    ) -> Self {
        let mut baseline = vec![0_usize; grid.len()];
        let mut recent = vec![0_usize; grid.len()];

        for poi in catalogue.pois() {
            let Some(observed_at) = poi.observed_at else {
                continue;
            };
            let Some(index) = grid.locate(poi.location) else {
                continue;
            };
            if observed_at < baseline_as_of {
                baseline[index] += 1;
            }
            if observed_at < recent_as_of {
                recent[index] += 1;
            }
        }

        let has_baseline = baseline.iter().any(|&n| n > 0);
        let has_recent = recent.iter().any(|&n| n > 0);
        if !has_baseline {
            log::warn!("No POIs observed before {baseline_as_of}; growth confidence will be low");
        }
        if !has_recent {
            log::warn!("No POIs observed before {recent_as_of}; growth confidence will be low");
        }

        let snapshots = grid
            .cells()
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let area = cell.area_sq_km().max(f64::EPSILON);
                let snapshot = DensitySnapshot {
                    baseline: has_baseline.then(|| baseline[i] as f64 / area),
                    recent: has_recent.then(|| recent[i] as f64 / area),
                };
                (cell.id, snapshot)
            })
            .collect();

        Self { snapshots }
    }

    /// Snapshot for `cell_id`.
    #[must_use]
    pub fn get(&self, cell_id: CellId) -> DensitySnapshot {
        self.snapshots.get(&cell_id).copied().unwrap_or_default()
    }

    /// Number of cells with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether no cell has an entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Classifies cells into growth categories.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GrowthClassifier {
    thresholds: GrowthThresholds,
}

impl GrowthClassifier {
    /// Creates a classifier with the given thresholds.
    #[must_use]
    pub const fn new(thresholds: GrowthThresholds) -> Self {
        Self { thresholds }
    }

    /// Relative change from `baseline` to `recent`.
    #[must_use]
    pub fn rate(&self, baseline: f64, recent: f64) -> f64 {
        (recent - baseline) / baseline.max(self.thresholds.epsilon)
    }

    /// One record per grid cell, in grid order.
    #[must_use]
    pub fn classify(&self, grid: &Grid, inputs: &GrowthInputs) -> Vec<GrowthRecord> {
        let median = median_recent(grid, inputs);

        let records: Vec<GrowthRecord> = grid
            .cells()
            .iter()
            .map(|cell| self.classify_cell(cell.id, inputs.get(cell.id), median))
            .collect();

        let low = records
            .iter()
            .filter(|r| r.confidence == Confidence::Low)
            .count();
        if low > 0 {
            log::warn!("{low} of {} cells lack density history", records.len());
        }

        records
    }

    fn classify_cell(
        &self,
        cell_id: CellId,
        snapshot: DensitySnapshot,
        median: Option<f64>,
    ) -> GrowthRecord {
        let Some((baseline, recent)) = snapshot.both() else {
            return GrowthRecord {
                cell_id,
                category: GrowthCategory::Stable,
                rate: None,
                confidence: Confidence::Low,
            };
        };

        let rate = self.rate(baseline, recent);
        let category = if rate > self.thresholds.high_growth_rate {
            if median.is_some_and(|m| recent < m) {
                GrowthCategory::Emerging
            } else {
                GrowthCategory::HighGrowth
            }
        } else if rate > self.thresholds.growing_rate {
            GrowthCategory::Growing
        } else {
            GrowthCategory::Stable
        };

        GrowthRecord {
            cell_id,
            category,
            rate: Some(rate),
            confidence: Confidence::High,
        }
    }
}

/// Median recent density over cells that have both snapshots.
fn median_recent(grid: &Grid, inputs: &GrowthInputs) -> Option<f64> {
    let mut recents: Vec<f64> = grid
        .cells()
        .iter()
        .filter_map(|cell| inputs.get(cell.id).both().map(|(_, recent)| recent))
        .collect();
    if recents.is_empty() {
        return None;
    }

    recents.sort_by(f64::total_cmp);
    let mid = recents.len() / 2;
    if recents.len() % 2 == 0 {
        Some(f64::midpoint(recents[mid - 1], recents[mid]))
    } else {
        Some(recents[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use locate_geography_models::BoundingBox;
    use locate_poi_models::{PoiKind, PointOfInterest};

    fn grid() -> Grid {
        Grid::tessellate(&BoundingBox::new(28.600, 77.200, 28.617, 77.219), 1.0).unwrap()
    }

    fn inputs(grid: &Grid, snapshots: &[DensitySnapshot]) -> GrowthInputs {
        GrowthInputs::new(
            grid.cells()
                .iter()
                .zip(snapshots.iter().copied())
                .map(|(cell, s)| (cell.id, s)),
        )
    }

    #[test]
    fn classifies_by_rate_and_median() {
        let grid = grid();
        let inputs = inputs(
            &grid,
            &[
                DensitySnapshot::new(1.0, 2.0),
                DensitySnapshot::new(10.0, 20.0),
                DensitySnapshot::new(10.0, 12.0),
                DensitySnapshot::new(10.0, 10.5),
            ],
        );
        let records = GrowthClassifier::default().classify(&grid, &inputs);
        let categories: Vec<GrowthCategory> = records.iter().map(|r| r.category).collect();

        assert_eq!(
            categories,
            vec![
                GrowthCategory::Emerging,
                GrowthCategory::HighGrowth,
                GrowthCategory::Growing,
                GrowthCategory::Stable,
            ]
        );
        assert!(records.iter().all(|r| r.confidence == Confidence::High));
    }

    #[test]
    fn missing_snapshots_are_stable_with_low_confidence() {
        let grid = grid();
        let inputs = GrowthInputs::new([(
            grid.cells()[0].id,
            DensitySnapshot {
                baseline: None,
                recent: Some(50.0),
            },
        )]);
        let records = GrowthClassifier::default().classify(&grid, &inputs);

        assert_eq!(records.len(), grid.len());
        for record in &records {
            assert_eq!(record.category, GrowthCategory::Stable);
            assert_eq!(record.confidence, Confidence::Low);
            assert_eq!(record.rate, None);
        }
    }

    #[test]
    fn zero_baseline_uses_epsilon() {
        let classifier = GrowthClassifier::default();
        assert!(classifier.rate(0.0, 1.0) > 1e6);
        assert!(classifier.rate(0.0, 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn classification_is_idempotent() {
        let grid = grid();
        let inputs = inputs(
            &grid,
            &[
                DensitySnapshot::new(3.0, 9.0),
                DensitySnapshot::new(5.0, 5.0),
                DensitySnapshot::default(),
                DensitySnapshot::new(2.0, 2.4),
            ],
        );
        let classifier = GrowthClassifier::default();
        assert_eq!(
            classifier.classify(&grid, &inputs),
            classifier.classify(&grid, &inputs)
        );
    }

    #[test]
    fn snapshots_count_pois_present_at_each_instant() {
        let grid = grid();
        let c0 = grid.cells()[0].centroid;
        let c1 = grid.cells()[1].centroid;
        let at = |year: i32| Utc.with_ymd_and_hms(year, 6, 1, 0, 0, 0).unwrap();
        let catalogue = PoiCatalogue::new(vec![
            PointOfInterest::new("a", PoiKind::Atm, c0).observed(at(2020)),
            PointOfInterest::new("b", PoiKind::Atm, c0).observed(at(2023)),
            PointOfInterest::new("c", PoiKind::Atm, c0).observed(at(2023)),
            PointOfInterest::new("d", PoiKind::Atm, c1).observed(at(2023)),
            PointOfInterest::new("e", PoiKind::Atm, c1),
            PointOfInterest::new("f", PoiKind::Atm, c1).observed(at(2025)),
        ]);

        let inputs = GrowthInputs::from_observations(&grid, &catalogue, at(2021), at(2024));
        let area = grid.cells()[0].area_sq_km();

        let s0 = inputs.get(grid.cells()[0].id);
        assert!((s0.baseline.unwrap() - 1.0 / area).abs() < 1e-9);
        assert!((s0.recent.unwrap() - 3.0 / area).abs() < 1e-9);

        let s1 = inputs.get(grid.cells()[1].id);
        assert_eq!(s1.baseline, Some(0.0));
        assert!((s1.recent.unwrap() - 1.0 / area).abs() < 1e-9);
    }

    #[test]
    fn established_cell_that_keeps_growing_is_high_growth() {
        let grid = grid();
        let c0 = grid.cells()[0].centroid;
        let at = |year: i32| Utc.with_ymd_and_hms(year, 6, 1, 0, 0, 0).unwrap();
        let catalogue = PoiCatalogue::new(
            (0..16)
                .map(|i| {
                    let year = if i < 10 { 2020 } else { 2023 };
                    PointOfInterest::new(format!("poi-{i}"), PoiKind::Commercial, c0)
                        .observed(at(year))
                })
                .collect(),
        );

        let inputs = GrowthInputs::from_observations(&grid, &catalogue, at(2021), at(2024));
        let area = grid.cells()[0].area_sq_km();
        let snapshot = inputs.get(grid.cells()[0].id);
        assert!((snapshot.baseline.unwrap() - 10.0 / area).abs() < 1e-9);
        assert!((snapshot.recent.unwrap() - 16.0 / area).abs() < 1e-9);

        let records = GrowthClassifier::default().classify(&grid, &inputs);
        let record = &records[0];
        assert_eq!(record.category, GrowthCategory::HighGrowth);
        assert!((record.rate.unwrap() - 0.6).abs() < 1e-9);
        assert_eq!(record.confidence, Confidence::High);
    }

    #[test]
    fn instant_before_any_observation_leaves_snapshots_missing() {
        let grid = grid();
        let at = |year: i32| Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
        let catalogue = PoiCatalogue::new(vec![
            PointOfInterest::new("a", PoiKind::Atm, grid.cells()[0].centroid).observed(at(2023)),
        ]);
        let inputs = GrowthInputs::from_observations(&grid, &catalogue, at(2011), at(2024));
        assert!(inputs.get(grid.cells()[0].id).baseline.is_none());
        assert!(inputs.get(grid.cells()[0].id).recent.is_some());
    }
}

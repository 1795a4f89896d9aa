//! Point-level what-if analysis.
//!
//! These functions answer questions about a single candidate location
//! rather than the whole grid: how busy the surroundings are, how many
//! competitors are close, and roughly how many people live within reach.

use std::collections::BTreeMap;

use locate_geography_models::Coordinates;
use locate_poi_models::PoiKind;
use locate_scoring_models::analysis::{
    CatchmentMetrics, CompetitorOverlap, Intensity, LocationAnalysis, NearbyPoi, Verdict,
};
use locate_spatial::{Grid, PoiCatalogue, PoiHit, geodesic_km};

use crate::ScoringError;
use crate::factors::footprint_counts;
use crate::strategy::StrategyRegistry;

/// Residents per square kilometre assumed for an urban catchment.
const BASE_POPULATION_PER_SQ_KM: f64 = 5000.0;

/// Maximum number of competitors listed in an overlap report.
const MAX_LISTED_COMPETITORS: usize = 10;

fn nearby_poi(hit: PoiHit<'_>) -> NearbyPoi {
    NearbyPoi {
        id: hit.poi.id.clone(),
        kind: hit.poi.kind,
        name: hit.poi.name.clone(),
        location: hit.poi.location,
        distance_km: hit.distance_km,
    }
}

/// Evaluates placing a new `poi_type` at `point`.
///
/// # Errors
///
/// Returns [`ScoringError::UnknownPoiType`] if `poi_type` has no
/// strategy in `registry`.
#[allow(clippy::cast_precision_loss)]
pub fn analyze_location(
    point: Coordinates,
    poi_type: PoiKind,
    grid: &Grid,
    catalogue: &PoiCatalogue,
    registry: &StrategyRegistry,
) -> Result<LocationAnalysis, ScoringError> {
    let strategy = registry.select(poi_type)?;
    let kinds = strategy.competitor_kinds();

    let outside_grid = grid.locate(point).is_none();
    let cell_id = grid.cells()[grid.locate_or_nearest(point)].id;

    let competitors_2km = catalogue.within_radius(point, 2.0, Some(&kinds));
    let competitors_1km = competitors_2km
        .iter()
        .filter(|hit| hit.distance_km <= 1.0)
        .count();
    let nearest_competitor = catalogue.nearest(point, &kinds).map(nearby_poi);

    let nearby = catalogue.within_radius(point, 1.0, None);
    let pois_1km = nearby.len();
    let pois_500m = nearby.iter().filter(|hit| hit.distance_km <= 0.5).count();

    let activity_level = if pois_1km > 30 {
        Intensity::High
    } else if pois_1km > 15 {
        Intensity::Medium
    } else {
        Intensity::Low
    };

    let activity_score = (pois_1km as f64 / 50.0).min(1.0);
    let competition_penalty = (0.2 * competitors_1km as f64).min(1.0);
    let opportunity_score = (activity_score - competition_penalty + 0.5).clamp(0.0, 1.0);

    let verdict = if opportunity_score >= 0.7 {
        Verdict::Excellent
    } else if opportunity_score >= 0.5 {
        Verdict::Good
    } else if opportunity_score >= 0.3 {
        Verdict::Moderate
    } else {
        Verdict::Poor
    };

    log::debug!(
        "Analyzed {poi_type} at ({}, {}): {pois_1km} POIs and {competitors_1km} competitors within 1 km",
        point.lat,
        point.lng
    );

    Ok(LocationAnalysis {
        location: point,
        poi_type,
        cell_id,
        outside_grid,
        competitors_1km,
        competitors_2km: competitors_2km.len(),
        nearest_competitor_m: nearest_competitor.as_ref().map(|c| c.distance_km * 1000.0),
        nearest_competitor,
        pois_500m,
        pois_1km,
        activity_level,
        activity_score,
        competition_penalty,
        opportunity_score,
        verdict,
    })
}

/// Summarizes the catchment of radius `radius_km` around `point`.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn catchment_metrics(
    point: Coordinates,
    radius_km: f64,
    catalogue: &PoiCatalogue,
    grid: &Grid,
) -> CatchmentMetrics {
    let hits = catalogue.within_radius(point, radius_km, None);
    let mut by_kind: BTreeMap<PoiKind, usize> = BTreeMap::new();
    for hit in &hits {
        *by_kind.entry(hit.poi.kind).or_default() += 1;
    }

    let counts = footprint_counts(grid, catalogue, None);
    let inside: Vec<usize> = grid
        .cells()
        .iter()
        .enumerate()
        .filter(|(_, cell)| geodesic_km(point, cell.centroid) <= radius_km)
        .map(|(index, _)| index)
        .collect();

    let mean_count = if inside.is_empty() {
        0.0
    } else {
        inside.iter().map(|&i| counts[i].total as f64).sum::<f64>() / inside.len() as f64
    };

    let area_sq_km = std::f64::consts::PI * radius_km * radius_km;
    let estimated_population =
        (area_sq_km * BASE_POPULATION_PER_SQ_KM * (mean_count / 100.0 + 0.5)).max(0.0) as u64;

    CatchmentMetrics {
        center: point,
        radius_km,
        area_sq_km,
        total_pois: hits.len(),
        by_kind,
        cells: inside.iter().map(|&i| grid.cells()[i].id).collect(),
        estimated_population,
    }
}

/// Lists competitors of `kinds` within `radius_km` of `point`.
#[must_use]
pub fn competitor_overlap(
    point: Coordinates,
    radius_km: f64,
    catalogue: &PoiCatalogue,
    kinds: &[PoiKind],
) -> CompetitorOverlap {
    let hits = catalogue.within_radius(point, radius_km, Some(kinds));
    let competitor_count = hits.len();

    let level = if competitor_count > 5 {
        Intensity::High
    } else if competitor_count > 2 {
        Intensity::Medium
    } else {
        Intensity::Low
    };

    let competitors: Vec<NearbyPoi> = hits
        .into_iter()
        .take(MAX_LISTED_COMPETITORS)
        .map(nearby_poi)
        .collect();

    CompetitorOverlap {
        radius_km,
        competitor_count,
        nearest: competitors.first().cloned(),
        competitors,
        level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::test_support::{offset_north, small_grid};
    use locate_poi_models::PointOfInterest;

    fn busy_catalogue(center: Coordinates, shops: usize, atms: &[f64]) -> PoiCatalogue {
        let mut pois: Vec<PointOfInterest> = (0..shops)
            .map(|i| PointOfInterest::new(format!("shop-{i}"), PoiKind::Commercial, center))
            .collect();
        for (i, km) in atms.iter().enumerate() {
            pois.push(PointOfInterest::new(
                format!("atm-{i}"),
                PoiKind::Atm,
                offset_north(center, *km),
            ));
        }
        PoiCatalogue::new(pois)
    }

    #[test]
    fn busy_uncontested_point_is_excellent() {
        let grid = small_grid();
        let point = grid.cells()[0].centroid;
        let catalogue = busy_catalogue(point, 40, &[1.5]);
        let analysis = analyze_location(
            point,
            PoiKind::Atm,
            &grid,
            &catalogue,
            &StrategyRegistry::builtin(),
        )
        .unwrap();

        assert_eq!(analysis.cell_id, grid.cells()[0].id);
        assert!(!analysis.outside_grid);
        assert_eq!(analysis.pois_1km, 40);
        assert_eq!(analysis.pois_500m, 40);
        assert_eq!(analysis.activity_level, Intensity::High);
        assert_eq!(analysis.competitors_1km, 0);
        assert_eq!(analysis.competitors_2km, 1);
        let metres = analysis.nearest_competitor_m.unwrap();
        assert!((metres - 1500.0).abs() < 15.0, "got {metres}");
        let nearest = analysis.nearest_competitor.as_ref().unwrap();
        assert_eq!(nearest.id, "atm-0");
        assert_eq!(nearest.kind, PoiKind::Atm);
        assert!((nearest.distance_km * 1000.0 - metres).abs() < 1e-9);
        assert!((analysis.opportunity_score - 1.0).abs() < 1e-12);
        assert_eq!(analysis.verdict, Verdict::Excellent);
    }

    #[test]
    fn crowded_quiet_point_is_poor() {
        let grid = small_grid();
        let point = grid.cells()[0].centroid;
        let catalogue = busy_catalogue(point, 0, &[0.1, 0.2, 0.3, 0.4]);
        let analysis = analyze_location(
            point,
            PoiKind::Atm,
            &grid,
            &catalogue,
            &StrategyRegistry::builtin(),
        )
        .unwrap();

        assert_eq!(analysis.competitors_1km, 4);
        assert_eq!(analysis.activity_level, Intensity::Low);
        assert!(analysis.opportunity_score.abs() < 1e-12);
        assert_eq!(analysis.verdict, Verdict::Poor);
    }

    #[test]
    fn point_outside_grid_maps_to_nearest_cell() {
        let grid = small_grid();
        let far = Coordinates::new(28.0, 77.0);
        let catalogue = PoiCatalogue::new(vec![]);
        let analysis = analyze_location(
            far,
            PoiKind::Hospital,
            &grid,
            &catalogue,
            &StrategyRegistry::builtin(),
        )
        .unwrap();
        assert!(analysis.outside_grid);
        assert_eq!(analysis.cell_id, grid.cells()[0].id);
        assert!(analysis.nearest_competitor.is_none());
    }

    #[test]
    fn catchment_counts_kinds_and_cells() {
        let grid = small_grid();
        let point = grid.cells()[0].centroid;
        let catalogue = busy_catalogue(point, 3, &[0.5, 20.0]);
        let metrics = catchment_metrics(point, 2.0, &catalogue, &grid);

        assert_eq!(metrics.total_pois, 4);
        assert_eq!(metrics.by_kind.get(&PoiKind::Commercial), Some(&3));
        assert_eq!(metrics.by_kind.get(&PoiKind::Atm), Some(&1));
        assert_eq!(metrics.cells.len(), grid.len());
        assert!((metrics.area_sq_km - std::f64::consts::PI * 4.0).abs() < 1e-9);
        // 4 POIs in-grid over 4 cells: mean 1, factor 0.51.
        let expected = (metrics.area_sq_km * 5000.0 * 0.51) as u64;
        assert_eq!(metrics.estimated_population, expected);
    }

    #[test]
    fn overlap_lists_at_most_ten_sorted() {
        let center = Coordinates::new(28.6, 77.2);
        let distances: Vec<f64> = (1..=12).map(|i| f64::from(i) * 0.1).collect();
        let catalogue = busy_catalogue(center, 2, &distances);
        let overlap = competitor_overlap(center, 2.0, &catalogue, &[PoiKind::Atm]);

        assert_eq!(overlap.competitor_count, 12);
        assert_eq!(overlap.competitors.len(), 10);
        assert_eq!(overlap.level, Intensity::High);
        assert_eq!(overlap.nearest.as_ref().map(|c| c.id.as_str()), Some("atm-0"));
        assert!(
            overlap
                .competitors
                .windows(2)
                .all(|w| w[0].distance_km <= w[1].distance_km)
        );

        let sparse = competitor_overlap(center, 0.25, &catalogue, &[PoiKind::Atm]);
        assert_eq!(sparse.competitor_count, 2);
        assert_eq!(sparse.level, Intensity::Low);
    }
}

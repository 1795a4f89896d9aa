//! Count-based factors: POI density, commercial density and the
//! residential population proxy.

use locate_geography_models::GridCell;
use locate_poi_models::PoiCategory;
use locate_scoring_models::{FactorKind, FactorValue};

use super::{FactorCalculator, FactorContext, normalize_by_max};

/// Count of all POIs in the footprint.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoiDensity;

/// Count of commercial POIs in the footprint.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommercialDensity;

/// Count of residential POIs in the footprint.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResidentialScore;

#[allow(clippy::cast_precision_loss)]
impl FactorCalculator for PoiDensity {
    fn kind(&self) -> FactorKind {
        FactorKind::PoiDensity
    }

    fn has_data(&self, ctx: &FactorContext<'_>) -> bool {
        !ctx.catalogue.is_empty()
    }

    fn compute_for_cell(
        &self,
        index: usize,
        _cell: &GridCell,
        ctx: &FactorContext<'_>,
    ) -> Option<f64> {
        let counts = ctx.footprint(index);
        counts.is_observed().then_some(counts.total as f64)
    }

    fn normalize(&self, raw: &[Option<f64>]) -> Vec<FactorValue> {
        normalize_by_max(raw)
    }
}

#[allow(clippy::cast_precision_loss)]
impl FactorCalculator for CommercialDensity {
    fn kind(&self) -> FactorKind {
        FactorKind::CommercialDensity
    }

    fn has_data(&self, ctx: &FactorContext<'_>) -> bool {
        ctx.catalogue.has_category(PoiCategory::Commercial)
    }

    fn compute_for_cell(
        &self,
        index: usize,
        _cell: &GridCell,
        ctx: &FactorContext<'_>,
    ) -> Option<f64> {
        let counts = ctx.footprint(index);
        counts.is_observed().then_some(counts.commercial as f64)
    }

    fn normalize(&self, raw: &[Option<f64>]) -> Vec<FactorValue> {
        normalize_by_max(raw)
    }
}

#[allow(clippy::cast_precision_loss)]
impl FactorCalculator for ResidentialScore {
    fn kind(&self) -> FactorKind {
        FactorKind::Residential
    }

    fn has_data(&self, ctx: &FactorContext<'_>) -> bool {
        ctx.catalogue.has_category(PoiCategory::Residential)
    }

    fn compute_for_cell(
        &self,
        index: usize,
        _cell: &GridCell,
        ctx: &FactorContext<'_>,
    ) -> Option<f64> {
        let counts = ctx.footprint(index);
        counts.is_observed().then_some(counts.residential as f64)
    }

    fn normalize(&self, raw: &[Option<f64>]) -> Vec<FactorValue> {
        normalize_by_max(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::FactorSettings;
    use crate::factors::test_support::small_grid;
    use locate_poi_models::{PoiKind, PointOfInterest};
    use locate_spatial::PoiCatalogue;

    fn column(calc: &dyn FactorCalculator, ctx: &FactorContext<'_>) -> Vec<FactorValue> {
        let raw: Vec<Option<f64>> = ctx
            .grid
            .cells()
            .iter()
            .enumerate()
            .map(|(i, cell)| calc.compute_for_cell(i, cell, ctx))
            .collect();
        calc.normalize(&raw)
    }

    #[test]
    fn unobserved_cells_are_undetermined_not_zero() {
        let grid = small_grid();
        let c0 = grid.cells()[0].centroid;
        let c1 = grid.cells()[1].centroid;
        let catalogue = PoiCatalogue::new(vec![
            PointOfInterest::new("a", PoiKind::Atm, c0),
            PointOfInterest::new("b", PoiKind::Bank, c0),
            PointOfInterest::new("h", PoiKind::Hospital, c1),
        ]);
        let settings = FactorSettings::default();
        let ctx = FactorContext::new(&grid, &catalogue, &settings);

        let density = column(&PoiDensity, &ctx);
        assert_eq!(density[0], FactorValue::Value(1.0));
        assert_eq!(density[1], FactorValue::Value(0.5));
        assert_eq!(density[2], FactorValue::Undetermined);
        assert_eq!(density[3], FactorValue::Undetermined);

        let commercial = column(&CommercialDensity, &ctx);
        assert_eq!(commercial[0], FactorValue::Value(1.0));
        assert_eq!(commercial[1], FactorValue::Value(0.0));
        assert_eq!(commercial[2], FactorValue::Undetermined);
    }

    #[test]
    fn has_data_tracks_categories() {
        let grid = small_grid();
        let catalogue = PoiCatalogue::new(vec![PointOfInterest::new(
            "a",
            PoiKind::Atm,
            grid.cells()[0].centroid,
        )]);
        let settings = FactorSettings::default();
        let ctx = FactorContext::new(&grid, &catalogue, &settings);
        assert!(PoiDensity.has_data(&ctx));
        assert!(CommercialDensity.has_data(&ctx));
        assert!(!ResidentialScore.has_data(&ctx));
    }
}

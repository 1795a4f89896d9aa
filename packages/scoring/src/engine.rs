//! The scoring engine.
//!
//! A run computes the five factor columns over the grid, combines them per
//! cell with the target type's strategy, and sorts the result. Per-cell
//! work runs on the rayon global pool; the engine holds no state between
//! runs beyond its immutable [`ScoringConfig`].

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use locate_geography_models::GridCell;
use locate_poi_models::{PoiKind, PointOfInterest};
use locate_scoring_models::growth::{GrowthRecord, GrowthThresholds};
use locate_scoring_models::{
    CompositeScore, FactorKind, FactorValue, FactorValues, ScoreTable, Strategy,
};
use locate_spatial::{Grid, PoiCatalogue};
use rayon::prelude::*;
use serde::Serialize;

use crate::factors::{self, FactorContext, FactorSettings};
use crate::growth::{GrowthClassifier, GrowthInputs};
use crate::strategy::StrategyRegistry;
use crate::ScoringError;

/// Everything that parameterizes a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringConfig {
    /// Strategies per POI type.
    pub registry: StrategyRegistry,
    /// Factor settings.
    pub factors: FactorSettings,
    /// Growth thresholds.
    pub growth: GrowthThresholds,
}

/// Output of one engine run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRun {
    /// Every grid cell, best first.
    pub ranked: ScoreTable,
    /// Growth records in grid order, when growth inputs were supplied.
    pub growth: Option<Vec<GrowthRecord>>,
}

/// Scores grid cells for a target POI type.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    /// Creates an engine with the given configuration.
    #[must_use]
    pub const fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// The engine's configuration.
    #[must_use]
    pub const fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Scores every cell of `grid` for `poi_type` and optionally
    /// classifies growth.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::UnknownPoiType`] if no strategy is
    /// registered for `poi_type`.
    pub fn run(
        &self,
        poi_type: PoiKind,
        grid: &Grid,
        catalogue: &PoiCatalogue,
        growth: Option<&GrowthInputs>,
    ) -> Result<ScoringRun, ScoringError> {
        self.run_cancellable(poi_type, grid, catalogue, growth, &AtomicBool::new(false))
    }

    /// Like [`Self::run`], but aborts once `cancel` is set.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Cancelled`] if `cancel` was observed set,
    /// and [`ScoringError::UnknownPoiType`] if no strategy is registered
    /// for `poi_type`.
    pub fn run_cancellable(
        &self,
        poi_type: PoiKind,
        grid: &Grid,
        catalogue: &PoiCatalogue,
        growth: Option<&GrowthInputs>,
        cancel: &AtomicBool,
    ) -> Result<ScoringRun, ScoringError> {
        let strategy = self.config.registry.select(poi_type)?;
        let ranked = self.score(strategy, grid, catalogue, cancel)?;

        let growth = growth.map(|inputs| {
            GrowthClassifier::new(self.config.growth).classify(grid, inputs)
        });

        Ok(ScoringRun { ranked, growth })
    }

    /// Validates raw cells into a grid, indexes the POIs, then runs.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidGridConfiguration`] if the cells do
    /// not form a valid grid, plus anything [`Self::run`] returns.
    pub fn run_cells(
        &self,
        poi_type: PoiKind,
        cells: Vec<GridCell>,
        pois: Vec<PointOfInterest>,
        growth: Option<&GrowthInputs>,
    ) -> Result<ScoringRun, ScoringError> {
        let grid = Grid::new(cells)?;
        let catalogue = PoiCatalogue::new(pois);
        self.run(poi_type, &grid, &catalogue, growth)
    }

    /// Scores every cell with an explicit strategy, bypassing the
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidSettings`] if the factor settings
    /// are out of range and [`ScoringError::Cancelled`] if `cancel` was
    /// observed set.
    pub fn score(
        &self,
        strategy: &Strategy,
        grid: &Grid,
        catalogue: &PoiCatalogue,
        cancel: &AtomicBool,
    ) -> Result<ScoreTable, ScoringError> {
        self.config.factors.validate()?;
        check_cancelled(cancel)?;

        let n = grid.len();
        let ctx = FactorContext::new(grid, catalogue, &self.config.factors);

        let mut values = vec![FactorValues::default(); n];
        let mut nearest_competitor: Vec<Option<f64>> = vec![None; n];
        let mut excluded_factors = Vec::new();

        for calculator in factors::calculators(strategy, &self.config.factors) {
            let kind = calculator.kind();

            if !calculator.has_data(&ctx) {
                log::warn!(
                    "Insufficient data for {kind}: no matching POIs in region, \
                     undetermined for all {n} cells"
                );
                excluded_factors.push(kind);
                continue;
            }

            let raw: Vec<Option<f64>> = grid
                .cells()
                .par_iter()
                .enumerate()
                .map(|(index, cell)| {
                    check_cancelled(cancel)?;
                    Ok(calculator.compute_for_cell(index, cell, &ctx))
                })
                .collect::<Result<_, ScoringError>>()?;

            let normalized = calculator.normalize(&raw);
            let determined = normalized.iter().filter(|v| v.is_determined()).count();
            log::debug!("{kind}: determined for {determined} of {n} cells");

            for (cell_values, value) in values.iter_mut().zip(normalized) {
                cell_values.set(kind, value);
            }
            if kind == FactorKind::CompetitorPenalty {
                nearest_competitor = raw;
            }
        }

        check_cancelled(cancel)?;

        let mut entries: Vec<CompositeScore> = grid
            .cells()
            .par_iter()
            .zip(values.par_iter())
            .zip(nearest_competitor.par_iter())
            .map(|((cell, factors), nearest)| composite(cell, strategy, *factors, *nearest))
            .collect();

        entries.sort_by(rank_order);
        for (position, entry) in entries.iter_mut().enumerate() {
            entry.rank = position + 1;
        }

        let undetermined = entries.iter().filter(|e| e.is_undetermined()).count();
        let disqualified = entries.iter().filter(|e| e.disqualified).count();
        log::info!(
            "Scored {n} cells for {}: {} scored, {undetermined} undetermined, \
             {disqualified} disqualified",
            strategy.poi_type,
            n - undetermined,
        );

        Ok(ScoreTable {
            poi_type: strategy.poi_type,
            excluded_factors,
            entries,
        })
    }
}

fn check_cancelled(cancel: &AtomicBool) -> Result<(), ScoringError> {
    if cancel.load(AtomicOrdering::Relaxed) {
        Err(ScoringError::Cancelled)
    } else {
        Ok(())
    }
}

/// Combines one cell's factors into its composite score.
///
/// Weights are renormalized over the factors determined for this cell. The
/// composite is the weighted sum of the additive factors minus the weighted
/// competitor penalty. A competitor inside the saturation radius
/// disqualifies the cell outright.
fn composite(
    cell: &GridCell,
    strategy: &Strategy,
    factors: FactorValues,
    nearest_competitor_km: Option<f64>,
) -> CompositeScore {
    let effective_weights = strategy
        .weights
        .renormalized(|kind| factors.get(kind).is_determined());
    let disqualified = nearest_competitor_km.is_some_and(|d| strategy.penalty.is_saturated(d));

    let score = if effective_weights.positive_sum() > 0.0 {
        if disqualified {
            FactorValue::Value(0.0)
        } else {
            let additive: f64 = FactorKind::ALL
                .iter()
                .filter(|kind| kind.is_positive())
                .filter_map(|&kind| {
                    factors
                        .get(kind)
                        .value()
                        .map(|v| effective_weights.get(kind) * v)
                })
                .sum();
            let penalty = factors
                .competitor_penalty
                .value()
                .map_or(0.0, |p| effective_weights.competitor * p);
            FactorValue::clamped(additive - penalty)
        }
    } else {
        FactorValue::Undetermined
    };

    CompositeScore {
        cell_id: cell.id,
        centroid: cell.centroid,
        poi_type: strategy.poi_type,
        score,
        rank: 0,
        factors,
        effective_weights,
        disqualified,
        nearest_competitor_km,
    }
}

/// Scored cells by descending composite, then undetermined cells; ties and
/// undetermined cells by ascending cell id.
fn rank_order(a: &CompositeScore, b: &CompositeScore) -> Ordering {
    match (a.score.value(), b.score.value()) {
        (Some(x), Some(y)) => y.total_cmp(&x).then_with(|| a.cell_id.cmp(&b.cell_id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cell_id.cmp(&b.cell_id),
    }
}

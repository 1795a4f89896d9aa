//! Subcommand implementations.

use std::path::Path;

use chrono::{DateTime, Utc};
use locate_geography_models::{BoundingBox, Coordinates, GridCell};
use locate_poi_models::{PoiKind, PointOfInterest};
use locate_scoring::analysis::{analyze_location, catchment_metrics, competitor_overlap};
use locate_scoring::{
    FactorSettings, GrowthClassifier, GrowthInputs, ScoringConfig, ScoringEngine, ScoringError,
    StrategyRegistry, explain,
};
use locate_scoring_models::analysis::{
    CatchmentMetrics, CompetitorOverlap, LocationAnalysis, ScoreExplanation,
};
use locate_scoring_models::growth::GrowthThresholds;
use locate_scoring_models::CompositeScore;
use locate_spatial::{Grid, PoiCatalogue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Optional settings document.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    factors: FactorSettings,
    growth: GrowthThresholds,
}

/// A recommended cell with its explanation.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Pick<'a> {
    score: &'a CompositeScore,
    explanation: ScoreExplanation,
}

/// Everything known about a candidate point.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PointReport {
    analysis: LocationAnalysis,
    catchment: CatchmentMetrics,
    competitors: CompetitorOverlap,
}

/// Builds the engine configuration from the optional strategy and
/// settings documents.
pub fn load_config(strategies: Option<&Path>, settings: Option<&Path>) -> CliResult<ScoringConfig> {
    let registry = match strategies {
        Some(path) => {
            log::info!("Loading strategies from {}", path.display());
            StrategyRegistry::from_toml(&std::fs::read_to_string(path)?)?
        }
        None => StrategyRegistry::builtin(),
    };

    let settings: Settings = match settings {
        Some(path) => toml::de::from_str(&std::fs::read_to_string(path)?)?,
        None => Settings::default(),
    };

    Ok(ScoringConfig {
        registry,
        factors: settings.factors,
        growth: settings.growth,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

fn load_grid(path: &Path) -> CliResult<Grid> {
    let cells: Vec<GridCell> = read_json(path)?;
    Ok(Grid::new(cells).map_err(ScoringError::from)?)
}

fn load_catalogue(path: &Path) -> CliResult<PoiCatalogue> {
    let pois: Vec<PointOfInterest> = read_json(path)?;
    Ok(PoiCatalogue::new(pois))
}

fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Scores every cell and prints the ranked table, or the top picks.
pub fn score(
    mut config: ScoringConfig,
    grid: &Path,
    pois: &Path,
    poi_type: PoiKind,
    buffer_km: Option<f64>,
    top: Option<usize>,
) -> CliResult {
    if buffer_km.is_some() {
        config.factors.buffer_km = buffer_km;
    }
    config.factors.validate()?;

    let grid = load_grid(grid)?;
    let catalogue = load_catalogue(pois)?;
    let run = ScoringEngine::new(config).run(poi_type, &grid, &catalogue, None)?;

    match top {
        Some(n) => {
            let picks: Vec<Pick<'_>> = run
                .ranked
                .top(n)
                .into_iter()
                .map(|score| Pick {
                    score,
                    explanation: explain(score),
                })
                .collect();
            print_json(&picks)
        }
        None => print_json(&run),
    }
}

/// Classifies growth from observation timestamps.
pub fn growth(
    config: &ScoringConfig,
    grid: &Path,
    pois: &Path,
    baseline_as_of: DateTime<Utc>,
    recent_as_of: DateTime<Utc>,
) -> CliResult {
    if baseline_as_of >= recent_as_of {
        return Err("the recent instant must come after the baseline instant".into());
    }

    let grid = load_grid(grid)?;
    let catalogue = load_catalogue(pois)?;
    let inputs = GrowthInputs::from_observations(&grid, &catalogue, baseline_as_of, recent_as_of);
    let records = GrowthClassifier::new(config.growth).classify(&grid, &inputs);

    print_json(&records)
}

/// Analyzes a single candidate point.
pub fn analyze(
    config: &ScoringConfig,
    grid: &Path,
    pois: &Path,
    lat: f64,
    lng: f64,
    poi_type: PoiKind,
    radius_km: f64,
) -> CliResult {
    let point = Coordinates::new(lat, lng);
    if !point.is_valid() {
        return Err(format!("invalid coordinates ({lat}, {lng})").into());
    }
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(format!("radius must be positive, got {radius_km}").into());
    }

    let grid = load_grid(grid)?;
    let catalogue = load_catalogue(pois)?;
    let kinds = config.registry.select(poi_type)?.competitor_kinds();

    let report = PointReport {
        analysis: analyze_location(point, poi_type, &grid, &catalogue, &config.registry)?,
        catchment: catchment_metrics(point, radius_km, &catalogue, &grid),
        competitors: competitor_overlap(point, radius_km, &catalogue, &kinds),
    };

    print_json(&report)
}

/// Prints a square grid over a bounding box.
pub fn tessellate(
    min_lat: f64,
    min_lng: f64,
    max_lat: f64,
    max_lng: f64,
    edge_km: f64,
) -> CliResult {
    let bounds = BoundingBox::new(min_lat, min_lng, max_lat, max_lng);
    let grid = Grid::tessellate(&bounds, edge_km).map_err(ScoringError::from)?;
    print_json(&grid.cells())
}

/// Prints the registered strategies.
pub fn strategies(config: &ScoringConfig) -> CliResult {
    let strategies: Vec<_> = config.registry.strategies().collect();
    print_json(&strategies)
}

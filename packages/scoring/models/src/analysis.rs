//! Point analysis and score explanation records.

use std::collections::BTreeMap;

use locate_geography_models::{CellId, Coordinates};
use locate_poi_models::PoiKind;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Coarse three-step level used for activity and competition.
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
pub enum Intensity {
    /// Little activity or competition.
    Low,
    /// Some activity or competition.
    Medium,
    /// Heavy activity or competition.
    High,
}

/// Overall verdict for a candidate point.
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
pub enum Verdict {
    /// Opportunity score of 0.7 or more.
    Excellent,
    /// Opportunity score of 0.5 or more.
    Good,
    /// Opportunity score of 0.3 or more.
    Moderate,
    /// Anything lower.
    Poor,
}

/// A POI near a query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyPoi {
    /// Source identifier.
    pub id: String,
    /// Type tag.
    pub kind: PoiKind,
    /// Display name, if known.
    pub name: Option<String>,
    /// POI location.
    pub location: Coordinates,
    /// Geodesic distance from the query point in kilometres.
    pub distance_km: f64,
}

/// What-if analysis of placing a new POI at a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationAnalysis {
    /// Query point.
    pub location: Coordinates,
    /// Target POI type.
    pub poi_type: PoiKind,
    /// Cell covering the point, or the nearest cell if the point is
    /// outside the grid.
    pub cell_id: CellId,
    /// Whether the point lies outside every cell.
    pub outside_grid: bool,
    /// Competitors within 1 km.
    pub competitors_1km: usize,
    /// Competitors within 2 km.
    pub competitors_2km: usize,
    /// Closest competitor, if any exists.
    pub nearest_competitor: Option<NearbyPoi>,
    /// Distance to the closest competitor in metres.
    pub nearest_competitor_m: Option<f64>,
    /// POIs of any kind within 500 m.
    pub pois_500m: usize,
    /// POIs of any kind within 1 km.
    pub pois_1km: usize,
    /// Activity level from `pois_1km`.
    pub activity_level: Intensity,
    /// Activity in `[0, 1]`.
    pub activity_score: f64,
    /// Competition in `[0, 1]`.
    pub competition_penalty: f64,
    /// `clip(activity - competition + 0.5)`.
    pub opportunity_score: f64,
    /// Verdict from the opportunity score.
    pub verdict: Verdict,
}

/// Summary of the area within a radius of a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatchmentMetrics {
    /// Query point.
    pub center: Coordinates,
    /// Catchment radius in kilometres.
    pub radius_km: f64,
    /// Catchment area in square kilometres.
    pub area_sq_km: f64,
    /// POIs of any kind inside the catchment.
    pub total_pois: usize,
    /// POI counts per kind.
    pub by_kind: BTreeMap<PoiKind, usize>,
    /// Cells whose centroid is inside the catchment.
    pub cells: Vec<CellId>,
    /// Rough resident estimate.
    pub estimated_population: u64,
}

/// Competitors around a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorOverlap {
    /// Search radius in kilometres.
    pub radius_km: f64,
    /// Total competitors inside the radius.
    pub competitor_count: usize,
    /// Closest competitors, at most ten.
    pub competitors: Vec<NearbyPoi>,
    /// Closest competitor inside the radius.
    pub nearest: Option<NearbyPoi>,
    /// Level from `competitor_count`.
    pub level: Intensity,
}

/// Qualitative level in a score explanation.
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
pub enum Level {
    /// Above 0.7.
    High,
    /// Above 0.4.
    Moderate,
    /// 0.4 or below.
    Low,
    /// The underlying factor was undetermined.
    Unobserved,
}

/// Recommendation tier in a score explanation.
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
pub enum Recommendation {
    /// Composite above 0.6.
    Excellent,
    /// Composite above 0.4.
    Good,
    /// Composite above 0.2.
    Average,
    /// Composite of 0.2 or below, or disqualified.
    Poor,
    /// The cell could not be scored.
    Unobserved,
}

/// Human-oriented reading of a composite score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreExplanation {
    /// Cell the explanation is for.
    pub cell_id: CellId,
    /// Demand, read from POI density.
    pub demand: Level,
    /// Competition, read from the competitor penalty.
    pub competition: Level,
    /// Overall tier.
    pub recommendation: Recommendation,
    /// One-line summary.
    pub summary: String,
}

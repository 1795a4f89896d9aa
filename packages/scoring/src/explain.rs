//! Plain-language reading of a composite score.

use locate_scoring_models::analysis::{Level, Recommendation, ScoreExplanation};
use locate_scoring_models::{CompositeScore, FactorValue};

fn level(value: FactorValue) -> Level {
    match value {
        FactorValue::Value(v) if v > 0.7 => Level::High,
        FactorValue::Value(v) if v > 0.4 => Level::Moderate,
        FactorValue::Value(_) => Level::Low,
        FactorValue::Undetermined => Level::Unobserved,
    }
}

/// Explains `score` in terms of demand, competition and an overall tier.
#[must_use]
pub fn explain(score: &CompositeScore) -> ScoreExplanation {
    let demand = level(score.factors.poi_density);
    let competition = level(score.factors.competitor_penalty);

    let recommendation = match score.score {
        FactorValue::Undetermined => Recommendation::Unobserved,
        FactorValue::Value(_) if score.disqualified => Recommendation::Poor,
        FactorValue::Value(v) if v > 0.6 => Recommendation::Excellent,
        FactorValue::Value(v) if v > 0.4 => Recommendation::Good,
        FactorValue::Value(v) if v > 0.2 => Recommendation::Average,
        FactorValue::Value(_) => Recommendation::Poor,
    };

    let summary = match recommendation {
        Recommendation::Unobserved => format!(
            "Cell {} has no observed POIs or transit; it cannot be scored",
            score.cell_id
        ),
        _ if score.disqualified => format!(
            "Cell {} already has a competing {} within the saturation radius",
            score.cell_id, score.poi_type
        ),
        _ => format!(
            "{recommendation} site for {}: {demand} demand, {competition} competition",
            score.poi_type
        ),
    };

    ScoreExplanation {
        cell_id: score.cell_id,
        demand,
        competition,
        recommendation,
        summary,
    }
}

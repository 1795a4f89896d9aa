//! Strategy registry. Loads per-type scoring strategies from TOML.
//!
//! The built-in strategies live in `packages/scoring/strategies/default.toml`
//! and are baked into the binary via [`include_str!`]. Registries can also
//! be built from any TOML document, or derived from another registry with
//! per-type overrides for what-if comparisons.

use std::collections::BTreeMap;

use locate_poi_models::PoiKind;
use locate_scoring_models::{ScoreWeights, Strategy};
use serde::Deserialize;

use crate::ScoringError;

/// Built-in strategy document embedded at compile time.
const DEFAULT_STRATEGIES: &str = include_str!("../strategies/default.toml");

#[derive(Debug, Deserialize)]
struct StrategyDocument {
    #[serde(default, rename = "strategy")]
    strategies: Vec<Strategy>,
}

/// Maps POI types to their scoring strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRegistry {
    strategies: BTreeMap<PoiKind, Strategy>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StrategyRegistry {
    /// The built-in registry.
    ///
    /// # Panics
    ///
    /// Panics if the embedded strategy document is malformed (this is
    /// covered by tests since the document is compiled in).
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_toml(DEFAULT_STRATEGIES)
            .unwrap_or_else(|e| panic!("Failed to parse default strategies: {e}"))
    }

    /// Parses a registry from a TOML document with one `[[strategy]]`
    /// table per POI type.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::StrategyConfig`] if the TOML is malformed
    /// and [`ScoringError::InvalidStrategy`] if a strategy is invalid or
    /// defined twice.
    pub fn from_toml(toml_str: &str) -> Result<Self, ScoringError> {
        let document: StrategyDocument = toml::de::from_str(toml_str)?;
        Self::from_strategies(document.strategies)
    }

    /// Builds a registry from strategies.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidStrategy`] if a strategy is invalid
    /// or two strategies share a POI type.
    pub fn from_strategies(
        strategies: impl IntoIterator<Item = Strategy>,
    ) -> Result<Self, ScoringError> {
        let mut map = BTreeMap::new();
        for strategy in strategies {
            validate(&strategy)?;
            let poi_type = strategy.poi_type;
            if map.insert(poi_type, strategy).is_some() {
                return Err(invalid(poi_type, "defined more than once"));
            }
        }

        log::debug!("Loaded {} scoring strategies", map.len());

        Ok(Self { strategies: map })
    }

    /// Strategy for `poi_type`.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::UnknownPoiType`] if no strategy is
    /// registered for the type.
    pub fn select(&self, poi_type: PoiKind) -> Result<&Strategy, ScoringError> {
        self.strategies
            .get(&poi_type)
            .ok_or_else(|| ScoringError::UnknownPoiType(poi_type.to_string()))
    }

    /// Strategy for a POI type given by name.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::UnknownPoiType`] if the name does not parse
    /// or no strategy is registered for it.
    pub fn select_named(&self, name: &str) -> Result<&Strategy, ScoringError> {
        self.select(PoiKind::parse(name)?)
    }

    /// Returns a copy of this registry with `strategy` added or replacing
    /// the existing one for its type.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidStrategy`] if the strategy is
    /// invalid.
    pub fn with_strategy(mut self, strategy: Strategy) -> Result<Self, ScoringError> {
        validate(&strategy)?;
        self.strategies.insert(strategy.poi_type, strategy);
        Ok(self)
    }

    /// Returns a copy of this registry with the weights for `poi_type`
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::UnknownPoiType`] if the type is not
    /// registered and [`ScoringError::InvalidStrategy`] if the weights are
    /// invalid.
    pub fn with_weights(
        self,
        poi_type: PoiKind,
        weights: ScoreWeights,
    ) -> Result<Self, ScoringError> {
        let mut strategy = self.select(poi_type)?.clone();
        strategy.weights = weights;
        self.with_strategy(strategy)
    }

    /// Registered strategies, ordered by POI type.
    pub fn strategies(&self) -> impl Iterator<Item = &Strategy> + '_ {
        self.strategies.values()
    }

    /// Registered POI types in order.
    pub fn poi_types(&self) -> impl Iterator<Item = PoiKind> + '_ {
        self.strategies.keys().copied()
    }

    /// Number of registered strategies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

fn invalid(poi_type: PoiKind, message: impl Into<String>) -> ScoringError {
    ScoringError::InvalidStrategy {
        poi_type: poi_type.to_string(),
        message: message.into(),
    }
}

fn validate(strategy: &Strategy) -> Result<(), ScoringError> {
    strategy
        .weights
        .validate()
        .map_err(|e| invalid(strategy.poi_type, e.to_string()))?;

    let penalty = &strategy.penalty;
    if !penalty.saturation_radius_km.is_finite() || penalty.saturation_radius_km < 0.0 {
        return Err(invalid(
            strategy.poi_type,
            "saturation_radius_km must be a non-negative number",
        ));
    }
    if !penalty.falloff_km.is_finite() || penalty.falloff_km < 0.0 {
        return Err(invalid(
            strategy.poi_type,
            "falloff_km must be a non-negative number",
        ));
    }

    Ok(())
}

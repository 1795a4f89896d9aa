#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Point-of-interest taxonomy and record types.
//!
//! Every POI fed to the scoring engine carries one [`PoiKind`] tag. Kinds
//! roll up into a coarser [`PoiCategory`] that the factor calculators use
//! to pick out commercial, residential and transit signals.

use chrono::{DateTime, Utc};
use locate_geography_models::Coordinates;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Coarse grouping of POI kinds used by the factor calculators.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PoiCategory {
    /// Shops, banking, fuel and other retail activity
    Commercial,
    /// Housing, used as a population proxy
    Residential,
    /// Transit stops and stations
    Transit,
    /// Public services (health, education, policing)
    Civic,
    /// Anything not fitting the above
    Other,
}

/// Specific POI tag.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PoiKind {
    // ── Commercial ──────────────────────────────────────
    /// Cash machine
    Atm,
    /// Bank branch
    Bank,
    /// Shopping mall
    Mall,
    /// Pharmacy or chemist
    Pharmacy,
    /// Fuel station
    Fuel,
    /// Supermarket
    Supermarket,
    /// Generic commercial unit (shop, office, restaurant)
    Commercial,

    // ── Residential ─────────────────────────────────────
    /// Residential unit or building
    Residential,

    // ── Transit ─────────────────────────────────────────
    /// Bus, metro or tram stop
    TransitStop,
    /// Bus station / terminal
    BusStation,

    // ── Civic ───────────────────────────────────────────
    /// Hospital
    Hospital,
    /// Clinic or medical practice
    Clinic,
    /// School, college or university
    School,
    /// Police station
    Police,

    // ── Other ───────────────────────────────────────────
    /// Anything else
    Other,
}

impl PoiKind {
    /// Returns the [`PoiCategory`] this kind rolls up into.
    #[must_use]
    pub const fn category(self) -> PoiCategory {
        match self {
            Self::Atm
            | Self::Bank
            | Self::Mall
            | Self::Pharmacy
            | Self::Fuel
            | Self::Supermarket
            | Self::Commercial => PoiCategory::Commercial,

            Self::Residential => PoiCategory::Residential,

            Self::TransitStop | Self::BusStation => PoiCategory::Transit,

            Self::Hospital | Self::Clinic | Self::School | Self::Police => PoiCategory::Civic,

            Self::Other => PoiCategory::Other,
        }
    }

    /// Parses a `snake_case` kind name.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownPoiTypeError`] if the name is not a known kind.
    pub fn parse(name: &str) -> Result<Self, UnknownPoiTypeError> {
        name.trim()
            .to_ascii_lowercase()
            .parse()
            .map_err(|_| UnknownPoiTypeError {
                name: name.to_string(),
            })
    }

    /// Returns all kinds belonging to the given category.
    #[must_use]
    pub fn for_category(category: PoiCategory) -> Vec<Self> {
        Self::all()
            .iter()
            .copied()
            .filter(|kind| kind.category() == category)
            .collect()
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Atm,
            Self::Bank,
            Self::Mall,
            Self::Pharmacy,
            Self::Fuel,
            Self::Supermarket,
            Self::Commercial,
            Self::Residential,
            Self::TransitStop,
            Self::BusStation,
            Self::Hospital,
            Self::Clinic,
            Self::School,
            Self::Police,
            Self::Other,
        ]
    }
}

/// Error returned when a POI type name does not match any [`PoiKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown POI type '{name}'")]
pub struct UnknownPoiTypeError {
    /// The name that failed to parse.
    pub name: String,
}

/// An existing point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointOfInterest {
    /// Source identifier (e.g. an OSM node id).
    pub id: String,
    /// Type tag.
    pub kind: PoiKind,
    /// Location of the POI.
    pub location: Coordinates,
    /// Display name, if the source has one.
    #[serde(default)]
    pub name: Option<String>,
    /// When the POI was first observed. Only needed for growth analysis.
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
}

impl PointOfInterest {
    /// Creates a POI without a name or observation timestamp.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: PoiKind, location: Coordinates) -> Self {
        Self {
            id: id.into(),
            kind,
            location,
            name: None,
            observed_at: None,
        }
    }

    /// Sets the observation timestamp.
    #[must_use]
    pub fn observed(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = Some(at);
        self
    }

    /// Shorthand for `self.kind.category()`.
    #[must_use]
    pub const fn category(&self) -> PoiCategory {
        self.kind.category()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_category_consistency() {
        for kind in PoiKind::all() {
            let parent = kind.category();
            let kinds = PoiKind::for_category(parent);
            assert!(
                kinds.contains(kind),
                "{kind:?} claims category {parent:?} but isn't in for_category result"
            );
        }
    }

    #[test]
    fn parse_accepts_snake_case_names() {
        assert_eq!(PoiKind::parse("atm").unwrap(), PoiKind::Atm);
        assert_eq!(PoiKind::parse("bus_station").unwrap(), PoiKind::BusStation);
        assert_eq!(PoiKind::parse(" Hospital ").unwrap(), PoiKind::Hospital);
    }

    #[test]
    fn parse_rejects_unknown_names() {
        let err = PoiKind::parse("spaceport").unwrap_err();
        assert_eq!(err.name, "spaceport");
        assert_eq!(err.to_string(), "unknown POI type 'spaceport'");
    }

    #[test]
    fn display_matches_serde_name() {
        for kind in PoiKind::all() {
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn poi_deserializes_without_optional_fields() {
        let poi: PointOfInterest = serde_json::from_str(
            r#"{"id":"n1","kind":"transit_stop","location":{"lat":28.6,"lng":77.2}}"#,
        )
        .unwrap();
        assert_eq!(poi.kind, PoiKind::TransitStop);
        assert_eq!(poi.category(), PoiCategory::Transit);
        assert!(poi.observed_at.is_none());
    }
}

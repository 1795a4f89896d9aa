#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate and grid cell types.
//!
//! These types describe the fixed-resolution tessellation that every
//! analysis run scores. They carry no spatial indexing of their own; the
//! `locate_spatial` crate builds validated, indexed grids from them.

use serde::{Deserialize, Serialize};

/// A WGS-84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lng: f64,
}

impl Coordinates {
    /// Creates a coordinate pair.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and inside the valid
    /// latitude/longitude ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Unique identifier of a grid cell.
///
/// Ordering on `CellId` is the deterministic tie-breaker used when ranking.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CellId(pub u64);

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CellId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// An axis-aligned latitude/longitude box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Western edge.
    pub min_lng: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Eastern edge.
    pub max_lng: f64,
}

impl BoundingBox {
    /// Creates a box from its south-west and north-east corners.
    #[must_use]
    pub const fn new(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        }
    }

    /// Latitude halfway between the southern and northern edges.
    #[must_use]
    pub fn mid_lat(&self) -> f64 {
        f64::midpoint(self.min_lat, self.max_lat)
    }

    /// Centre of the box.
    #[must_use]
    pub fn center(&self) -> Coordinates {
        Coordinates::new(self.mid_lat(), f64::midpoint(self.min_lng, self.max_lng))
    }

    /// Whether the box has positive extent in both directions.
    #[must_use]
    pub fn is_proper(&self) -> bool {
        self.max_lat > self.min_lat && self.max_lng > self.min_lng
    }

    /// Closed counter-clockwise ring tracing the box outline.
    #[must_use]
    pub fn ring(&self) -> Vec<Coordinates> {
        vec![
            Coordinates::new(self.min_lat, self.min_lng),
            Coordinates::new(self.min_lat, self.max_lng),
            Coordinates::new(self.max_lat, self.max_lng),
            Coordinates::new(self.max_lat, self.min_lng),
            Coordinates::new(self.min_lat, self.min_lng),
        ]
    }
}

/// One cell of the analysis tessellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    /// Unique cell identifier.
    pub id: CellId,
    /// Cell centroid.
    pub centroid: Coordinates,
    /// Nominal edge length in kilometres (1 km in the reference deployment).
    pub edge_km: f64,
    /// Closed outer ring of the cell polygon.
    pub boundary: Vec<Coordinates>,
}

impl GridCell {
    /// Builds a rectangular cell covering `bounds`, with its centroid at the
    /// centre of the box.
    #[must_use]
    pub fn from_bounds(id: impl Into<CellId>, bounds: &BoundingBox, edge_km: f64) -> Self {
        Self {
            id: id.into(),
            centroid: bounds.center(),
            edge_km,
            boundary: bounds.ring(),
        }
    }

    /// Nominal cell area in square kilometres.
    #[must_use]
    pub fn area_sq_km(&self) -> f64 {
        self.edge_km * self.edge_km
    }

    /// Bounding box of the boundary ring, or `None` for an empty ring.
    #[must_use]
    pub fn bounds(&self) -> Option<BoundingBox> {
        let first = self.boundary.first()?;
        let init = BoundingBox::new(first.lat, first.lng, first.lat, first.lng);

        Some(self.boundary.iter().fold(init, |acc, c| BoundingBox {
            min_lat: acc.min_lat.min(c.lat),
            min_lng: acc.min_lng.min(c.lng),
            max_lat: acc.max_lat.max(c.lat),
            max_lng: acc.max_lng.max(c.lng),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_is_closed() {
        let bbox = BoundingBox::new(28.0, 77.0, 28.01, 77.01);
        let ring = bbox.ring();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn cell_bounds_match_source_box() {
        let bbox = BoundingBox::new(28.0, 77.0, 28.01, 77.02);
        let cell = GridCell::from_bounds(7, &bbox, 1.0);
        assert_eq!(cell.id, CellId(7));
        assert_eq!(cell.bounds(), Some(bbox));
        assert!((cell.centroid.lat - 28.005).abs() < 1e-12);
        assert!((cell.centroid.lng - 77.01).abs() < 1e-12);
    }

    #[test]
    fn empty_boundary_has_no_bounds() {
        let cell = GridCell {
            id: CellId(1),
            centroid: Coordinates::new(0.0, 0.0),
            edge_km: 1.0,
            boundary: Vec::new(),
        };
        assert!(cell.bounds().is_none());
    }

    #[test]
    fn coordinate_validity() {
        assert!(Coordinates::new(28.6, 77.2).is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, f64::NAN).is_valid());
    }

    #[test]
    fn cell_id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&CellId(42)).unwrap();
        assert_eq!(json, "42");
    }
}

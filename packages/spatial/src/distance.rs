//! Distance helpers.
//!
//! Exact distances come from `geo`'s ellipsoidal geodesic. For indexing,
//! coordinates are projected onto the unit sphere so that Euclidean
//! (chord) ordering in the R-tree matches great-circle ordering.

use geo::{Distance, Geodesic, Point};
use locate_geography_models::Coordinates;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Kilometres per degree of latitude, used for tessellation steps.
pub const KM_PER_DEGREE_LAT: f64 = 111.32;

/// Slack applied to chord search radii so that the spherical pre-filter
/// never drops a point the ellipsoidal check would accept.
const CHORD_SLACK: f64 = 1.01;

/// Geodesic distance between two coordinates in kilometres.
#[must_use]
pub fn geodesic_km(a: Coordinates, b: Coordinates) -> f64 {
    Geodesic.distance(to_point(a), to_point(b)) / 1000.0
}

/// Converts to a `geo` point (x = longitude, y = latitude).
#[must_use]
pub fn to_point(c: Coordinates) -> Point<f64> {
    Point::new(c.lng, c.lat)
}

/// Projects a coordinate onto the unit sphere.
#[must_use]
pub fn unit_vector(c: Coordinates) -> [f64; 3] {
    let lat = c.lat.to_radians();
    let lng = c.lng.to_radians();
    [lat.cos() * lng.cos(), lat.cos() * lng.sin(), lat.sin()]
}

/// Squared unit-sphere chord length covering a surface distance of `km`,
/// padded by [`CHORD_SLACK`].
#[must_use]
pub fn chord_radius_sq(km: f64) -> f64 {
    let angle = (km * CHORD_SLACK / EARTH_RADIUS_KM).min(std::f64::consts::PI);
    let chord = 2.0 * (angle / 2.0).sin();
    chord * chord
}

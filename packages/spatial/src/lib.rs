#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial indexes for grid scoring.
//!
//! Builds a validated [`Grid`] from raw cell records and a [`PoiCatalogue`]
//! from raw POI records. Both are backed by R-trees and are constructed
//! once per analysis run, then shared read-only across worker threads.
//!
//! All distances are geodesic distances on the WGS-84 ellipsoid, reported
//! in kilometres.

pub mod catalogue;
pub mod distance;
pub mod grid;

pub use catalogue::{PoiCatalogue, PoiHit};
pub use distance::geodesic_km;
pub use grid::{Grid, GridValidation};

use locate_geography_models::CellId;
use thiserror::Error;

/// Structural problems with a grid. All of these are fatal to a run.
#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    /// The grid has no cells.
    #[error("grid has no cells")]
    Empty,

    /// Two cells share an identifier.
    #[error("duplicate cell id {id}")]
    DuplicateCell {
        /// The repeated identifier.
        id: CellId,
    },

    /// A cell's edge length differs from the rest of the grid, or its
    /// polygon does not match its declared edge length.
    #[error("cell {id} has edge {actual_km:.3} km, expected {expected_km:.3} km")]
    InconsistentCellSize {
        /// Offending cell.
        id: CellId,
        /// Edge length shared by the grid.
        expected_km: f64,
        /// Edge length measured or declared for this cell.
        actual_km: f64,
    },

    /// A cell polygon has fewer than three distinct vertices or zero extent.
    #[error("cell {id} has a degenerate boundary")]
    DegenerateCell {
        /// Offending cell.
        id: CellId,
    },

    /// A cell has non-finite or out-of-range coordinates.
    #[error("cell {id} has invalid coordinates")]
    InvalidCoordinates {
        /// Offending cell.
        id: CellId,
    },

    /// Two cells overlap.
    #[error("cells {a} and {b} overlap")]
    Overlap {
        /// First cell.
        a: CellId,
        /// Second cell.
        b: CellId,
    },

    /// The configured edge length is not a positive finite number.
    #[error("invalid cell edge length {edge_km} km")]
    InvalidEdgeLength {
        /// The rejected edge length.
        edge_km: f64,
    },

    /// The region to tessellate has no area.
    #[error("region bounds are empty or inverted")]
    InvalidBounds,
}

//! Validated grid tessellation.

use std::collections::BTreeMap;

use geo::{BoundingRect, Contains, Intersects, LineString, Polygon};
use locate_geography_models::{BoundingBox, CellId, Coordinates, GridCell};
use rstar::{AABB, RTree, RTreeObject};

use crate::GridError;
use crate::distance::{KM_PER_DEGREE_LAT, geodesic_km, to_point};

/// Tolerances applied when validating a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridValidation {
    /// Allowed relative difference between a cell's measured width/height
    /// and its declared edge length. Generous by default so that grids
    /// generated in a projected CRS (where ground size drifts with
    /// latitude) still validate.
    pub size_tolerance: f64,
}

impl Default for GridValidation {
    fn default() -> Self {
        Self {
            size_tolerance: 0.15,
        }
    }
}

/// A cell polygon stored in the R-tree with its position in the grid.
struct CellEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for CellEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// An immutable, validated tessellation of the analysis region.
///
/// Cells keep the order they were supplied in; every per-cell result the
/// engine produces is aligned with [`Grid::cells`].
pub struct Grid {
    cells: Vec<GridCell>,
    polygons: Vec<Polygon<f64>>,
    index: RTree<CellEntry>,
    by_id: BTreeMap<CellId, usize>,
    edge_km: f64,
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("cells", &self.cells.len())
            .field("edge_km", &self.edge_km)
            .finish_non_exhaustive()
    }
}

impl Grid {
    /// Validates `cells` with default tolerances and builds the index.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if the cells do not form a consistent,
    /// non-overlapping tessellation.
    pub fn new(cells: Vec<GridCell>) -> Result<Self, GridError> {
        Self::with_validation(cells, &GridValidation::default())
    }

    /// Validates `cells` with explicit tolerances and builds the index.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if the cells do not form a consistent,
    /// non-overlapping tessellation.
    pub fn with_validation(
        cells: Vec<GridCell>,
        validation: &GridValidation,
    ) -> Result<Self, GridError> {
        let first = cells.first().ok_or(GridError::Empty)?;
        let edge_km = first.edge_km;
        if !edge_km.is_finite() || edge_km <= 0.0 {
            return Err(GridError::InvalidEdgeLength { edge_km });
        }

        let mut by_id = BTreeMap::new();
        let mut polygons = Vec::with_capacity(cells.len());
        let mut entries = Vec::with_capacity(cells.len());

        for (index, cell) in cells.iter().enumerate() {
            if by_id.insert(cell.id, index).is_some() {
                return Err(GridError::DuplicateCell { id: cell.id });
            }
            if (cell.edge_km - edge_km).abs() > edge_km * 1e-9 {
                return Err(GridError::InconsistentCellSize {
                    id: cell.id,
                    expected_km: edge_km,
                    actual_km: cell.edge_km,
                });
            }

            let polygon = validate_cell(cell, edge_km, validation)?;
            entries.push(CellEntry {
                index,
                envelope: compute_envelope(&polygon),
            });
            polygons.push(polygon);
        }

        let index = RTree::bulk_load(entries);
        check_overlaps(&cells, &polygons, &index)?;

        log::debug!(
            "Built grid of {} cells ({edge_km} km edge)",
            cells.len()
        );

        Ok(Self {
            cells,
            polygons,
            index,
            by_id,
            edge_km,
        })
    }

    /// Tessellates `bounds` into square cells of `edge_km`, numbered
    /// row-major from 1 starting at the south-west corner.
    ///
    /// Degree steps are derived from the box's mid-latitude so every cell
    /// shares the same angular size and the cells tile the box exactly.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if the bounds are empty or the edge length is
    /// not positive.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn tessellate(bounds: &BoundingBox, edge_km: f64) -> Result<Self, GridError> {
        if !edge_km.is_finite() || edge_km <= 0.0 {
            return Err(GridError::InvalidEdgeLength { edge_km });
        }
        if !bounds.is_proper() {
            return Err(GridError::InvalidBounds);
        }

        let lat_step = edge_km / KM_PER_DEGREE_LAT;
        let lng_step = edge_km / (KM_PER_DEGREE_LAT * bounds.mid_lat().to_radians().cos());

        let rows = ((bounds.max_lat - bounds.min_lat) / lat_step).ceil().max(1.0) as u64;
        let cols = ((bounds.max_lng - bounds.min_lng) / lng_step).ceil().max(1.0) as u64;

        let mut cells = Vec::new();
        for row in 0..rows {
            let min_lat = (row as f64).mul_add(lat_step, bounds.min_lat);
            for col in 0..cols {
                let min_lng = (col as f64).mul_add(lng_step, bounds.min_lng);
                let cell_bounds =
                    BoundingBox::new(min_lat, min_lng, min_lat + lat_step, min_lng + lng_step);
                cells.push(GridCell::from_bounds(
                    row * cols + col + 1,
                    &cell_bounds,
                    edge_km,
                ));
            }
        }

        log::info!("Tessellated region into {rows}x{cols} cells of {edge_km} km");

        Self::new(cells)
    }

    /// Cells in input order.
    #[must_use]
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`; a validated grid has at least one cell.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Shared cell edge length in kilometres.
    #[must_use]
    pub const fn edge_km(&self) -> f64 {
        self.edge_km
    }

    /// Position of the cell with the given id.
    #[must_use]
    pub fn index_of(&self, id: CellId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    /// Cell with the given id.
    #[must_use]
    pub fn get(&self, id: CellId) -> Option<&GridCell> {
        self.index_of(id).map(|i| &self.cells[i])
    }

    /// Polygon of the cell at `index`.
    #[must_use]
    pub fn polygon(&self, index: usize) -> &Polygon<f64> {
        &self.polygons[index]
    }

    /// Index of the cell covering `point`.
    ///
    /// A point on an edge shared by several cells belongs to the one with
    /// the lowest id, so every point maps to at most one cell.
    #[must_use]
    pub fn locate(&self, point: Coordinates) -> Option<usize> {
        let geo_point = to_point(point);
        let query_env = AABB::from_point([point.lng, point.lat]);

        self.index
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| self.polygons[entry.index].intersects(&geo_point))
            .map(|entry| entry.index)
            .min_by_key(|&index| self.cells[index].id)
    }

    /// Index of the cell covering `point`, or failing that the cell whose
    /// centroid is geodesically closest.
    #[must_use]
    pub fn locate_or_nearest(&self, point: Coordinates) -> usize {
        self.locate(point).unwrap_or_else(|| {
            self.cells
                .iter()
                .enumerate()
                .map(|(i, cell)| (i, geodesic_km(point, cell.centroid)))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map_or(0, |(i, _)| i)
        })
    }
}

/// Checks a single cell and converts its ring to a polygon.
fn validate_cell(
    cell: &GridCell,
    edge_km: f64,
    validation: &GridValidation,
) -> Result<Polygon<f64>, GridError> {
    if !cell.centroid.is_valid() || cell.boundary.iter().any(|c| !c.is_valid()) {
        return Err(GridError::InvalidCoordinates { id: cell.id });
    }

    let bounds = cell
        .bounds()
        .filter(|b| b.is_proper() && cell.boundary.len() >= 4)
        .ok_or(GridError::DegenerateCell { id: cell.id })?;

    let mid_lng = f64::midpoint(bounds.min_lng, bounds.max_lng);
    let mid_lat = bounds.mid_lat();
    let width_km = geodesic_km(
        Coordinates::new(mid_lat, bounds.min_lng),
        Coordinates::new(mid_lat, bounds.max_lng),
    );
    let height_km = geodesic_km(
        Coordinates::new(bounds.min_lat, mid_lng),
        Coordinates::new(bounds.max_lat, mid_lng),
    );

    for measured in [width_km, height_km] {
        if (measured - edge_km).abs() > edge_km * validation.size_tolerance {
            return Err(GridError::InconsistentCellSize {
                id: cell.id,
                expected_km: edge_km,
                actual_km: measured,
            });
        }
    }

    let ring: LineString<f64> = cell
        .boundary
        .iter()
        .map(|c| (c.lng, c.lat))
        .collect::<Vec<_>>()
        .into();

    Ok(Polygon::new(ring, vec![]))
}

/// Fails on the first pair of cells whose interiors overlap.
///
/// Two cells overlap when their bounding boxes share a region of positive
/// extent and the centre of that shared region lies strictly inside both
/// polygons. Cells that merely touch along an edge do not overlap.
fn check_overlaps(
    cells: &[GridCell],
    polygons: &[Polygon<f64>],
    index: &RTree<CellEntry>,
) -> Result<(), GridError> {
    for (i, polygon) in polygons.iter().enumerate() {
        let Some(rect) = polygon.bounding_rect() else {
            continue;
        };
        let eps = (rect.width().min(rect.height())) * 1e-6;
        let env = compute_envelope(polygon);

        for other in index.locate_in_envelope_intersecting(&env) {
            let j = other.index;
            if j <= i {
                continue;
            }
            let Some(other_rect) = polygons[j].bounding_rect() else {
                continue;
            };

            let min_x = rect.min().x.max(other_rect.min().x);
            let max_x = rect.max().x.min(other_rect.max().x);
            let min_y = rect.min().y.max(other_rect.min().y);
            let max_y = rect.max().y.min(other_rect.max().y);
            if max_x - min_x <= eps || max_y - min_y <= eps {
                continue;
            }

            let sample = geo::Point::new(
                f64::midpoint(min_x, max_x),
                f64::midpoint(min_y, max_y),
            );
            if polygon.contains(&sample) && polygons[j].contains(&sample) {
                return Err(GridError::Overlap {
                    a: cells[i].id,
                    b: cells[j].id,
                });
            }
        }
    }

    Ok(())
}

/// Compute the bounding box envelope for a [`Polygon`].
fn compute_envelope(polygon: &Polygon<f64>) -> AABB<[f64; 2]> {
    polygon.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delhi_box() -> BoundingBox {
        BoundingBox::new(28.50, 77.10, 28.53, 77.14)
    }

    #[test]
    fn tessellation_covers_the_box() {
        let grid = Grid::tessellate(&delhi_box(), 1.0).unwrap();
        assert!(grid.len() >= 12);
        assert!((grid.edge_km() - 1.0).abs() < f64::EPSILON);

        let ids: Vec<u64> = grid.cells().iter().map(|c| c.id.0).collect();
        assert_eq!(ids.first(), Some(&1));
        assert_eq!(ids.len(), grid.len());
    }

    #[test]
    fn every_centroid_locates_to_its_own_cell() {
        let grid = Grid::tessellate(&delhi_box(), 1.0).unwrap();
        for (i, cell) in grid.cells().iter().enumerate() {
            assert_eq!(grid.locate(cell.centroid), Some(i));
        }
    }

    #[test]
    fn shared_edge_goes_to_lowest_id() {
        let grid = Grid::tessellate(&delhi_box(), 1.0).unwrap();
        let first = &grid.cells()[0];
        let bounds = first.bounds().unwrap();
        let on_edge = Coordinates::new(first.centroid.lat, bounds.max_lng);
        assert_eq!(grid.locate(on_edge), Some(0));
    }

    #[test]
    fn outside_point_falls_back_to_nearest() {
        let grid = Grid::tessellate(&delhi_box(), 1.0).unwrap();
        let outside = Coordinates::new(28.40, 77.10);
        assert!(grid.locate(outside).is_none());
        assert_eq!(grid.locate_or_nearest(outside), 0);
    }

    #[test]
    fn rejects_empty_grid() {
        assert_eq!(Grid::new(vec![]).unwrap_err(), GridError::Empty);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let grid = Grid::tessellate(&delhi_box(), 1.0).unwrap();
        let mut cells = grid.cells().to_vec();
        cells[1].id = cells[0].id;
        assert!(matches!(
            Grid::new(cells),
            Err(GridError::DuplicateCell { .. })
        ));
    }

    #[test]
    fn rejects_mixed_edge_lengths() {
        let grid = Grid::tessellate(&delhi_box(), 1.0).unwrap();
        let mut cells = grid.cells().to_vec();
        cells[2].edge_km = 2.0;
        assert!(matches!(
            Grid::new(cells),
            Err(GridError::InconsistentCellSize { .. })
        ));
    }

    #[test]
    fn rejects_polygon_that_does_not_match_edge() {
        let bounds = BoundingBox::new(28.5, 77.1, 28.6, 77.2);
        let cell = GridCell::from_bounds(1, &bounds, 1.0);
        assert!(matches!(
            Grid::new(vec![cell]),
            Err(GridError::InconsistentCellSize { .. })
        ));
    }

    #[test]
    fn rejects_overlapping_cells() {
        let grid = Grid::tessellate(&delhi_box(), 1.0).unwrap();
        let mut cells = grid.cells().to_vec();
        let mut copy = cells[0].clone();
        copy.id = CellId(999);
        cells.push(copy);
        assert!(matches!(Grid::new(cells), Err(GridError::Overlap { .. })));
    }

    #[test]
    fn rejects_degenerate_cells() {
        let cell = GridCell {
            id: CellId(1),
            centroid: Coordinates::new(28.5, 77.1),
            edge_km: 1.0,
            boundary: vec![Coordinates::new(28.5, 77.1); 4],
        };
        assert_eq!(
            Grid::new(vec![cell]).unwrap_err(),
            GridError::DegenerateCell { id: CellId(1) }
        );
    }

    #[test]
    fn rejects_invalid_edge_and_bounds() {
        assert!(matches!(
            Grid::tessellate(&delhi_box(), 0.0),
            Err(GridError::InvalidEdgeLength { .. })
        ));
        let inverted = BoundingBox::new(28.6, 77.1, 28.5, 77.2);
        assert_eq!(
            Grid::tessellate(&inverted, 1.0).unwrap_err(),
            GridError::InvalidBounds
        );
    }
}

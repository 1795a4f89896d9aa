//! Indexed POI catalogue.
//!
//! POIs are held in one R-tree over all kinds plus one R-tree per kind.
//! Tree points are unit-sphere vectors (see [`crate::distance`]), so
//! nearest-neighbour queries return true geodesic neighbours rather than
//! nearest-in-degrees.

use std::collections::BTreeMap;

use locate_geography_models::Coordinates;
use locate_poi_models::{PoiCategory, PoiKind, PointOfInterest};
use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::distance::{chord_radius_sq, geodesic_km, unit_vector};

type Entry = GeomWithData<[f64; 3], usize>;

/// A POI returned from a distance query, with its geodesic distance.
#[derive(Debug, Clone, Copy)]
pub struct PoiHit<'a> {
    /// The matched POI.
    pub poi: &'a PointOfInterest,
    /// Geodesic distance from the query point in kilometres.
    pub distance_km: f64,
}

/// Read-only, indexed collection of existing POIs.
pub struct PoiCatalogue {
    pois: Vec<PointOfInterest>,
    all: RTree<Entry>,
    by_kind: BTreeMap<PoiKind, RTree<Entry>>,
}

impl std::fmt::Debug for PoiCatalogue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoiCatalogue")
            .field("pois", &self.pois.len())
            .field("kinds", &self.by_kind.len())
            .finish_non_exhaustive()
    }
}

impl PoiCatalogue {
    /// Indexes `pois`. Records with invalid coordinates are dropped with a
    /// warning; the engine does not geocode or repair them.
    #[must_use]
    pub fn new(pois: Vec<PointOfInterest>) -> Self {
        let total = pois.len();
        let pois: Vec<PointOfInterest> = pois
            .into_iter()
            .filter(|poi| {
                let ok = poi.location.is_valid();
                if !ok {
                    log::warn!("Skipping POI {} with invalid coordinates", poi.id);
                }
                ok
            })
            .collect();

        let mut grouped: BTreeMap<PoiKind, Vec<Entry>> = BTreeMap::new();
        let mut all = Vec::with_capacity(pois.len());

        for (index, poi) in pois.iter().enumerate() {
            let position = unit_vector(poi.location);
            grouped
                .entry(poi.kind)
                .or_default()
                .push(GeomWithData::new(position, index));
            all.push(GeomWithData::new(position, index));
        }

        let by_kind = grouped
            .into_iter()
            .map(|(kind, entries)| (kind, RTree::bulk_load(entries)))
            .collect();

        log::info!(
            "Indexed {} POIs into catalogue ({} skipped)",
            pois.len(),
            total - pois.len()
        );

        Self {
            pois,
            all: RTree::bulk_load(all),
            by_kind,
        }
    }

    /// All indexed POIs.
    #[must_use]
    pub fn pois(&self) -> &[PointOfInterest] {
        &self.pois
    }

    /// Number of indexed POIs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pois.len()
    }

    /// Whether the catalogue holds no POIs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pois.is_empty()
    }

    /// Number of POIs of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: PoiKind) -> usize {
        self.by_kind.get(&kind).map_or(0, RTree::size)
    }

    /// Whether any POI of the given kinds exists.
    #[must_use]
    pub fn has_any(&self, kinds: &[PoiKind]) -> bool {
        kinds.iter().any(|kind| self.count_kind(*kind) > 0)
    }

    /// Whether any POI of the given category exists.
    #[must_use]
    pub fn has_category(&self, category: PoiCategory) -> bool {
        self.has_any(&PoiKind::for_category(category))
    }

    /// Nearest POI among `kinds` to `point`.
    #[must_use]
    pub fn nearest(&self, point: Coordinates, kinds: &[PoiKind]) -> Option<PoiHit<'_>> {
        let query = unit_vector(point);

        kinds
            .iter()
            .filter_map(|kind| self.by_kind.get(kind))
            .filter_map(|tree| tree.nearest_neighbor(&query))
            .map(|entry| self.hit(point, entry.data))
            .min_by(|a, b| a.distance_km.total_cmp(&b.distance_km))
    }

    /// Up to `n` nearest POIs among `kinds` within `max_km` of `point`,
    /// closest first.
    #[must_use]
    pub fn nearest_n(
        &self,
        point: Coordinates,
        kinds: &[PoiKind],
        n: usize,
        max_km: f64,
    ) -> Vec<PoiHit<'_>> {
        let query = unit_vector(point);

        let mut hits: Vec<PoiHit<'_>> = kinds
            .iter()
            .filter_map(|kind| self.by_kind.get(kind))
            .flat_map(|tree| tree.nearest_neighbor_iter(&query).take(n))
            .map(|entry| self.hit(point, entry.data))
            .filter(|hit| hit.distance_km <= max_km)
            .collect();

        sort_hits(&mut hits);
        hits.truncate(n);
        hits
    }

    /// All POIs within `radius_km` of `point`, closest first. `kinds`
    /// restricts the result; `None` matches every kind.
    #[must_use]
    pub fn within_radius(
        &self,
        point: Coordinates,
        radius_km: f64,
        kinds: Option<&[PoiKind]>,
    ) -> Vec<PoiHit<'_>> {
        let query = unit_vector(point);
        let radius_sq = chord_radius_sq(radius_km);

        let candidates: Vec<&Entry> = match kinds {
            None => self
                .all
                .locate_within_distance(query, radius_sq)
                .collect(),
            Some(kinds) => kinds
                .iter()
                .filter_map(|kind| self.by_kind.get(kind))
                .flat_map(|tree| tree.locate_within_distance(query, radius_sq))
                .collect(),
        };

        let mut hits: Vec<PoiHit<'_>> = candidates
            .into_iter()
            .map(|entry| self.hit(point, entry.data))
            .filter(|hit| hit.distance_km <= radius_km)
            .collect();

        sort_hits(&mut hits);
        hits
    }

    fn hit(&self, point: Coordinates, index: usize) -> PoiHit<'_> {
        let poi = &self.pois[index];
        PoiHit {
            poi,
            distance_km: geodesic_km(point, poi.location),
        }
    }
}

/// Sorts by distance, then POI id so ties are deterministic.
fn sort_hits(hits: &mut [PoiHit<'_>]) {
    hits.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.poi.id.cmp(&b.poi.id))
    });
}

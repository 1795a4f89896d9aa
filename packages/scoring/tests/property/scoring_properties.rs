use std::collections::BTreeSet;

use locate_geography_models::{BoundingBox, CellId, Coordinates};
use locate_poi_models::{PoiKind, PointOfInterest};
use locate_scoring::{GrowthClassifier, GrowthInputs, ScoringEngine};
use locate_scoring_models::growth::DensitySnapshot;
use locate_scoring_models::{DecayShape, PenaltyConfig, ScoreWeights, WEIGHT_EPSILON};
use locate_spatial::{Grid, PoiCatalogue};
use proptest::prelude::*;

const REGION: BoundingBox = BoundingBox::new(28.50, 77.10, 28.53, 77.14);

const KINDS: [PoiKind; 8] = [
    PoiKind::Atm,
    PoiKind::Bank,
    PoiKind::Hospital,
    PoiKind::Mall,
    PoiKind::Commercial,
    PoiKind::Residential,
    PoiKind::TransitStop,
    PoiKind::School,
];

fn grid() -> Grid {
    Grid::tessellate(&REGION, 1.0).unwrap()
}

fn catalogue(raw: &[(usize, f64, f64)]) -> PoiCatalogue {
    PoiCatalogue::new(
        raw.iter()
            .enumerate()
            .map(|(i, &(kind, fy, fx))| {
                let location = Coordinates::new(
                    fy.mul_add(REGION.max_lat - REGION.min_lat, REGION.min_lat),
                    fx.mul_add(REGION.max_lng - REGION.min_lng, REGION.min_lng),
                );
                PointOfInterest::new(format!("poi-{i}"), KINDS[kind % KINDS.len()], location)
            })
            .collect(),
    )
}

fn pois() -> impl Strategy<Value = Vec<(usize, f64, f64)>> {
    prop::collection::vec((0usize..KINDS.len(), 0.0f64..1.0, 0.0f64..1.0), 0..80)
}

fn shape() -> impl Strategy<Value = DecayShape> {
    prop::sample::select(vec![
        DecayShape::Linear,
        DecayShape::Quadratic,
        DecayShape::Cosine,
    ])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn every_cell_ranked_exactly_once(raw in pois(), target in 0usize..4) {
        let grid = grid();
        let catalogue = catalogue(&raw);
        let poi_type = [PoiKind::Atm, PoiKind::Bank, PoiKind::Hospital, PoiKind::Mall][target];

        let run = ScoringEngine::default().run(poi_type, &grid, &catalogue, None).unwrap();
        let table = run.ranked;

        prop_assert_eq!(table.len(), grid.len());
        let ids: BTreeSet<CellId> = table.entries.iter().map(|e| e.cell_id).collect();
        prop_assert_eq!(ids.len(), grid.len());

        for (position, entry) in table.entries.iter().enumerate() {
            prop_assert_eq!(entry.rank, position + 1);
        }
    }

    #[test]
    fn scores_are_bounded_or_flagged(raw in pois()) {
        let grid = grid();
        let catalogue = catalogue(&raw);
        let run = ScoringEngine::default().run(PoiKind::Atm, &grid, &catalogue, None).unwrap();

        let mut seen_undetermined = false;
        for entry in &run.ranked.entries {
            match entry.score.value() {
                Some(v) => {
                    prop_assert!(!seen_undetermined, "scored cell ranked after an undetermined one");
                    prop_assert!((0.0..=1.0).contains(&v), "score {} out of range", v);
                    prop_assert!((entry.effective_weights.sum() - 1.0).abs() < WEIGHT_EPSILON);
                    if entry.disqualified {
                        prop_assert!(v.abs() < f64::EPSILON);
                    }
                }
                None => {
                    seen_undetermined = true;
                    prop_assert!(entry.is_undetermined());
                }
            }
        }

        let top = run.ranked.top(5);
        prop_assert!(top.iter().all(|e| !e.is_undetermined() && !e.disqualified));
    }

    #[test]
    fn renormalized_weights_sum_to_one(
        raw in prop::array::uniform5(0.0f64..1.0),
        keep in prop::array::uniform5(any::<bool>()),
    ) {
        let total: f64 = raw.iter().sum();
        prop_assume!(total > 1e-3);
        let weights = ScoreWeights::new(
            raw[0] / total,
            raw[1] / total,
            raw[2] / total,
            raw[3] / total,
            raw[4] / total,
        ).unwrap();

        let kinds = locate_scoring_models::FactorKind::ALL;
        let kept: f64 = kinds
            .iter()
            .zip(keep)
            .filter(|(_, k)| *k)
            .map(|(kind, _)| weights.get(*kind))
            .sum();
        prop_assume!(kept > 1e-6);

        let renormalized = weights.renormalized(|kind| {
            kinds.iter().position(|k| *k == kind).is_some_and(|i| keep[i])
        });
        prop_assert!((renormalized.sum() - 1.0).abs() < WEIGHT_EPSILON);
    }

    #[test]
    fn penalty_is_non_increasing_in_distance(
        saturation in 0.0f64..3.0,
        falloff in 0.0f64..3.0,
        shape in shape(),
        a in 0.0f64..10.0,
        b in 0.0f64..10.0,
    ) {
        let config = PenaltyConfig {
            saturation_radius_km: saturation,
            falloff_km: falloff,
            shape,
            competitor_kinds: vec![],
        };
        let (near, far) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(config.penalty(near) + 1e-12 >= config.penalty(far));

        prop_assert!((config.penalty(saturation) - 1.0).abs() < f64::EPSILON);
        prop_assert!(config.penalty(saturation + falloff + 1e-9).abs() < f64::EPSILON);
        let p = config.penalty(a);
        prop_assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn growth_classification_is_idempotent(
        snapshots in prop::collection::vec(
            (prop::option::of(0.0f64..50.0), prop::option::of(0.0f64..50.0)),
            0..30,
        ),
    ) {
        let grid = grid();
        let inputs = GrowthInputs::new(
            grid.cells()
                .iter()
                .zip(snapshots)
                .map(|(cell, (baseline, recent))| (cell.id, DensitySnapshot { baseline, recent })),
        );
        let classifier = GrowthClassifier::default();
        let first = classifier.classify(&grid, &inputs);
        let second = classifier.classify(&grid, &inputs);

        prop_assert_eq!(first.len(), grid.len());
        prop_assert_eq!(first, second);
    }
}

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use trackgeff::model::{
    Detection, DetectionId, Dimension, FeatureDeclaration, FeatureScope, Link, Polygon, Rgba,
    TrackingModel, ValueKind,
};

pub const EPS: f64 = 1e-9;

pub const INT_FEATURE: &str = "N_SPOTS";
pub const REAL_FEATURE: &str = "MEAN_INTENSITY";

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

fn arb_coord() -> impl Strategy<Value = f64> {
    -1.0e4..1.0e4f64
}

fn arb_polygon() -> impl Strategy<Value = Polygon> {
    prop::collection::vec((-50.0..50.0f64, -50.0..50.0f64), 1..6)
        .prop_map(|points| Polygon::new(points.into_iter().map(|(x, y)| [x, y])))
}

fn arb_color() -> impl Strategy<Value = Rgba> {
    any::<[u8; 4]>().prop_map(|[r, g, b, a]| Rgba::from_rgba8(r, g, b, a))
}

/// Detection fields other than the id.
#[derive(Clone, Debug)]
struct DetectionParts {
    position: [f64; 3],
    frame: u32,
    radius: f64,
    color: Option<Rgba>,
    polygon: Option<Polygon>,
    int_feature: Option<i32>,
    real_feature: Option<f64>,
}

fn arb_detection_parts(planar: bool) -> impl Strategy<Value = DetectionParts> {
    let z = if planar {
        Just(0.0).boxed()
    } else {
        arb_coord().boxed()
    };
    (
        (arb_coord(), arb_coord(), z),
        0u32..500,
        0.0..20.0f64,
        prop::option::of(arb_color()),
        prop::option::weighted(0.3, arb_polygon()),
        prop::option::of(-1000i32..1000),
        prop::option::of(-1.0e6..1.0e6f64),
    )
        .prop_map(
            |((x, y, z), frame, radius, color, polygon, int_feature, real_feature)| DetectionParts {
                position: [x, y, z],
                frame,
                radius,
                color,
                polygon,
                int_feature,
                real_feature,
            },
        )
}

/// A model with unique detection ids, links between existing detections,
/// no tracks, and one integer and one real node feature that some
/// detections lack.
pub fn arb_model(max_detections: usize, max_links: usize, planar: bool) -> BoxedStrategy<TrackingModel> {
    (
        prop::collection::btree_set(-10_000i64..10_000, 0..=max_detections),
        prop::collection::vec(arb_detection_parts(planar), max_detections),
    )
        .prop_flat_map(move |(ids, parts)| {
            let ids: Vec<i64> = ids.into_iter().collect();
            let count = ids.len();
            let links = if count == 0 {
                Just(Vec::new()).boxed()
            } else {
                prop::collection::vec((0..count, 0..count, 0.0..1.0e4f64), 0..=max_links).boxed()
            };
            (Just(ids), Just(parts), links)
        })
        .prop_map(|(ids, parts, raw_links)| {
            let mut model = TrackingModel::new("micron", "sec");
            model.features.declare(
                FeatureScope::Node,
                FeatureDeclaration::new(INT_FEATURE, "Spots", "N", Dimension::Count, ValueKind::Int),
            );
            model.features.declare(
                FeatureScope::Node,
                FeatureDeclaration::new(
                    REAL_FEATURE,
                    "Mean intensity",
                    "Mean",
                    Dimension::Intensity,
                    ValueKind::Real,
                ),
            );

            model.detections = ids
                .iter()
                .zip(parts)
                .map(|(&id, p)| {
                    let mut detection = Detection::new(id, p.position, p.frame, p.radius);
                    detection.color = p.color;
                    detection.polygon = p.polygon;
                    if let Some(v) = p.int_feature {
                        detection.features.insert(INT_FEATURE.into(), f64::from(v));
                    }
                    if let Some(v) = p.real_feature {
                        detection.features.insert(REAL_FEATURE.into(), v);
                    }
                    detection
                })
                .collect();

            model.links = raw_links
                .into_iter()
                .enumerate()
                .map(|(k, (s, t, weight))| Link::new(k as i64, ids[s], ids[t], weight))
                .collect();
            model
        })
        .boxed()
}

/// Connected components of the link graph as sets of detection ids,
/// computed with a plain union-find so it does not share code with the
/// codec.
pub fn expected_partition(model: &TrackingModel) -> BTreeSet<BTreeSet<i64>> {
    let index: BTreeMap<DetectionId, usize> = model
        .detections
        .iter()
        .enumerate()
        .map(|(i, d)| (d.id, i))
        .collect();
    let mut parent: Vec<usize> = (0..model.detections.len()).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for link in &model.links {
        if let (Some(&a), Some(&b)) = (index.get(&link.source), index.get(&link.target)) {
            let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
            parent[ra] = rb;
        }
    }

    let mut groups: BTreeMap<usize, BTreeSet<i64>> = BTreeMap::new();
    for (i, detection) in model.detections.iter().enumerate() {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().insert(detection.id.as_i64());
    }
    groups.into_values().collect()
}

pub fn actual_partition(model: &TrackingModel) -> BTreeSet<BTreeSet<i64>> {
    model
        .tracks
        .iter()
        .map(|t| t.detections.iter().map(|d| d.as_i64()).collect())
        .collect()
}

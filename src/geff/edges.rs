//! Edge columns: one row per link.
//!
//! The model stores a link weight equal to the squared distance between
//! its endpoints; the store holds the distance itself. Export writes
//! `sqrt(weight)` and import squares it back.

use super::bridge::IdBridge;
use super::columns::{self, ids_path, prop_path};
use super::SCORE_UNUSED;
use crate::error::{GeffError, Phase};
use crate::model::{Detection, Link, LinkId, TrackingModel};
use crate::report::{CodecIssue, CodecIssueCode, CodecReport};
use crate::store::{Array, ArrayStore};

const ENTITY: &str = "edges";

/// Columnar form of the resolvable links of a model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeColumns {
    pub ids: Vec<i64>,
    pub source: Vec<i64>,
    pub target: Vec<i64>,
    pub score: Vec<f64>,
    pub distance: Vec<f64>,
    /// Index in the model's link list of each row.
    pub rows: Vec<usize>,
}

impl EdgeColumns {
    /// Encodes the links of `model` in order with sequential edge ids.
    ///
    /// Links whose endpoints are not in `bridge` are skipped and recorded in
    /// `report` as one aggregated warning.
    pub fn encode(model: &TrackingModel, bridge: &IdBridge, report: &mut CodecReport) -> Self {
        let mut columns = Self::default();
        let mut skipped = 0;

        for (index, link) in model.links.iter().enumerate() {
            let (Some(source), Some(target)) = (
                bridge.to_store_id(link.source),
                bridge.to_store_id(link.target),
            ) else {
                tracing::debug!(
                    "link {} ({} -> {}) has an unresolved endpoint",
                    link.id,
                    link.source,
                    link.target
                );
                skipped += 1;
                continue;
            };

            columns.ids.push(columns.rows.len() as i64);
            columns.source.push(source);
            columns.target.push(target);
            columns.score.push(link.score.unwrap_or(SCORE_UNUSED));
            columns.distance.push(link.weight.sqrt());
            columns.rows.push(index);
        }

        report.record_skipped_links(skipped);
        columns
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn write<S: ArrayStore + ?Sized>(&self, store: &mut S, group: &str) -> Result<(), GeffError> {
        let phase = Phase::Edges;
        columns::write(store, phase, &ids_path(group, ENTITY), &Array::from_i64(self.ids.clone()))?;
        for (name, values) in [("source", &self.source), ("target", &self.target)] {
            columns::write(
                store,
                phase,
                &prop_path(group, ENTITY, name),
                &Array::from_i64(values.clone()),
            )?;
        }
        for (name, values) in [("score", &self.score), ("distance", &self.distance)] {
            columns::write(
                store,
                phase,
                &prop_path(group, ENTITY, name),
                &Array::from_f64(values.clone()),
            )?;
        }

        tracing::debug!("wrote {} edge(s)", self.len());
        Ok(())
    }
}

/// Links rebuilt from the edge columns of a store.
#[derive(Clone, Debug, Default)]
pub struct ImportedLinks {
    pub links: Vec<Link>,
    /// Store row of each link, for aligning edge features.
    pub rows: Vec<usize>,
    /// Number of rows in the store.
    pub total: usize,
}

/// Rebuilds links from the edge columns of `group`.
///
/// `source` and `target` are required. Rows with an endpoint missing from
/// `bridge` are skipped and counted once in `report`. Without a `distance`
/// column the weight is the squared distance between the endpoints.
pub fn read_links<S: ArrayStore + ?Sized>(
    store: &S,
    group: &str,
    detections: &[Detection],
    bridge: &IdBridge,
    report: &mut CodecReport,
) -> Result<ImportedLinks, GeffError> {
    let phase = Phase::Edges;
    let prop = |name: &str| prop_path(group, ENTITY, name);

    let source = columns::require(store, phase, &prop("source"), "source")?;
    let target = columns::require(store, phase, &prop("target"), "target")?;
    let total = source.rows();
    let source = columns::integers(phase, "source", &source, total)?;
    let target = columns::integers(phase, "target", &target, total)?;

    let mut missing = Vec::new();
    let ids = match columns::read(store, phase, &ids_path(group, ENTITY))? {
        Some(array) => columns::integers(phase, "ids", &array, total)?,
        None => {
            missing.push("ids");
            (0..total as i64).collect()
        }
    };
    check_unique(&ids)?;
    let score = match columns::read(store, phase, &prop("score"))? {
        Some(array) => Some(columns::reals(phase, "score", &array, total)?),
        None => None,
    };
    let distance = match columns::read(store, phase, &prop("distance"))? {
        Some(array) => Some(columns::reals(phase, "distance", &array, total)?),
        None => {
            missing.push("distance");
            None
        }
    };
    if !missing.is_empty() {
        report.add(CodecIssue::info(
            CodecIssueCode::MissingOptionalColumn,
            format!(
                "edge column(s) absent, defaults used: {}",
                missing.join(", ")
            ),
        ));
    }

    let mut imported = ImportedLinks {
        total,
        ..Default::default()
    };
    let mut skipped = 0;
    for row in 0..total {
        let (Some(s), Some(t)) = (
            bridge.to_detection_handle(source[row]),
            bridge.to_detection_handle(target[row]),
        ) else {
            skipped += 1;
            continue;
        };

        let weight = match &distance {
            Some(distance) => distance[row] * distance[row],
            None => squared_distance(&detections[s], &detections[t]),
        };
        let mut link = Link::new(
            LinkId(ids[row]),
            detections[s].id,
            detections[t].id,
            weight,
        );
        link.score = score
            .as_ref()
            .map(|score| score[row])
            .filter(|&v| !v.is_nan() && v != SCORE_UNUSED);

        imported.links.push(link);
        imported.rows.push(row);
    }
    report.record_skipped_links(skipped);

    tracing::debug!("read {} of {} edge(s)", imported.links.len(), total);
    Ok(imported)
}

fn squared_distance(a: &Detection, b: &Detection) -> f64 {
    a.position
        .iter()
        .zip(&b.position)
        .map(|(p, q)| (p - q) * (p - q))
        .sum()
}

fn check_unique(ids: &[i64]) -> Result<(), GeffError> {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    match sorted.windows(2).find(|w| w[0] == w[1]) {
        Some(w) => Err(GeffError::InvalidColumn {
            phase: Phase::Edges,
            column: "ids".to_string(),
            message: format!("duplicate edge id {}", w[0]),
        }),
        None => Ok(()),
    }
}

//! Model → store.

use std::path::Path;

use super::axes::{build_axes, compute_bounds};
use super::bridge::IdBridge;
use super::edges::EdgeColumns;
use super::features::{declare_features, write_values};
use super::metadata::GeffMetadata;
use super::nodes::NodeColumns;
use super::polygon::PolygonColumns;
use super::tracks::TrackTable;
use super::ExportOptions;
use crate::error::{GeffError, Phase};
use crate::model::{FeatureScope, TrackingModel};
use crate::report::{CodecCounts, CodecIssue, CodecIssueCode, CodecReport, Direction};
use crate::store::{ArrayStore, DirectoryStore};

/// Writes `model` under `options.group` of `store`.
///
/// Anything already under the group is replaced. Phases run in order:
/// feature declarations, nodes, edges, tracks, feature values, and the
/// metadata document last. A failure aborts the call and leaves the group
/// without metadata.
///
/// # Errors
/// - [`GeffError::InvalidGroup`] when `options.group` names the store root.
/// - [`GeffError::InvalidModel`] for duplicate detection ids, frames past
///   the 32-bit range, or feature keys that cannot name a store path.
/// - [`GeffError::Store`] when the store fails, tagged with the phase.
pub fn export<S: ArrayStore + ?Sized>(
    model: &TrackingModel,
    store: &mut S,
    options: &ExportOptions,
) -> Result<CodecReport, GeffError> {
    let group = options.group.as_str();
    if group.split('/').all(|segment| segment.trim().is_empty()) {
        return Err(GeffError::InvalidGroup(options.group.clone()));
    }
    let mut report = CodecReport::new(Direction::Export, group);
    report.input = CodecCounts {
        detections: model.detections.len(),
        links: model.links.len(),
        tracks: model.tracks.len(),
    };

    let bridge = IdBridge::for_export(&model.detections)?;

    if options.is_2d && !model.is_planar() {
        let message = "2D export of detections with non-zero z: z dropped";
        tracing::warn!("{}", message);
        report.add(CodecIssue::warning(CodecIssueCode::DropZCoordinate, message));
    }

    store.remove(group).map_err(GeffError::store(Phase::Metadata))?;
    store
        .create_group(group)
        .map_err(GeffError::store(Phase::Metadata))?;

    declare_features(store, group, &model.features)?;

    let membership = model.track_membership();
    NodeColumns::encode(&model.detections, &membership, options.is_2d)?.write(store, group)?;
    if let Some(polygons) = PolygonColumns::encode(&model.detections) {
        polygons.write(store, group)?;
    }

    let edges = EdgeColumns::encode(model, &bridge, &mut report);
    edges.write(store, group)?;

    TrackTable::from_model(model).write(store, group)?;

    write_values(
        store,
        group,
        FeatureScope::Node,
        &model.features.node,
        model.detections.iter().map(|d| &d.features),
        &mut report,
    )?;
    write_values(
        store,
        group,
        FeatureScope::Edge,
        &model.features.edge,
        edges.rows.iter().map(|&row| &model.links[row].features),
        &mut report,
    )?;
    write_values(
        store,
        group,
        FeatureScope::Track,
        &model.features.track,
        model.tracks.iter().map(|t| &t.features),
        &mut report,
    )?;

    let bounds = compute_bounds(&model.detections);
    if bounds.is_empty() {
        report.add(CodecIssue::info(
            CodecIssueCode::EmptyBoundingBox,
            "no detections: axis bounds left undefined",
        ));
    }
    let axes = build_axes(&bounds, &model.space_units, &model.time_units, options.is_2d);
    GeffMetadata::new(axes).write(store, group)?;

    report.output = CodecCounts {
        detections: model.detections.len(),
        links: edges.len(),
        tracks: model.tracks.len(),
    };
    tracing::info!(
        "exported {} detection(s), {} link(s), {} track(s) to '{}'",
        report.output.detections,
        report.output.links,
        report.output.tracks,
        group
    );
    Ok(report)
}

/// Writes `model` to a directory store at `path`.
pub fn export_to_path(
    model: &TrackingModel,
    path: impl AsRef<Path>,
    options: &ExportOptions,
) -> Result<CodecReport, GeffError> {
    let mut store = DirectoryStore::open(path.as_ref()).with_chunk_size(options.chunk_size);
    export(model, &mut store, options)
}

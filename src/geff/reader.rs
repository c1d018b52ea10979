//! Store → model, plus a lightweight store summary.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use super::axes::Axis;
use super::bridge::IdBridge;
use super::columns::{self, ids_path, prop_path};
use super::edges::read_links;
use super::features::{read_declarations, read_scope};
use super::metadata::{GeffMetadata, GEFF_VERSION};
use super::nodes::read_detections;
use super::polygon::PolygonColumns;
use super::tracks::{assign_tracks, partition, restore_attributes, TrackTable};
use super::ImportOptions;
use crate::error::{GeffError, Phase};
use crate::model::{FeatureSchema, FeatureScope, TrackingModel};
use crate::report::{CodecCounts, CodecIssue, CodecIssueCode, CodecReport, Direction};
use crate::store::{ArrayStore, DirectoryStore};

/// Reads the group `options.group` of `store` into a fresh model.
///
/// Tracks are rebuilt from the connected components of the links, with
/// ids starting at `options.track_id_base`. Links with an unresolved
/// endpoint are skipped and counted in the report.
///
/// # Errors
/// - [`GeffError::MetadataMissing`] / [`GeffError::MetadataInvalid`] when
///   the group has no usable metadata document.
/// - [`GeffError::MissingColumn`] when node `x`/`y`/`t` or edge
///   `source`/`target` are absent.
/// - [`GeffError::InvalidColumn`] for columns of the wrong type or length.
/// - [`GeffError::Store`] when the store fails, tagged with the phase.
pub fn import<S: ArrayStore + ?Sized>(
    store: &S,
    options: &ImportOptions,
) -> Result<(TrackingModel, CodecReport), GeffError> {
    let group = options.group.as_str();
    let mut report = CodecReport::new(Direction::Import, group);

    let metadata = GeffMetadata::read(store, group)?;
    if !metadata.is_known_version() {
        let message = format!(
            "format version '{}' is not {}; reading known columns only",
            metadata.geff_version, GEFF_VERSION
        );
        tracing::warn!("{}", message);
        report.add(CodecIssue::warning(
            CodecIssueCode::UnknownFormatVersion,
            message,
        ));
    }

    let mut model = TrackingModel::new(
        metadata.space_unit().unwrap_or_default(),
        metadata.time_unit().unwrap_or_default(),
    );

    model.detections = read_detections(store, group, &mut report)?;
    let rows = model.detections.len();
    let node_ids: Vec<i64> = model.detections.iter().map(|d| d.id.as_i64()).collect();
    let bridge = IdBridge::for_import(&node_ids)?;

    if let Some(polygons) = PolygonColumns::read(store, group, rows)? {
        for (detection, polygon) in model.detections.iter_mut().zip(polygons.decode(&mut report)) {
            if let Some(polygon) = polygon {
                detection.attach_polygon(polygon);
            }
        }
    }

    let node_features = read_scope(store, group, FeatureScope::Node, rows, &mut report)?;
    for (row, detection) in model.detections.iter_mut().enumerate() {
        node_features.fill(row, &mut detection.features);
    }
    node_features.declare_into(FeatureScope::Node, &mut model.features);

    let imported = read_links(store, group, &model.detections, &bridge, &mut report)?;
    let edge_features = read_scope(store, group, FeatureScope::Edge, imported.total, &mut report)?;
    model.links = imported.links;
    for (link, &row) in model.links.iter_mut().zip(&imported.rows) {
        edge_features.fill(row, &mut link.features);
    }
    edge_features.declare_into(FeatureScope::Edge, &mut model.features);

    let endpoints: Vec<(usize, usize)> = model
        .links
        .iter()
        .filter_map(|link| {
            Some((
                bridge.to_detection_handle(link.source.as_i64())?,
                bridge.to_detection_handle(link.target.as_i64())?,
            ))
        })
        .collect();
    let components = partition(rows, &endpoints);
    model.tracks = assign_tracks(
        &components,
        &model.detections,
        &model.links,
        options.track_id_base,
    );

    let table = TrackTable::read(store, group)?;
    let persisted_tracks = table.as_ref().map_or(0, TrackTable::len);
    match &table {
        Some(table) => {
            let track_features =
                read_scope(store, group, FeatureScope::Track, table.len(), &mut report)?;
            track_features.declare_into(FeatureScope::Track, &mut model.features);
            let restored = restore_attributes(
                &mut model.tracks,
                &model.detections,
                table,
                &track_features,
                options.restore_track_attributes,
            );
            tracing::debug!("restored attributes of {} track(s)", restored);
        }
        None => {
            for declaration in read_declarations(store, group, FeatureScope::Track)? {
                model.features.declare(FeatureScope::Track, declaration);
            }
        }
    }

    if !model.tracks.is_empty() {
        report.add(CodecIssue::info(
            CodecIssueCode::TrackIdAssignment,
            format!(
                "{} track(s) rebuilt from connected components with ids {}..={}",
                model.tracks.len(),
                options.track_id_base,
                i64::from(options.track_id_base) + model.tracks.len() as i64 - 1
            ),
        ));
    }

    report.input = CodecCounts {
        detections: rows,
        links: imported.total,
        tracks: persisted_tracks,
    };
    report.output = CodecCounts {
        detections: model.detections.len(),
        links: model.links.len(),
        tracks: model.tracks.len(),
    };
    tracing::info!(
        "imported {} detection(s), {} link(s), {} track(s) from '{}'",
        report.output.detections,
        report.output.links,
        report.output.tracks,
        group
    );
    Ok((model, report))
}

/// Reads a directory store at `path`.
pub fn import_from_path(
    path: impl AsRef<Path>,
    options: &ImportOptions,
) -> Result<(TrackingModel, CodecReport), GeffError> {
    let store = DirectoryStore::open(path.as_ref());
    import(&store, options)
}

/// What a store holds, read without rebuilding a model.
#[derive(Clone, Debug, Serialize)]
pub struct StoreSummary {
    pub group: String,
    pub geff_version: String,
    pub known_version: bool,
    pub directed: bool,
    pub axes: Vec<Axis>,
    pub detections: usize,
    pub links: usize,
    pub tracks: usize,
    pub features: FeatureSchema,
    pub has_polygons: bool,
}

impl StoreSummary {
    /// Returns true if the store has no z axis.
    pub fn is_2d(&self) -> bool {
        !self
            .axes
            .iter()
            .any(|a| a.name.trim().eq_ignore_ascii_case("z"))
    }
}

/// Summarizes the group `group` of `store`.
pub fn inspect<S: ArrayStore + ?Sized>(store: &S, group: &str) -> Result<StoreSummary, GeffError> {
    let metadata = GeffMetadata::read(store, group)?;

    let rows = |phase: Phase, path: String| -> Result<usize, GeffError> {
        Ok(columns::read(store, phase, &path)?.map_or(0, |a| a.rows()))
    };
    let detections = rows(Phase::Nodes, prop_path(group, "nodes", "x"))?;
    let links = rows(Phase::Edges, prop_path(group, "edges", "source"))?;
    let tracks = rows(Phase::Tracks, ids_path(group, "tracks"))?;

    let mut features = FeatureSchema::default();
    for scope in FeatureScope::ALL {
        for declaration in read_declarations(store, group, scope)? {
            features.declare(scope, declaration);
        }
    }

    Ok(StoreSummary {
        group: group.to_string(),
        known_version: metadata.is_known_version(),
        geff_version: metadata.geff_version,
        directed: metadata.directed,
        axes: metadata.axes,
        detections,
        links,
        tracks,
        features,
        has_polygons: store.contains_array(&prop_path(group, "nodes", "polygon_x")),
    })
}

/// Summarizes the group `group` of a directory store at `path`.
pub fn inspect_path(path: impl AsRef<Path>, group: &str) -> Result<StoreSummary, GeffError> {
    inspect(&DirectoryStore::open(path.as_ref()), group)
}

impl fmt::Display for StoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Group:       {}", self.group)?;
        write!(f, "Version:     {}", self.geff_version)?;
        if !self.known_version {
            write!(f, " (unknown)")?;
        }
        writeln!(f)?;
        writeln!(f, "Directed:    {}", self.directed)?;
        writeln!(f, "Dimensions:  {}", if self.is_2d() { "2D" } else { "3D" })?;
        writeln!(f)?;

        writeln!(f, "Axes:")?;
        for axis in &self.axes {
            let unit = axis.unit.as_deref().unwrap_or("-");
            match (axis.min, axis.max) {
                (Some(min), Some(max)) => {
                    writeln!(f, "  {:<4} {:<12} [{}, {}]", axis.name, unit, min, max)?
                }
                _ => writeln!(f, "  {:<4} {:<12} (no data)", axis.name, unit)?,
            }
        }
        writeln!(f)?;

        writeln!(f, "Detections:  {}", self.detections)?;
        writeln!(f, "Links:       {}", self.links)?;
        writeln!(f, "Tracks:      {}", self.tracks)?;
        writeln!(f, "Polygons:    {}", if self.has_polygons { "yes" } else { "no" })?;

        if !self.features.is_empty() {
            writeln!(f)?;
            writeln!(f, "Features:")?;
            for scope in FeatureScope::ALL {
                for declaration in self.features.declarations(scope) {
                    writeln!(
                        f,
                        "  {:<6} {:<24} {:?}",
                        scope.to_string(),
                        declaration.key,
                        declaration.kind
                    )?;
                }
            }
        }
        Ok(())
    }
}

//! Node columns: one row per detection.

use std::collections::HashMap;

use super::columns::{self, ids_path, prop_path};
use super::SEGMENT_UNASSIGNED;
use crate::error::{GeffError, Phase};
use crate::model::{Detection, DetectionId, Rgba, TrackId};
use crate::report::{CodecIssue, CodecIssueCode, CodecReport};
use crate::store::{Array, ArrayStore};

const ENTITY: &str = "nodes";

/// Radius given to detections read from a store without a radius column.
pub const DEFAULT_RADIUS: f64 = 1.0;

/// Columnar form of a detection list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeColumns {
    pub ids: Vec<i64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Absent for 2D data.
    pub z: Option<Vec<f64>>,
    pub t: Vec<i32>,
    pub radius: Vec<f64>,
    /// Row-major `n × 4` RGBA.
    pub color: Vec<f64>,
    pub segment_id: Vec<i64>,
}

impl NodeColumns {
    /// Encodes `detections` in order.
    ///
    /// `membership` resolves the track of each detection; untracked ones get
    /// [`SEGMENT_UNASSIGNED`].
    ///
    /// # Errors
    /// [`GeffError::InvalidModel`] if a frame does not fit a 32-bit column.
    pub fn encode(
        detections: &[Detection],
        membership: &HashMap<DetectionId, TrackId>,
        is_2d: bool,
    ) -> Result<Self, GeffError> {
        let n = detections.len();
        let mut columns = Self {
            ids: Vec::with_capacity(n),
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            z: (!is_2d).then(|| Vec::with_capacity(n)),
            t: Vec::with_capacity(n),
            radius: Vec::with_capacity(n),
            color: Vec::with_capacity(4 * n),
            segment_id: Vec::with_capacity(n),
        };

        for detection in detections {
            let frame = i32::try_from(detection.frame).map_err(|_| {
                GeffError::InvalidModel(format!(
                    "detection {} has frame {} beyond the 32-bit range",
                    detection.id, detection.frame
                ))
            })?;

            columns.ids.push(detection.id.as_i64());
            columns.x.push(detection.x());
            columns.y.push(detection.y());
            if let Some(z) = columns.z.as_mut() {
                z.push(detection.z());
            }
            columns.t.push(frame);
            columns.radius.push(detection.radius);
            columns
                .color
                .extend(detection.color.unwrap_or_else(Rgba::default_detection).0);
            columns.segment_id.push(
                membership
                    .get(&detection.id)
                    .map_or(SEGMENT_UNASSIGNED, TrackId::as_i64),
            );
        }
        Ok(columns)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn write<S: ArrayStore + ?Sized>(&self, store: &mut S, group: &str) -> Result<(), GeffError> {
        let phase = Phase::Nodes;
        let color = Array::matrix_f64(4, self.color.clone()).map_err(GeffError::store(phase))?;

        columns::write(store, phase, &ids_path(group, ENTITY), &Array::from_i64(self.ids.clone()))?;
        for (name, values) in [("x", &self.x), ("y", &self.y)] {
            columns::write(store, phase, &prop(group, name), &Array::from_f64(values.clone()))?;
        }
        if let Some(z) = &self.z {
            columns::write(store, phase, &prop(group, "z"), &Array::from_f64(z.clone()))?;
        }
        columns::write(store, phase, &prop(group, "t"), &Array::from_i32(self.t.clone()))?;
        columns::write(
            store,
            phase,
            &prop(group, "radius"),
            &Array::from_f64(self.radius.clone()),
        )?;
        columns::write(store, phase, &prop(group, "color"), &color)?;
        columns::write(
            store,
            phase,
            &prop(group, "segment_id"),
            &Array::from_i64(self.segment_id.clone()),
        )?;

        tracing::debug!("wrote {} node(s)", self.len());
        Ok(())
    }
}

fn prop(group: &str, name: &str) -> String {
    prop_path(group, ENTITY, name)
}

/// Rebuilds detections from the node columns of `group`, in row order.
///
/// `x`, `y` and `t` are required. Other columns fall back to defaults:
/// row indices for ids, zero for z, [`DEFAULT_RADIUS`], the default
/// detection color, and no segment hint. Missing optional columns are
/// reported in one note.
pub fn read_detections<S: ArrayStore + ?Sized>(
    store: &S,
    group: &str,
    report: &mut CodecReport,
) -> Result<Vec<Detection>, GeffError> {
    let phase = Phase::Nodes;

    let x = columns::require(store, phase, &prop(group, "x"), "x")?;
    let y = columns::require(store, phase, &prop(group, "y"), "y")?;
    let t = columns::require(store, phase, &prop(group, "t"), "t")?;
    let rows = x.rows();

    let x = columns::reals(phase, "x", &x, rows)?;
    let y = columns::reals(phase, "y", &y, rows)?;
    let t = frames(&columns::integers(phase, "t", &t, rows)?)?;

    let mut missing = Vec::new();

    let ids = match columns::read(store, phase, &ids_path(group, ENTITY))? {
        Some(array) => columns::integers(phase, "ids", &array, rows)?,
        None => {
            missing.push("ids");
            (0..rows as i64).collect()
        }
    };
    let z = match columns::read(store, phase, &prop(group, "z"))? {
        Some(array) => Some(columns::reals(phase, "z", &array, rows)?),
        None => None,
    };
    let radius = match columns::read(store, phase, &prop(group, "radius"))? {
        Some(array) => columns::reals(phase, "radius", &array, rows)?,
        None => {
            missing.push("radius");
            vec![DEFAULT_RADIUS; rows]
        }
    };
    let color = match columns::read(store, phase, &prop(group, "color"))? {
        Some(array) => {
            columns::check_shape(phase, "color", &array, rows, 4)?;
            Some(array.to_f64_vec())
        }
        None => {
            missing.push("color");
            None
        }
    };
    let segment_id = match columns::read(store, phase, &prop(group, "segment_id"))? {
        Some(array) => Some(columns::integers(phase, "segment_id", &array, rows)?),
        None => {
            missing.push("segment_id");
            None
        }
    };

    if !missing.is_empty() {
        report.add(CodecIssue::info(
            CodecIssueCode::MissingOptionalColumn,
            format!("node column(s) absent, defaults used: {}", missing.join(", ")),
        ));
    }

    let detections = (0..rows)
        .map(|row| {
            let position = [x[row], y[row], z.as_ref().map_or(0.0, |z| z[row])];
            let mut detection = Detection::new(ids[row], position, t[row], radius[row]);
            detection.color = Some(match &color {
                Some(color) => Rgba([
                    color[4 * row],
                    color[4 * row + 1],
                    color[4 * row + 2],
                    color[4 * row + 3],
                ]),
                None => Rgba::default_detection(),
            });
            detection.track_hint = segment_id
                .as_ref()
                .map(|s| s[row])
                .filter(|&s| s != SEGMENT_UNASSIGNED);
            detection
        })
        .collect::<Vec<_>>();

    tracing::debug!("read {} node(s)", detections.len());
    Ok(detections)
}

fn frames(values: &[i64]) -> Result<Vec<u32>, GeffError> {
    values
        .iter()
        .map(|&t| {
            u32::try_from(t).map_err(|_| GeffError::InvalidColumn {
                phase: Phase::Nodes,
                column: "t".to_string(),
                message: format!("frame {} is not a non-negative 32-bit integer", t),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Direction;
    use crate::store::MemoryStore;

    fn detections() -> Vec<Detection> {
        vec![
            Detection::new(5, [1.0, 2.0, 3.0], 0, 0.5).with_color(Rgba::new(1.0, 0.0, 0.0, 1.0)),
            Detection::new(9, [4.0, 5.0, 6.0], 2, 1.5),
        ]
    }

    #[test]
    fn encode_resolves_segments_and_defaults() {
        let membership = HashMap::from([(DetectionId(9), TrackId(3))]);
        let columns = NodeColumns::encode(&detections(), &membership, false).unwrap();

        assert_eq!(columns.ids, vec![5, 9]);
        assert_eq!(columns.z, Some(vec![3.0, 6.0]));
        assert_eq!(columns.t, vec![0, 2]);
        assert_eq!(columns.segment_id, vec![-1, 3]);
        assert_eq!(&columns.color[4..], &Rgba::default_detection().0);
    }

    #[test]
    fn planar_encoding_has_no_z() {
        let columns = NodeColumns::encode(&detections(), &HashMap::new(), true).unwrap();
        assert!(columns.z.is_none());

        let mut store = MemoryStore::new();
        columns.write(&mut store, "g").unwrap();
        assert!(!store.contains_array("g/nodes/props/z/values"));
        assert!(store.contains_array("g/nodes/props/x/values"));
    }

    #[test]
    fn frame_out_of_range_is_rejected() {
        let detections = [Detection::new(1, [0.0; 3], u32::MAX, 1.0)];
        assert!(matches!(
            NodeColumns::encode(&detections, &HashMap::new(), true),
            Err(GeffError::InvalidModel(_))
        ));
    }

    #[test]
    fn detections_survive_the_store() {
        let original = detections();
        let membership = HashMap::from([(DetectionId(5), TrackId(0))]);
        let mut store = MemoryStore::new();
        NodeColumns::encode(&original, &membership, false)
            .unwrap()
            .write(&mut store, "g")
            .unwrap();

        let mut report = CodecReport::new(Direction::Import, "g");
        let read = read_detections(&store, "g", &mut report).unwrap();

        assert_eq!(read.len(), 2);
        assert_eq!(read[0].id, DetectionId(5));
        assert_eq!(read[0].position, [1.0, 2.0, 3.0]);
        assert_eq!(read[0].color, original[0].color);
        assert_eq!(read[0].track_hint, Some(0));
        assert_eq!(read[1].frame, 2);
        assert_eq!(read[1].radius, 1.5);
        assert_eq!(read[1].track_hint, None);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn minimal_store_uses_defaults() {
        let mut store = MemoryStore::new();
        store
            .write_array("g/nodes/props/x/values", &Array::from_f64(vec![1.0, 2.0]))
            .unwrap();
        store
            .write_array("g/nodes/props/y/values", &Array::from_f64(vec![3.0, 4.0]))
            .unwrap();
        store
            .write_array("g/nodes/props/t/values", &Array::from_i64(vec![0, 1]))
            .unwrap();

        let mut report = CodecReport::new(Direction::Import, "g");
        let read = read_detections(&store, "g", &mut report).unwrap();

        assert_eq!(read[1].id, DetectionId(1));
        assert_eq!(read[1].z(), 0.0);
        assert_eq!(read[1].radius, DEFAULT_RADIUS);
        assert_eq!(read[1].color, Some(Rgba::default_detection()));
        assert!(report.has(CodecIssueCode::MissingOptionalColumn));
        assert_eq!(report.info_count(), 1);
    }

    #[test]
    fn required_columns_and_frame_checks() {
        let mut store = MemoryStore::new();
        store
            .write_array("g/nodes/props/x/values", &Array::from_f64(vec![1.0]))
            .unwrap();
        store
            .write_array("g/nodes/props/y/values", &Array::from_f64(vec![1.0]))
            .unwrap();

        let mut report = CodecReport::new(Direction::Import, "g");
        assert!(matches!(
            read_detections(&store, "g", &mut report),
            Err(GeffError::MissingColumn { ref column, .. }) if column == "t"
        ));

        store
            .write_array("g/nodes/props/t/values", &Array::from_i32(vec![-1]))
            .unwrap();
        assert!(matches!(
            read_detections(&store, "g", &mut report),
            Err(GeffError::InvalidColumn { .. })
        ));

        store
            .write_array("g/nodes/props/t/values", &Array::from_f64(vec![0.0]))
            .unwrap();
        assert!(matches!(
            read_detections(&store, "g", &mut report),
            Err(GeffError::InvalidColumn { .. })
        ));
    }
}

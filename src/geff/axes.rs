//! Axis metadata and bounding-box computation.
//!
//! Axes are always ordered time first, then space as (z, y, x); a 2D
//! export drops z. Bounds are computed in one pass over all detections.

use serde::{Deserialize, Serialize};

use super::units::normalize_unit;
use crate::model::Detection;

/// Kind of an axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    Time,
    Space,
    /// Any other axis type (e.g. "channel") written by another tool.
    #[serde(other)]
    Other,
}

/// One axis of the metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,

    #[serde(rename = "type", default = "default_kind")]
    pub kind: AxisKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Lower bound over all detections; `None` when there are none.
    #[serde(default)]
    pub min: Option<f64>,

    /// Upper bound over all detections; `None` when there are none.
    #[serde(default)]
    pub max: Option<f64>,
}

fn default_kind() -> AxisKind {
    AxisKind::Other
}

impl Axis {
    /// Returns true if this axis is the time axis ("t" or "time").
    pub fn is_time(&self) -> bool {
        let name = self.name.trim().to_lowercase();
        self.kind == AxisKind::Time || name == "t" || name == "time"
    }

    /// Returns true if this axis is a spatial axis ("x", "y" or "z").
    pub fn is_space(&self) -> bool {
        let name = self.name.trim().to_lowercase();
        self.kind == AxisKind::Space || matches!(name.as_str(), "x" | "y" | "z")
    }
}

/// Axis names in store order for 3D data.
pub const AXIS_NAMES: [&str; 4] = ["t", "z", "y", "x"];

/// Per-axis bounds in (t, z, y, x) order.
///
/// A fresh `Bounds` starts at (+∞, −∞) on every axis. If no detection was
/// included it stays that way, and [`Bounds::is_empty`] reports it: such
/// bounds mean "no data", not a box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: [f64; 4],
    pub max: [f64; 4],
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: [f64::INFINITY; 4],
            max: [f64::NEG_INFINITY; 4],
        }
    }
}

impl Bounds {
    /// Widens the bounds to include one detection.
    pub fn include(&mut self, detection: &Detection) {
        let values = [
            f64::from(detection.frame),
            detection.z(),
            detection.y(),
            detection.x(),
        ];
        for (axis, value) in values.into_iter().enumerate() {
            self.min[axis] = self.min[axis].min(value);
            self.max[axis] = self.max[axis].max(value);
        }
    }

    /// Returns true if no detection was included.
    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0]
    }

    /// Bounds of one axis by name ("t", "z", "y" or "x").
    pub fn range(&self, axis: &str) -> Option<(f64, f64)> {
        let index = AXIS_NAMES.iter().position(|name| *name == axis)?;
        Some((self.min[index], self.max[index]))
    }
}

/// Computes per-axis bounds over all detections.
pub fn compute_bounds<'a>(detections: impl IntoIterator<Item = &'a Detection>) -> Bounds {
    let mut bounds = Bounds::default();
    for detection in detections {
        bounds.include(detection);
    }
    bounds
}

/// Assembles the ordered axis list for the metadata.
///
/// Units are normalized. Empty bounds produce axes without min/max.
pub fn build_axes(bounds: &Bounds, space_units: &str, time_units: &str, is_2d: bool) -> Vec<Axis> {
    let space_unit = normalize_unit(space_units);
    let time_unit = normalize_unit(time_units);

    AXIS_NAMES
        .iter()
        .enumerate()
        .filter(|(_, name)| !(is_2d && **name == "z"))
        .map(|(index, name)| {
            let (kind, unit) = if index == 0 {
                (AxisKind::Time, &time_unit)
            } else {
                (AxisKind::Space, &space_unit)
            };
            let (min, max) = if bounds.is_empty() {
                (None, None)
            } else {
                (Some(bounds.min[index]), Some(bounds.max[index]))
            };
            Axis {
                name: (*name).to_string(),
                kind,
                unit: Some(unit.clone()),
                min,
                max,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_over_two_detections() {
        let detections = [
            Detection::new(1, [0.0, 0.0, 0.0], 0, 1.0),
            Detection::new(2, [10.0, 5.0, 2.0], 7, 1.0),
        ];
        let bounds = compute_bounds(&detections);

        assert!(!bounds.is_empty());
        assert_eq!(bounds.min, [0.0, 0.0, 0.0, 0.0]);
        assert_eq!(bounds.max, [7.0, 2.0, 5.0, 10.0]);
        assert_eq!(bounds.range("x"), Some((0.0, 10.0)));
        assert_eq!(bounds.range("t"), Some((0.0, 7.0)));
        assert_eq!(bounds.range("c"), None);
    }

    #[test]
    fn empty_bounds_are_flagged() {
        let bounds = compute_bounds(std::iter::empty());
        assert!(bounds.is_empty());
        assert_eq!(bounds.min[0], f64::INFINITY);
        assert_eq!(bounds.max[0], f64::NEG_INFINITY);
    }

    #[test]
    fn single_point_bounds_are_not_empty() {
        let detections = [Detection::new(1, [3.0, 4.0, 0.0], 2, 1.0)];
        let bounds = compute_bounds(&detections);
        assert!(!bounds.is_empty());
        assert_eq!(bounds.min, bounds.max);
    }

    #[test]
    fn negative_coordinates_tighten_min() {
        let detections = [
            Detection::new(1, [-4.0, 2.0, 0.0], 3, 1.0),
            Detection::new(2, [-1.0, -8.0, 0.0], 1, 1.0),
        ];
        let bounds = compute_bounds(&detections);
        assert_eq!(bounds.range("x"), Some((-4.0, -1.0)));
        assert_eq!(bounds.range("y"), Some((-8.0, 2.0)));
        assert_eq!(bounds.range("t"), Some((1.0, 3.0)));
    }

    #[test]
    fn axes_3d_and_2d() {
        let detections = [Detection::new(1, [1.0, 2.0, 3.0], 4, 1.0)];
        let bounds = compute_bounds(&detections);

        let axes = build_axes(&bounds, "Micron", "sec", false);
        let names: Vec<&str> = axes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["t", "z", "y", "x"]);
        assert_eq!(axes[0].kind, AxisKind::Time);
        assert_eq!(axes[0].unit.as_deref(), Some("second"));
        assert_eq!(axes[1].unit.as_deref(), Some("micrometer"));
        assert_eq!(axes[1].min, Some(3.0));

        let axes = build_axes(&bounds, "Micron", "sec", true);
        let names: Vec<&str> = axes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["t", "y", "x"]);
        assert_eq!(axes[2].max, Some(1.0));
    }

    #[test]
    fn axes_without_data_have_no_bounds() {
        let axes = build_axes(&Bounds::default(), "pixel", "frame", true);
        assert!(axes.iter().all(|a| a.min.is_none() && a.max.is_none()));
    }

    #[test]
    fn axis_classification_by_name() {
        let axis: Axis = serde_json::from_str(r#"{"name": "Time"}"#).unwrap();
        assert!(axis.is_time());
        let axis: Axis = serde_json::from_str(r#"{"name": "c", "type": "channel"}"#).unwrap();
        assert_eq!(axis.kind, AxisKind::Other);
        assert!(!axis.is_space());
    }
}

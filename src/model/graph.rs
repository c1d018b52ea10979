//! Core tracking graph model.
//!
//! A [`TrackingModel`] holds detections (graph nodes), links between them
//! (graph edges), and tracks grouping detections and links together. It
//! is the in-memory side of the codec: the exporter reads from it and the
//! importer builds a fresh one.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::features::FeatureSchema;
use super::ids::{DetectionId, LinkId, TrackId};

/// Tolerance under which a z coordinate counts as zero for 2D detection.
pub const PLANAR_Z_TOLERANCE: f64 = 1e-10;

/// A complete tracking result.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrackingModel {
    /// Unit of spatial coordinates (e.g. "micron").
    #[serde(default)]
    pub space_units: String,

    /// Unit of the frame interval (e.g. "sec").
    #[serde(default)]
    pub time_units: String,

    /// Declared features per scope.
    #[serde(default)]
    pub features: FeatureSchema,

    /// All detections.
    pub detections: Vec<Detection>,

    /// All links.
    #[serde(default)]
    pub links: Vec<Link>,

    /// Tracks grouping detections and links.
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl TrackingModel {
    /// Creates an empty model with the given units.
    pub fn new(space_units: impl Into<String>, time_units: impl Into<String>) -> Self {
        Self {
            space_units: space_units.into(),
            time_units: time_units.into(),
            ..Default::default()
        }
    }

    /// Returns true if every detection lies in the z = 0 plane.
    ///
    /// An empty model counts as planar.
    pub fn is_planar(&self) -> bool {
        self.detections
            .iter()
            .all(|d| d.position[2].abs() <= PLANAR_Z_TOLERANCE)
    }

    /// Detections grouped by frame, in frame order.
    pub fn frames(&self) -> BTreeMap<u32, Vec<&Detection>> {
        let mut frames: BTreeMap<u32, Vec<&Detection>> = BTreeMap::new();
        for detection in &self.detections {
            frames.entry(detection.frame).or_default().push(detection);
        }
        frames
    }

    /// Finds a detection by id.
    pub fn detection(&self, id: DetectionId) -> Option<&Detection> {
        self.detections.iter().find(|d| d.id == id)
    }

    /// Finds a link by id.
    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.iter().find(|l| l.id == id)
    }

    /// Finds a track by id.
    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Maps every tracked detection to the track it belongs to.
    ///
    /// A detection belongs to a track if the track lists it, or if it is an
    /// endpoint of one of the track's links. When several tracks claim the
    /// same detection the first one wins.
    pub fn track_membership(&self) -> HashMap<DetectionId, TrackId> {
        let links: HashMap<LinkId, &Link> = self.links.iter().map(|l| (l.id, l)).collect();
        let mut membership = HashMap::new();

        for track in &self.tracks {
            for &detection in &track.detections {
                membership.entry(detection).or_insert(track.id);
            }
            for link_id in &track.links {
                if let Some(link) = links.get(link_id) {
                    membership.entry(link.source).or_insert(track.id);
                    membership.entry(link.target).or_insert(track.id);
                }
            }
        }

        membership
    }
}

/// An RGBA color with components in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgba(pub [f64; 4]);

impl Rgba {
    /// Creates a color from real components.
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self([r, g, b, a])
    }

    /// Creates a color from 8-bit components.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
            f64::from(a) / 255.0,
        ])
    }

    /// Color used for detections that carry none: opaque dark gray.
    pub fn default_detection() -> Self {
        Self::from_rgba8(89, 89, 89, 255)
    }

    /// Returns true if all components lie in [0, 1].
    pub fn is_normalized(&self) -> bool {
        self.0.iter().all(|c| (0.0..=1.0).contains(c))
    }
}

/// An outline attached to a detection.
///
/// Points are offsets from the detection's own position, not absolute
/// coordinates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    points: Vec<[f64; 2]>,
}

impl Polygon {
    /// Creates a polygon from (x, y) offsets.
    pub fn new(points: impl IntoIterator<Item = [f64; 2]>) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    /// Creates a polygon from separate x and y offset sequences.
    ///
    /// Extra entries in the longer sequence are ignored.
    pub fn from_xy(x: &[f64], y: &[f64]) -> Self {
        Self::new(x.iter().zip(y).map(|(&x, &y)| [x, y]))
    }

    /// The (x, y) offsets in outline order.
    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    /// X offsets in outline order.
    pub fn xs(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p[0])
    }

    /// Y offsets in outline order.
    pub fn ys(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p[1])
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the outline has no vertices.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One localized observation at one time point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Unique identifier within the model.
    pub id: DetectionId,

    /// Position as (x, y, z). 2D detections have z = 0.
    pub position: [f64; 3],

    /// Frame index.
    pub frame: u32,

    /// Radius in space units.
    pub radius: f64,

    /// Display color. `None` exports as [`Rgba::default_detection`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba>,

    /// Optional outline, relative to `position`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Polygon>,

    /// Segment id recorded by the store this detection was read from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_hint: Option<i64>,

    /// Feature values keyed by declared node-feature key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, f64>,
}

impl Detection {
    /// Creates a detection with no color, outline, or features.
    pub fn new(id: impl Into<DetectionId>, position: [f64; 3], frame: u32, radius: f64) -> Self {
        Self {
            id: id.into(),
            position,
            frame,
            radius,
            color: None,
            polygon: None,
            track_hint: None,
            features: BTreeMap::new(),
        }
    }

    /// Sets the display color.
    pub fn with_color(mut self, color: Rgba) -> Self {
        self.color = Some(color);
        self
    }

    /// Attaches an outline.
    pub fn with_polygon(mut self, polygon: Polygon) -> Self {
        self.attach_polygon(polygon);
        self
    }

    /// Adds a feature value.
    pub fn with_feature(mut self, key: impl Into<String>, value: f64) -> Self {
        self.features.insert(key.into(), value);
        self
    }

    /// Attaches an outline, replacing any previous one.
    pub fn attach_polygon(&mut self, polygon: Polygon) {
        self.polygon = Some(polygon);
    }

    /// Removes and returns the outline, if any.
    pub fn detach_polygon(&mut self) -> Option<Polygon> {
        self.polygon.take()
    }

    pub fn x(&self) -> f64 {
        self.position[0]
    }

    pub fn y(&self) -> f64 {
        self.position[1]
    }

    pub fn z(&self) -> f64 {
        self.position[2]
    }
}

/// A temporal connection between two detections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Unique identifier within the model.
    pub id: LinkId,

    /// Earlier detection.
    pub source: DetectionId,

    /// Later detection.
    pub target: DetectionId,

    /// Link weight: the squared distance between the endpoints.
    pub weight: f64,

    /// Score assigned by the linking algorithm, if it produces one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Feature values keyed by declared edge-feature key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, f64>,
}

impl Link {
    /// Creates a link without score or features.
    pub fn new(
        id: impl Into<LinkId>,
        source: impl Into<DetectionId>,
        target: impl Into<DetectionId>,
        weight: f64,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            weight,
            score: None,
            features: BTreeMap::new(),
        }
    }

    /// Sets the linking score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Adds a feature value.
    pub fn with_feature(mut self, key: impl Into<String>, value: f64) -> Self {
        self.features.insert(key.into(), value);
        self
    }
}

/// A connected group of detections and the links between them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Identifier, unique within one model.
    pub id: TrackId,

    /// Display name.
    pub name: String,

    /// Whether the track is shown.
    #[serde(default = "default_visible")]
    pub visible: bool,

    /// Member detections.
    #[serde(default)]
    pub detections: Vec<DetectionId>,

    /// Member links.
    #[serde(default)]
    pub links: Vec<LinkId>,

    /// Feature values keyed by declared track-feature key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, f64>,
}

fn default_visible() -> bool {
    true
}

impl Track {
    /// Creates a visible track named "Track {id}".
    pub fn new(id: impl Into<TrackId>) -> Self {
        let id = id.into();
        Self {
            id,
            name: format!("Track {}", id),
            visible: true,
            detections: Vec::new(),
            links: Vec::new(),
            features: BTreeMap::new(),
        }
    }

    /// Sets the member detections and links.
    pub fn with_members(
        mut self,
        detections: impl IntoIterator<Item = DetectionId>,
        links: impl IntoIterator<Item = LinkId>,
    ) -> Self {
        self.detections = detections.into_iter().collect();
        self.links = links.into_iter().collect();
        self
    }

    /// Adds a feature value.
    pub fn with_feature(mut self, key: impl Into<String>, value: f64) -> Self {
        self.features.insert(key.into(), value);
        self
    }
}

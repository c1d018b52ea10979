//! GEFF codec: tracking model to chunked graph store and back.
//!
//! Export writes, under one group of an [`ArrayStore`]:
//!
//! ```text
//! <group>/
//!   .zattrs                          {"geff": {version, directed, axes}}
//!   nodes/ids
//!   nodes/props/{t,z,y,x,radius,color,segment_id}/values
//!   nodes/props/polygon_{x,y}/{values,data}
//!   nodes/features/<key>/values
//!   edges/ids
//!   edges/props/{source,target,score,distance}/values
//!   edges/features/<key>/values
//!   tracks/ids
//!   tracks/props/visible/values
//!   tracks/features/<key>/values
//! ```
//!
//! The metadata document goes last: a group without it was never
//! completely written, and import refuses it.
//!
//! # Example
//!
//! ```
//! use trackgeff::geff::{export, import, ExportOptions, ImportOptions};
//! use trackgeff::model::{Detection, Link, TrackingModel};
//! use trackgeff::store::MemoryStore;
//!
//! let mut model = TrackingModel::new("micron", "sec");
//! model.detections = vec![
//!     Detection::new(1, [0.0, 0.0, 0.0], 0, 1.0),
//!     Detection::new(2, [3.0, 4.0, 0.0], 1, 1.0),
//! ];
//! model.links = vec![Link::new(0, 1, 2, 25.0)];
//!
//! let mut store = MemoryStore::new();
//! export(&model, &mut store, &ExportOptions::default()).unwrap();
//!
//! let (imported, report) = import(&store, &ImportOptions::default()).unwrap();
//! assert_eq!(imported.detections.len(), 2);
//! assert_eq!(imported.tracks.len(), 1);
//! assert!(!report.is_lossy());
//! ```
//!
//! [`ArrayStore`]: crate::store::ArrayStore

mod axes;
mod bridge;
mod columns;
mod edges;
mod features;
mod metadata;
mod nodes;
mod polygon;
mod reader;
mod tracks;
mod units;
mod writer;

pub use axes::{build_axes, compute_bounds, Axis, AxisKind, Bounds, AXIS_NAMES};
pub use bridge::{DetectionHandle, IdBridge};
pub use features::{FeatureColumn, INT_MISSING};
pub(crate) use features::{is_storable_key, to_int};
pub use metadata::{GeffMetadata, GEFF_VERSION};
pub use nodes::DEFAULT_RADIUS;
pub use reader::{import, import_from_path, inspect, inspect_path, StoreSummary};
pub use tracks::{assign_tracks, partition, Component};
pub use units::normalize_unit;
pub use writer::{export, export_to_path};

use crate::store::DEFAULT_CHUNK_SIZE;

/// Group written and read when none is given.
pub const DEFAULT_GROUP: &str = "tracks.geff";

/// Segment id of a detection that belongs to no track.
pub const SEGMENT_UNASSIGNED: i64 = -1;

/// Score of a link whose linking algorithm produces none.
pub const SCORE_UNUSED: f64 = -1.0;

/// First id handed out to rebuilt tracks.
pub const DEFAULT_TRACK_ID_BASE: u32 = 200;

/// Options for [`export`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    /// Omit the z axis and the z column.
    pub is_2d: bool,
    /// Rows per chunk when writing to a directory.
    pub chunk_size: usize,
    /// Group to write under.
    pub group: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            is_2d: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            group: DEFAULT_GROUP.to_string(),
        }
    }
}

/// Options for [`import`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportOptions {
    /// Id of the first rebuilt track.
    pub track_id_base: u32,
    /// Also restore visibility and names of tracks written by [`export`].
    pub restore_track_attributes: bool,
    /// Group to read from.
    pub group: String,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            track_id_base: DEFAULT_TRACK_ID_BASE,
            restore_track_attributes: false,
            group: DEFAULT_GROUP.to_string(),
        }
    }
}

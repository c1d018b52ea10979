//! In-memory tracking graph model.
//!
//! This module defines the model side of the codec: detections with
//! position, time and appearance, links between detections, tracks that
//! group them, and the feature schema describing per-entity values.
//!
//! # Example
//!
//! ```
//! use trackgeff::model::{Detection, Link, Track, TrackingModel};
//!
//! let mut model = TrackingModel::new("micron", "sec");
//! model.detections = vec![
//!     Detection::new(1, [0.0, 0.0, 0.0], 0, 1.0),
//!     Detection::new(2, [3.0, 4.0, 0.0], 1, 1.0),
//! ];
//! model.links = vec![Link::new(0, 1, 2, 25.0)];
//! model.tracks = vec![Track::new(0).with_members([1.into(), 2.into()], [0.into()])];
//! assert!(model.is_planar());
//! ```

mod features;
mod graph;
mod ids;
pub mod io_json;

pub use features::{Dimension, FeatureDeclaration, FeatureSchema, FeatureScope, ValueKind};
pub use graph::{Detection, Link, Polygon, Rgba, Track, TrackingModel, PLANAR_Z_TOLERANCE};
pub use ids::{DetectionId, LinkId, TrackId};

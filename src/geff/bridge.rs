//! Mapping between model detection ids and store node ids.
//!
//! A bridge is built once per export or import call and dropped with it.
//! On export the store id of a detection is its model id; on import the
//! store ids are authoritative and resolve to the position of the rebuilt
//! detection in the model's detection list.

use std::collections::HashMap;

use crate::error::{GeffError, Phase};
use crate::model::{Detection, DetectionId};

/// Index of a detection within [`TrackingModel::detections`].
///
/// [`TrackingModel::detections`]: crate::model::TrackingModel::detections
pub type DetectionHandle = usize;

#[derive(Debug, Default)]
pub struct IdBridge {
    to_store: HashMap<DetectionId, i64>,
    to_handle: HashMap<i64, DetectionHandle>,
}

impl IdBridge {
    /// Builds the bridge for exporting `detections`.
    ///
    /// # Errors
    /// [`GeffError::InvalidModel`] if two detections share an id.
    pub fn for_export(detections: &[Detection]) -> Result<Self, GeffError> {
        let mut bridge = Self {
            to_store: HashMap::with_capacity(detections.len()),
            to_handle: HashMap::with_capacity(detections.len()),
        };
        for (handle, detection) in detections.iter().enumerate() {
            let store_id = detection.id.as_i64();
            if bridge.to_store.insert(detection.id, store_id).is_some() {
                return Err(GeffError::InvalidModel(format!(
                    "duplicate detection id {}",
                    detection.id
                )));
            }
            bridge.to_handle.insert(store_id, handle);
        }
        Ok(bridge)
    }

    /// Builds the bridge for importing nodes with the given store ids, in
    /// row order.
    ///
    /// # Errors
    /// [`GeffError::InvalidColumn`] if an id repeats.
    pub fn for_import(node_ids: &[i64]) -> Result<Self, GeffError> {
        let mut bridge = Self {
            to_store: HashMap::with_capacity(node_ids.len()),
            to_handle: HashMap::with_capacity(node_ids.len()),
        };
        for (handle, &store_id) in node_ids.iter().enumerate() {
            if bridge.to_handle.insert(store_id, handle).is_some() {
                return Err(GeffError::InvalidColumn {
                    phase: Phase::Nodes,
                    column: "ids".to_string(),
                    message: format!("duplicate node id {}", store_id),
                });
            }
            bridge.to_store.insert(DetectionId(store_id), store_id);
        }
        Ok(bridge)
    }

    pub fn to_store_id(&self, detection: DetectionId) -> Option<i64> {
        self.to_store.get(&detection).copied()
    }

    pub fn to_detection_handle(&self, store_id: i64) -> Option<DetectionHandle> {
        self.to_handle.get(&store_id).copied()
    }

    pub fn len(&self) -> usize {
        self.to_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_handle.is_empty()
    }
}

//! GEFF metadata document.
//!
//! The metadata lives under the `geff` key of the group attributes. It is
//! written last by the exporter, so a group without it is an incomplete
//! store and the importer refuses it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::axes::Axis;
use super::units::normalize_unit;
use crate::error::{GeffError, Phase};
use crate::store::ArrayStore;

/// Format version written by this crate.
pub const GEFF_VERSION: &str = "0.4.0";

/// Attribute key holding the metadata document.
pub const METADATA_KEY: &str = "geff";

/// The metadata document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeffMetadata {
    pub geff_version: String,

    pub directed: bool,

    #[serde(default)]
    pub axes: Vec<Axis>,
}

impl GeffMetadata {
    /// Metadata for a directed graph with the given axes.
    pub fn new(axes: Vec<Axis>) -> Self {
        Self {
            geff_version: GEFF_VERSION.to_string(),
            directed: true,
            axes,
        }
    }

    /// Returns true if the version shares major and minor with
    /// [`GEFF_VERSION`].
    pub fn is_known_version(&self) -> bool {
        major_minor(&self.geff_version) == major_minor(GEFF_VERSION)
    }

    /// Normalized unit of the time axis, if there is one.
    pub fn time_unit(&self) -> Option<String> {
        self.axes
            .iter()
            .find(|a| a.is_time())
            .and_then(|a| a.unit.as_deref())
            .map(normalize_unit)
    }

    /// Normalized unit of the first spatial axis, if there is one.
    pub fn space_unit(&self) -> Option<String> {
        self.axes
            .iter()
            .find(|a| a.is_space())
            .and_then(|a| a.unit.as_deref())
            .map(normalize_unit)
    }

    /// Returns true if a z axis is declared.
    pub fn has_z_axis(&self) -> bool {
        self.axes
            .iter()
            .any(|a| a.name.trim().eq_ignore_ascii_case("z"))
    }

    /// Writes the metadata into the attributes of `group`, keeping any other
    /// attributes already there.
    pub fn write<S: ArrayStore + ?Sized>(&self, store: &mut S, group: &str) -> Result<(), GeffError> {
        let mut attrs = match store
            .read_attrs(group)
            .map_err(GeffError::store(Phase::Metadata))?
        {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let document = serde_json::to_value(self).map_err(|e| GeffError::MetadataInvalid {
            location: group.to_string(),
            message: e.to_string(),
        })?;
        attrs.insert(METADATA_KEY.to_string(), document);

        store
            .write_attrs(group, &Value::Object(attrs))
            .map_err(GeffError::store(Phase::Metadata))
    }

    /// Reads the metadata of `group`.
    ///
    /// # Errors
    /// [`GeffError::MetadataMissing`] if the group has no metadata, and
    /// [`GeffError::MetadataInvalid`] if it cannot be parsed.
    pub fn read<S: ArrayStore + ?Sized>(store: &S, group: &str) -> Result<Self, GeffError> {
        let attrs = store
            .read_attrs(group)
            .map_err(GeffError::store(Phase::Metadata))?;
        let document = attrs
            .as_ref()
            .and_then(|a| a.get(METADATA_KEY))
            .ok_or_else(|| GeffError::MetadataMissing {
                location: group.to_string(),
            })?;

        Self::from_value(document).map_err(|message| GeffError::MetadataInvalid {
            location: group.to_string(),
            message,
        })
    }

    /// Parses a metadata document.
    pub fn from_value(document: &Value) -> Result<Self, String> {
        Self::deserialize(document).map_err(|e| e.to_string())
    }

    /// Parses a metadata document from JSON bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, String> {
        serde_json::from_slice(bytes).map_err(|e| e.to_string())
    }
}

fn major_minor(version: &str) -> (&str, &str) {
    let mut parts = version.trim().split('.');
    (parts.next().unwrap_or(""), parts.next().unwrap_or(""))
}

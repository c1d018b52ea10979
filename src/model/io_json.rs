//! JSON serialization for tracking models.
//!
//! The CLI reads and writes models in this format on the model side of
//! the codec. It is also handy for:
//! - Writing test fixtures by hand
//! - Inspecting what an import produced

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::graph::TrackingModel;
use crate::error::GeffError;

/// Reads a tracking model from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_model_json(path: &Path) -> Result<TrackingModel, GeffError> {
    let file = File::open(path).map_err(GeffError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| GeffError::ModelJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a tracking model to a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_model_json(path: &Path, model: &TrackingModel) -> Result<(), GeffError> {
    let file = File::create(path).map_err(GeffError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, model).map_err(|source| GeffError::ModelJsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a tracking model from a JSON string.
pub fn from_json_str(json: &str) -> Result<TrackingModel, serde_json::Error> {
    serde_json::from_str(json)
}

/// Reads a tracking model from JSON bytes.
pub fn from_json_slice(bytes: &[u8]) -> Result<TrackingModel, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Writes a tracking model to a JSON string.
pub fn to_json_string(model: &TrackingModel) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(model)
}

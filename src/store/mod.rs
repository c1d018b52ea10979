//! Chunked columnar store boundary.
//!
//! The codec talks to storage only through [`ArrayStore`]: named, typed,
//! one- or two-dimensional arrays plus JSON attribute documents, both
//! addressed by `/`-separated paths. Every call is blocking and
//! all-or-nothing.
//!
//! Two engines are provided:
//! - [`MemoryStore`]: ordered in-memory maps, for tests and benches.
//! - [`DirectoryStore`]: an uncompressed Zarr v2 directory hierarchy.

mod directory;
mod memory;

pub use directory::{DirectoryStore, DEFAULT_CHUNK_SIZE};
pub use memory::MemoryStore;

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

/// Errors raised by a store engine.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON document at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid array at {path}: {message}")]
    InvalidArray { path: String, message: String },
}

/// Element type of an array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dtype {
    Int32,
    Int64,
    Float64,
}

impl Dtype {
    /// Zarr v2 type string (little-endian).
    pub fn zarr_str(&self) -> &'static str {
        match self {
            Dtype::Int32 => "<i4",
            Dtype::Int64 => "<i8",
            Dtype::Float64 => "<f8",
        }
    }

    /// Parses a Zarr v2 type string.
    pub fn from_zarr_str(s: &str) -> Option<Self> {
        match s {
            "<i4" => Some(Dtype::Int32),
            "<i8" => Some(Dtype::Int64),
            "<f8" => Some(Dtype::Float64),
            _ => None,
        }
    }

    /// Size of one element in bytes.
    pub fn item_size(&self) -> usize {
        match self {
            Dtype::Int32 => 4,
            Dtype::Int64 | Dtype::Float64 => 8,
        }
    }
}

/// Flat element storage of an array, in C order.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayData {
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float64(Vec<f64>),
}

impl ArrayData {
    pub fn dtype(&self) -> Dtype {
        match self {
            ArrayData::Int32(_) => Dtype::Int32,
            ArrayData::Int64(_) => Dtype::Int64,
            ArrayData::Float64(_) => Dtype::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayData::Int32(v) => v.len(),
            ArrayData::Int64(v) => v.len(),
            ArrayData::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A typed, one- or two-dimensional array.
#[derive(Clone, Debug, PartialEq)]
pub struct Array {
    shape: Vec<usize>,
    data: ArrayData,
}

impl Array {
    /// Creates an array, checking that `shape` matches the element count.
    pub fn new(shape: Vec<usize>, data: ArrayData) -> Result<Self, StoreError> {
        let expected: usize = shape.iter().product();
        if shape.is_empty() || shape.len() > 2 || expected != data.len() {
            return Err(StoreError::InvalidArray {
                path: String::new(),
                message: format!(
                    "shape {:?} does not fit {} element(s)",
                    shape,
                    data.len()
                ),
            });
        }
        Ok(Self { shape, data })
    }

    /// A one-dimensional 32-bit integer column.
    pub fn from_i32(values: Vec<i32>) -> Self {
        Self {
            shape: vec![values.len()],
            data: ArrayData::Int32(values),
        }
    }

    /// A one-dimensional 64-bit integer column.
    pub fn from_i64(values: Vec<i64>) -> Self {
        Self {
            shape: vec![values.len()],
            data: ArrayData::Int64(values),
        }
    }

    /// A one-dimensional real column.
    pub fn from_f64(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            data: ArrayData::Float64(values),
        }
    }

    /// A row-major real matrix with `cols` columns.
    pub fn matrix_f64(cols: usize, values: Vec<f64>) -> Result<Self, StoreError> {
        let rows = if cols == 0 { 0 } else { values.len() / cols };
        Self::new(vec![rows, cols], ArrayData::Float64(values))
    }

    /// A row-major 64-bit integer matrix with `cols` columns.
    pub fn matrix_i64(cols: usize, values: Vec<i64>) -> Result<Self, StoreError> {
        let rows = if cols == 0 { 0 } else { values.len() / cols };
        Self::new(vec![rows, cols], ArrayData::Int64(values))
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn dtype(&self) -> Dtype {
        self.data.dtype()
    }

    /// Number of rows (length of the first axis).
    pub fn rows(&self) -> usize {
        self.shape[0]
    }

    /// Number of columns: 1 for one-dimensional arrays.
    pub fn cols(&self) -> usize {
        self.shape.get(1).copied().unwrap_or(1)
    }

    /// Elements widened to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match &self.data {
            ArrayData::Int32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            ArrayData::Int64(v) => v.iter().map(|&x| x as f64).collect(),
            ArrayData::Float64(v) => v.clone(),
        }
    }

    /// Elements widened to `i64`; `None` for real arrays.
    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        match &self.data {
            ArrayData::Int32(v) => Some(v.iter().map(|&x| i64::from(x)).collect()),
            ArrayData::Int64(v) => Some(v.clone()),
            ArrayData::Float64(_) => None,
        }
    }
}

/// Storage for named arrays and JSON attribute documents.
///
/// Paths are relative, `/`-separated, and never start with `/`. A group is
/// any path that has children or was created with [`create_group`].
///
/// [`create_group`]: ArrayStore::create_group
pub trait ArrayStore {
    /// Writes (or overwrites) an array.
    fn write_array(&mut self, path: &str, array: &Array) -> Result<(), StoreError>;

    /// Reads an array, or `None` if none exists at `path`.
    fn read_array(&self, path: &str) -> Result<Option<Array>, StoreError>;

    /// Returns true if an array exists at `path`.
    fn contains_array(&self, path: &str) -> bool;

    /// Creates a group (and its parents) if missing.
    fn create_group(&mut self, path: &str) -> Result<(), StoreError>;

    /// Writes (or overwrites) the attribute document of a group or array.
    fn write_attrs(&mut self, path: &str, attrs: &Value) -> Result<(), StoreError>;

    /// Reads the attribute document of a group or array.
    fn read_attrs(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Names of the direct children (groups and arrays) of a group, sorted.
    fn list_children(&self, path: &str) -> Result<Vec<String>, StoreError>;

    /// Removes a group or array and everything below it. Missing paths are
    /// not an error.
    fn remove(&mut self, path: &str) -> Result<(), StoreError>;
}

/// Joins path segments with `/`, skipping empty ones.
pub fn join(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|p| p.split('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_skips_empty_segments() {
        assert_eq!(join(&["", "tracks.geff", "nodes/"]), "tracks.geff/nodes");
        assert_eq!(join(&["a/b", "c"]), "a/b/c");
    }

    #[test]
    fn matrix_shape_checked() {
        let colors = Array::matrix_f64(4, vec![0.0; 8]).unwrap();
        assert_eq!(colors.shape(), &[2, 4]);
        assert_eq!(colors.cols(), 4);

        assert!(Array::new(vec![3, 4], ArrayData::Float64(vec![0.0; 8])).is_err());
    }

    #[test]
    fn widening_conversions() {
        let ints = Array::from_i32(vec![1, i32::MIN]);
        assert_eq!(ints.to_i64_vec(), Some(vec![1, i64::from(i32::MIN)]));
        assert_eq!(ints.to_f64_vec()[0], 1.0);

        let reals = Array::from_f64(vec![0.5]);
        assert!(reals.to_i64_vec().is_none());
    }

    #[test]
    fn dtype_strings_roundtrip() {
        for dtype in [Dtype::Int32, Dtype::Int64, Dtype::Float64] {
            assert_eq!(Dtype::from_zarr_str(dtype.zarr_str()), Some(dtype));
        }
        assert_eq!(Dtype::from_zarr_str("|u1"), None);
    }
}

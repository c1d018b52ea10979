//! Directory store engine writing an uncompressed Zarr v2 hierarchy.
//!
//! # Layout
//!
//! - Groups are directories holding a `.zgroup` document.
//! - Arrays are directories holding a `.zarray` document and one file per
//!   chunk. Chunks split the first axis only; two-dimensional arrays keep
//!   all columns in every chunk, so chunk keys are `"{i}"` or `"{i}.0"`.
//! - Attributes live in `.zattrs` next to the `.zgroup`/`.zarray`.
//!
//! Chunks are raw little-endian, C order, with no compressor and no
//! filters. The last chunk is zero-padded to full length on disk and
//! truncated back to the array shape on read. Absent chunks read as
//! zeros, up to a bounded number of elements.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Array, ArrayData, ArrayStore, Dtype, StoreError};

const ZARR_FORMAT: u8 = 2;
const ZGROUP: &str = ".zgroup";
const ZARRAY: &str = ".zarray";
const ZATTRS: &str = ".zattrs";

/// Elements a read may synthesize from the fill value for absent chunks.
const MAX_FILL_ELEMENTS: usize = 1 << 24;

/// Default number of rows per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// A store rooted at a directory on disk.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
    chunk_size: usize,
}

/// The `.zarray` document.
#[derive(Debug, Serialize, Deserialize)]
struct ArrayMetadata {
    zarr_format: u8,
    shape: Vec<usize>,
    chunks: Vec<usize>,
    dtype: String,
    compressor: Option<Value>,
    #[serde(default)]
    fill_value: Value,
    order: String,
    filters: Option<Value>,
}

impl DirectoryStore {
    /// Opens (or prepares to create) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Sets the number of rows per chunk for arrays written afterwards.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.clone(), |dir, segment| dir.join(segment))
    }

    fn ensure_group_dir(&self, dir: &Path) -> Result<(), StoreError> {
        fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;
        let marker = dir.join(ZGROUP);
        if !marker.exists() && !dir.join(ZARRAY).exists() {
            write_json(&marker, &json!({ "zarr_format": ZARR_FORMAT }))?;
        }
        Ok(())
    }

    fn ensure_parents(&self, path: &str) -> Result<(), StoreError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut dir = self.root.clone();
        self.ensure_group_dir(&dir)?;
        for segment in segments.iter().take(segments.len().saturating_sub(1)) {
            dir = dir.join(segment);
            self.ensure_group_dir(&dir)?;
        }
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn invalid(path: &str, message: impl Into<String>) -> StoreError {
    StoreError::InvalidArray {
        path: path.to_string(),
        message: message.into(),
    }
}

fn write_json(path: &Path, value: &Value) -> Result<(), StoreError> {
    let text = serde_json::to_string_pretty(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|source| io_error(path, source))
}

fn read_json(path: &Path) -> Result<Option<Value>, StoreError> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Json {
                path: path.to_path_buf(),
                source,
            }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(io_error(path, source)),
    }
}

fn encode(data: &ArrayData, start: usize, end: usize, padded_len: usize) -> Vec<u8> {
    let item_size = data.dtype().item_size();
    let mut bytes = Vec::with_capacity(padded_len * item_size);
    match data {
        ArrayData::Int32(v) => v[start..end]
            .iter()
            .for_each(|x| bytes.extend_from_slice(&x.to_le_bytes())),
        ArrayData::Int64(v) => v[start..end]
            .iter()
            .for_each(|x| bytes.extend_from_slice(&x.to_le_bytes())),
        ArrayData::Float64(v) => v[start..end]
            .iter()
            .for_each(|x| bytes.extend_from_slice(&x.to_le_bytes())),
    }
    bytes.resize(padded_len * item_size, 0);
    bytes
}

fn decode(dtype: Dtype, bytes: &[u8], out: &mut ArrayData) {
    match (dtype, out) {
        (Dtype::Int32, ArrayData::Int32(v)) => v.extend(
            bytes
                .chunks_exact(4)
                .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        ),
        (Dtype::Int64, ArrayData::Int64(v)) => v.extend(
            bytes
                .chunks_exact(8)
                .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])),
        ),
        (Dtype::Float64, ArrayData::Float64(v)) => v.extend(
            bytes
                .chunks_exact(8)
                .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])),
        ),
        _ => {}
    }
}

fn empty_data(dtype: Dtype) -> ArrayData {
    match dtype {
        Dtype::Int32 => ArrayData::Int32(Vec::new()),
        Dtype::Int64 => ArrayData::Int64(Vec::new()),
        Dtype::Float64 => ArrayData::Float64(Vec::new()),
    }
}

fn truncate(data: &mut ArrayData, len: usize) {
    match data {
        ArrayData::Int32(v) => v.truncate(len),
        ArrayData::Int64(v) => v.truncate(len),
        ArrayData::Float64(v) => v.truncate(len),
    }
}

/// Number of chunk files in `dir` with an index below `chunk_count`.
fn count_chunk_files(dir: &Path, chunk_count: usize, ndim: usize) -> Result<usize, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(source) => return Err(io_error(dir, source)),
    };
    let mut present = 0;
    for entry in entries {
        let entry = entry.map_err(|source| io_error(dir, source))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let index = if ndim == 1 {
            name.parse::<usize>().ok()
        } else {
            name.strip_suffix(".0").and_then(|i| i.parse::<usize>().ok())
        };
        if index.is_some_and(|i| i < chunk_count) {
            present += 1;
        }
    }
    Ok(present)
}

fn chunk_key(index: usize, ndim: usize) -> String {
    if ndim == 1 {
        index.to_string()
    } else {
        format!("{}.0", index)
    }
}

impl ArrayStore for DirectoryStore {
    fn write_array(&mut self, path: &str, array: &Array) -> Result<(), StoreError> {
        let dir = self.dir(path);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|source| io_error(&dir, source))?;
        }
        self.ensure_parents(path)?;
        fs::create_dir_all(&dir).map_err(|source| io_error(&dir, source))?;

        let rows = array.rows();
        let cols = array.cols();
        let ndim = array.shape().len();
        let chunk_rows = self.chunk_size;
        let mut chunks = vec![chunk_rows];
        if ndim == 2 {
            chunks.push(cols);
        }

        let fill_value = match array.dtype() {
            Dtype::Float64 => json!(0.0),
            Dtype::Int32 | Dtype::Int64 => json!(0),
        };
        let metadata = ArrayMetadata {
            zarr_format: ZARR_FORMAT,
            shape: array.shape().to_vec(),
            chunks,
            dtype: array.dtype().zarr_str().to_string(),
            compressor: None,
            fill_value,
            order: "C".to_string(),
            filters: None,
        };
        let metadata = serde_json::to_value(&metadata).map_err(|source| StoreError::Json {
            path: dir.join(ZARRAY),
            source,
        })?;
        write_json(&dir.join(ZARRAY), &metadata)?;

        if cols == 0 {
            return Ok(());
        }
        for (index, first_row) in (0..rows).step_by(chunk_rows).enumerate() {
            let last_row = (first_row + chunk_rows).min(rows);
            let bytes = encode(
                array.data(),
                first_row * cols,
                last_row * cols,
                chunk_rows * cols,
            );
            let chunk_path = dir.join(chunk_key(index, ndim));
            fs::write(&chunk_path, bytes).map_err(|source| io_error(&chunk_path, source))?;
        }
        Ok(())
    }

    fn read_array(&self, path: &str) -> Result<Option<Array>, StoreError> {
        let dir = self.dir(path);
        let Some(document) = read_json(&dir.join(ZARRAY))? else {
            return Ok(None);
        };
        let metadata: ArrayMetadata =
            serde_json::from_value(document).map_err(|source| StoreError::Json {
                path: dir.join(ZARRAY),
                source,
            })?;

        if metadata.compressor.is_some() || metadata.filters.is_some() {
            return Err(invalid(path, "compressed or filtered arrays are not supported"));
        }
        if metadata.order != "C" {
            return Err(invalid(path, format!("unsupported order '{}'", metadata.order)));
        }
        let dtype = Dtype::from_zarr_str(&metadata.dtype)
            .ok_or_else(|| invalid(path, format!("unsupported dtype '{}'", metadata.dtype)))?;
        let ndim = metadata.shape.len();
        if ndim == 0 || ndim > 2 || metadata.chunks.len() != ndim {
            return Err(invalid(path, "only 1-D and 2-D arrays are supported"));
        }
        if ndim == 2 && metadata.chunks[1] != metadata.shape[1] {
            return Err(invalid(path, "chunking along the second axis is not supported"));
        }

        let rows = metadata.shape[0];
        let cols = if ndim == 2 { metadata.shape[1] } else { 1 };
        let chunk_rows = metadata.chunks[0].max(1);
        let overflow = || invalid(path, "shape or chunk size overflows");
        let len = rows.checked_mul(cols).ok_or_else(overflow)?;
        let chunk_len = chunk_rows.checked_mul(cols).ok_or_else(overflow)?;
        let chunk_bytes = chunk_len
            .checked_mul(dtype.item_size())
            .ok_or_else(overflow)?;
        let chunk_count = rows.div_ceil(chunk_rows);

        if cols > 0 && chunk_count > 0 {
            let present = count_chunk_files(&dir, chunk_count, ndim)?;
            let missing = chunk_count - present;
            let fill = missing.checked_mul(chunk_len).ok_or_else(overflow)?;
            if fill > MAX_FILL_ELEMENTS {
                return Err(invalid(
                    path,
                    format!(
                        "{} of {} chunk(s) missing; shape {:?} is implausible",
                        missing, chunk_count, metadata.shape
                    ),
                ));
            }
        }

        let mut data = empty_data(dtype);
        if cols > 0 {
            for index in 0..chunk_count {
                let chunk_path = dir.join(chunk_key(index, ndim));
                let bytes = match fs::read(&chunk_path) {
                    Ok(bytes) if bytes.len() == chunk_bytes => bytes,
                    Ok(bytes) => {
                        return Err(invalid(
                            path,
                            format!(
                                "chunk {} has {} byte(s), expected {}",
                                index,
                                bytes.len(),
                                chunk_bytes
                            ),
                        ))
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => vec![0; chunk_bytes],
                    Err(source) => return Err(io_error(&chunk_path, source)),
                };
                decode(dtype, &bytes, &mut data);
            }
        }
        truncate(&mut data, len);

        Array::new(metadata.shape, data)
            .map(Some)
            .map_err(|_| invalid(path, "chunk data does not match shape"))
    }

    fn contains_array(&self, path: &str) -> bool {
        self.dir(path).join(ZARRAY).is_file()
    }

    fn create_group(&mut self, path: &str) -> Result<(), StoreError> {
        self.ensure_parents(path)?;
        self.ensure_group_dir(&self.dir(path))
    }

    fn write_attrs(&mut self, path: &str, attrs: &Value) -> Result<(), StoreError> {
        let dir = self.dir(path);
        if !dir.exists() {
            self.create_group(path)?;
        }
        write_json(&dir.join(ZATTRS), attrs)
    }

    fn read_attrs(&self, path: &str) -> Result<Option<Value>, StoreError> {
        read_json(&self.dir(path).join(ZATTRS))
    }

    fn list_children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.dir(path);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(io_error(&dir, source)),
        };

        let mut children = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| io_error(&dir, source))?;
            let is_dir = entry
                .file_type()
                .map_err(|source| io_error(&entry.path(), source))?
                .is_dir();
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_dir && !name.starts_with('.') {
                children.push(name);
            }
        }
        children.sort();
        Ok(children)
    }

    fn remove(&mut self, path: &str) -> Result<(), StoreError> {
        let dir = self.dir(path);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(io_error(&dir, source)),
        }
    }
}

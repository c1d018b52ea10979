//! Ragged polygon columns.
//!
//! Outlines have a different vertex count per detection, so each of
//! `polygon_x` and `polygon_y` is stored as two arrays: `values`, an
//! `n × 2` matrix of (offset, length) rows into `data`, and `data`, the
//! concatenated offsets. A length of zero means "no polygon". Nothing is
//! written when no detection carries an outline.

use super::columns::prop_path;
use crate::error::{GeffError, Phase};
use crate::model::{Detection, Polygon};
use crate::report::{CodecIssue, CodecIssueCode, CodecReport};
use crate::store::{join, Array, ArrayStore};

const AXES: [&str; 2] = ["polygon_x", "polygon_y"];

/// One ragged coordinate column.
#[derive(Clone, Debug, Default, PartialEq)]
struct Ragged {
    index: Vec<i64>,
    data: Vec<f64>,
}

impl Ragged {
    fn push(&mut self, values: impl Iterator<Item = f64>) {
        let offset = self.data.len();
        self.data.extend(values);
        self.index.push(offset as i64);
        self.index.push((self.data.len() - offset) as i64);
    }

    fn row(&self, row: usize) -> (i64, i64) {
        (self.index[2 * row], self.index[2 * row + 1])
    }
}

/// Polygon columns for a detection list, in detection order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolygonColumns {
    x: Ragged,
    y: Ragged,
}

impl PolygonColumns {
    /// Encodes the outlines of `detections`, or `None` if none has one.
    pub fn encode(detections: &[Detection]) -> Option<Self> {
        if detections.iter().all(|d| d.polygon.is_none()) {
            return None;
        }
        let mut columns = Self::default();
        for detection in detections {
            match &detection.polygon {
                Some(polygon) => {
                    columns.x.push(polygon.xs());
                    columns.y.push(polygon.ys());
                }
                None => {
                    columns.x.push(std::iter::empty());
                    columns.y.push(std::iter::empty());
                }
            }
        }
        Some(columns)
    }

    pub fn write<S: ArrayStore + ?Sized>(&self, store: &mut S, group: &str) -> Result<(), GeffError> {
        for (name, ragged) in AXES.iter().zip([&self.x, &self.y]) {
            let index = Array::matrix_i64(2, ragged.index.clone())
                .map_err(GeffError::store(Phase::Nodes))?;
            store
                .write_array(&values_path(group, name), &index)
                .map_err(GeffError::store(Phase::Nodes))?;
            store
                .write_array(&data_path(group, name), &Array::from_f64(ragged.data.clone()))
                .map_err(GeffError::store(Phase::Nodes))?;
        }
        Ok(())
    }

    /// Reads the polygon columns of a group, or `None` if either axis is
    /// absent.
    pub fn read<S: ArrayStore + ?Sized>(
        store: &S,
        group: &str,
        rows: usize,
    ) -> Result<Option<Self>, GeffError> {
        let Some(x) = read_ragged(store, group, AXES[0], rows)? else {
            return Ok(None);
        };
        let Some(y) = read_ragged(store, group, AXES[1], rows)? else {
            return Ok(None);
        };
        Ok(Some(Self { x, y }))
    }

    /// Decodes the outline of every row.
    ///
    /// A row gets a polygon only if both its x and y runs are non-empty.
    /// Runs of different lengths are truncated to the shorter one and
    /// reported once in aggregate.
    pub fn decode(&self, report: &mut CodecReport) -> Vec<Option<Polygon>> {
        let rows = self.x.index.len() / 2;
        let mut mismatched = 0;

        let polygons = (0..rows)
            .map(|row| {
                let (x_offset, x_len) = self.x.row(row);
                let (y_offset, y_len) = self.y.row(row);
                if x_len == 0 || y_len == 0 {
                    return None;
                }
                if x_len != y_len {
                    mismatched += 1;
                }
                let xs = slice(&self.x.data, x_offset, x_len);
                let ys = slice(&self.y.data, y_offset, y_len);
                Some(Polygon::from_xy(xs, ys))
            })
            .collect();

        if mismatched > 0 {
            let message = format!(
                "{} polygon(s) with different x and y vertex counts were truncated",
                mismatched
            );
            tracing::warn!("{}", message);
            report.add(CodecIssue::warning(
                CodecIssueCode::PolygonLengthMismatch,
                message,
            ));
        }
        polygons
    }
}

fn slice(data: &[f64], offset: i64, len: i64) -> &[f64] {
    let start = offset as usize;
    &data[start..start + len as usize]
}

fn values_path(group: &str, name: &str) -> String {
    prop_path(group, "nodes", name)
}

fn data_path(group: &str, name: &str) -> String {
    join(&[group, "nodes", "props", name, "data"])
}

fn read_ragged<S: ArrayStore + ?Sized>(
    store: &S,
    group: &str,
    name: &str,
    rows: usize,
) -> Result<Option<Ragged>, GeffError> {
    let invalid = |message: String| GeffError::InvalidColumn {
        phase: Phase::Nodes,
        column: name.to_string(),
        message,
    };

    let Some(index) = store
        .read_array(&values_path(group, name))
        .map_err(GeffError::store(Phase::Nodes))?
    else {
        return Ok(None);
    };
    let data = store
        .read_array(&data_path(group, name))
        .map_err(GeffError::store(Phase::Nodes))?
        .map(|a| a.to_f64_vec())
        .unwrap_or_default();

    if index.shape() != [rows, 2] {
        return Err(invalid(format!(
            "expected shape [{}, 2], found {:?}",
            rows,
            index.shape()
        )));
    }
    let index = index
        .to_i64_vec()
        .ok_or_else(|| invalid("offsets must be integers".to_string()))?;

    for pair in index.chunks(2) {
        let (offset, len) = (pair[0], pair[1]);
        let in_range = offset >= 0
            && len >= 0
            && offset
                .checked_add(len)
                .is_some_and(|end| end as u64 <= data.len() as u64);
        if !in_range {
            return Err(invalid(format!(
                "run ({}, {}) outside {} data value(s)",
                offset,
                len,
                data.len()
            )));
        }
    }

    Ok(Some(Ragged { index, data }))
}

//! Shared helpers for reading and writing entity columns.

use crate::error::{GeffError, Phase};
use crate::store::{join, Array, ArrayStore};

/// Path of the id array of an entity group ("nodes", "edges", "tracks").
pub(crate) fn ids_path(group: &str, entity: &str) -> String {
    join(&[group, entity, "ids"])
}

/// Path of one property column.
pub(crate) fn prop_path(group: &str, entity: &str, name: &str) -> String {
    join(&[group, entity, "props", name, "values"])
}

pub(crate) fn write<S: ArrayStore + ?Sized>(
    store: &mut S,
    phase: Phase,
    path: &str,
    array: &Array,
) -> Result<(), GeffError> {
    store.write_array(path, array).map_err(GeffError::store(phase))
}

pub(crate) fn read<S: ArrayStore + ?Sized>(
    store: &S,
    phase: Phase,
    path: &str,
) -> Result<Option<Array>, GeffError> {
    store.read_array(path).map_err(GeffError::store(phase))
}

/// Reads a column that must exist.
pub(crate) fn require<S: ArrayStore + ?Sized>(
    store: &S,
    phase: Phase,
    path: &str,
    column: &str,
) -> Result<Array, GeffError> {
    read(store, phase, path)?.ok_or_else(|| GeffError::MissingColumn {
        phase,
        column: column.to_string(),
    })
}

/// Checks that `array` has `rows` rows of `cols` values.
pub(crate) fn check_shape(
    phase: Phase,
    column: &str,
    array: &Array,
    rows: usize,
    cols: usize,
) -> Result<(), GeffError> {
    let expected_dims = if cols == 1 { 1 } else { 2 };
    if array.rows() != rows || array.cols() != cols || array.shape().len() != expected_dims {
        return Err(GeffError::InvalidColumn {
            phase,
            column: column.to_string(),
            message: format!(
                "expected {} row(s) of {} value(s), found shape {:?}",
                rows,
                cols,
                array.shape()
            ),
        });
    }
    Ok(())
}

/// Reads a real column of `rows` entries; integer columns are widened.
pub(crate) fn reals(
    phase: Phase,
    column: &str,
    array: &Array,
    rows: usize,
) -> Result<Vec<f64>, GeffError> {
    check_shape(phase, column, array, rows, 1)?;
    Ok(array.to_f64_vec())
}

/// Reads an integer column of `rows` entries; real columns are rejected.
pub(crate) fn integers(
    phase: Phase,
    column: &str,
    array: &Array,
    rows: usize,
) -> Result<Vec<i64>, GeffError> {
    check_shape(phase, column, array, rows, 1)?;
    array.to_i64_vec().ok_or_else(|| GeffError::InvalidColumn {
        phase,
        column: column.to_string(),
        message: "expected integer values".to_string(),
    })
}

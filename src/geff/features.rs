//! Typed feature columns.
//!
//! Each declared feature becomes one strictly typed column per scope:
//! `i32` for integer features, `f64` for real ones. Missing values use a
//! sentinel: [`INT_MISSING`] for integers and NaN for reals. Declarations
//! are written to the scope's `features` group before any column so a
//! reader can type its columns up front.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::json;

use crate::error::{GeffError, Phase};
use crate::model::{FeatureDeclaration, FeatureSchema, FeatureScope, ValueKind};
use crate::report::{CodecIssue, CodecIssueCode, CodecReport};
use crate::store::{join, Array, ArrayData, ArrayStore};

/// Missing-value sentinel of integer feature columns.
pub const INT_MISSING: i32 = i32::MIN;

/// Values of one feature across all entities of a scope, in entity order.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureColumn {
    Int(Vec<i32>),
    Real(Vec<f64>),
}

impl FeatureColumn {
    /// Collects the values of `declaration` from per-entity feature maps,
    /// substituting the sentinel where an entity has no value.
    pub fn values_for<'a>(
        declaration: &FeatureDeclaration,
        entities: impl IntoIterator<Item = &'a BTreeMap<String, f64>>,
    ) -> Self {
        Self::encode(declaration, entities).0
    }

    /// Like [`FeatureColumn::values_for`], also counting integer values that
    /// fall outside the storable range and were written as the sentinel.
    pub fn encode<'a>(
        declaration: &FeatureDeclaration,
        entities: impl IntoIterator<Item = &'a BTreeMap<String, f64>>,
    ) -> (Self, usize) {
        let values = entities
            .into_iter()
            .map(|features| features.get(&declaration.key).copied());
        match declaration.kind {
            ValueKind::Int => {
                let mut dropped = 0;
                let column = values
                    .map(|value| match value {
                        None => INT_MISSING,
                        Some(v) if v.is_nan() => INT_MISSING,
                        Some(v) => to_int(v).unwrap_or_else(|| {
                            dropped += 1;
                            INT_MISSING
                        }),
                    })
                    .collect();
                (FeatureColumn::Int(column), dropped)
            }
            ValueKind::Real => (
                FeatureColumn::Real(values.map(|v| v.unwrap_or(f64::NAN)).collect()),
                0,
            ),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            FeatureColumn::Int(_) => ValueKind::Int,
            FeatureColumn::Real(_) => ValueKind::Real,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FeatureColumn::Int(v) => v.len(),
            FeatureColumn::Real(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value of one entity, or `None` for the sentinel.
    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            FeatureColumn::Int(v) => v
                .get(index)
                .copied()
                .filter(|&x| x != INT_MISSING)
                .map(f64::from),
            FeatureColumn::Real(v) => v.get(index).copied().filter(|x| !x.is_nan()),
        }
    }

    pub fn to_array(&self) -> Array {
        match self {
            FeatureColumn::Int(v) => Array::from_i32(v.clone()),
            FeatureColumn::Real(v) => Array::from_f64(v.clone()),
        }
    }

    /// Types a stored column, also returning how many 64-bit integers
    /// fell outside the storable range and read as missing.
    pub fn from_array(
        phase: Phase,
        column: &str,
        array: &Array,
    ) -> Result<(Self, usize), GeffError> {
        if array.shape().len() != 1 {
            return Err(GeffError::InvalidColumn {
                phase,
                column: column.to_string(),
                message: format!("expected one dimension, found shape {:?}", array.shape()),
            });
        }
        Ok(match array.data() {
            ArrayData::Int32(v) => (FeatureColumn::Int(v.clone()), 0),
            ArrayData::Int64(v) => {
                let mut dropped = 0;
                let values = v
                    .iter()
                    .map(|&x| match i32::try_from(x) {
                        Ok(x) if x != INT_MISSING => x,
                        _ if x == i64::from(INT_MISSING) => INT_MISSING,
                        _ => {
                            dropped += 1;
                            INT_MISSING
                        }
                    })
                    .collect();
                (FeatureColumn::Int(values), dropped)
            }
            ArrayData::Float64(v) => (FeatureColumn::Real(v.clone()), 0),
        })
    }
}

/// Rounds `value` to a storable integer. The sentinel itself and anything
/// beyond the `i32` range have no representation.
pub(crate) fn to_int(value: f64) -> Option<i32> {
    let rounded = value.round();
    (rounded > f64::from(INT_MISSING) && rounded <= f64::from(i32::MAX)).then_some(rounded as i32)
}

/// Aggregates per-key counts of unstorable integer values into one warning.
fn report_out_of_range(
    scope: FeatureScope,
    counts: &[(String, usize)],
    report: &mut CodecReport,
) {
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    if total == 0 {
        return;
    }
    let keys: Vec<String> = counts
        .iter()
        .map(|(key, n)| format!("{} ({})", key, n))
        .collect();
    let message = format!(
        "{} {} integer feature value(s) outside the 32-bit range stored as missing: {}",
        total,
        scope,
        keys.join(", ")
    );
    tracing::warn!("{}", message);
    report.add(CodecIssue::warning(
        CodecIssueCode::IntFeatureOutOfRange,
        message,
    ));
}

/// Path of the `features` group of one scope.
pub fn features_path(group: &str, scope: FeatureScope) -> String {
    join(&[group, scope.group(), "features"])
}

/// Path of one feature column.
pub fn column_path(group: &str, scope: FeatureScope, key: &str) -> String {
    join(&[&features_path(group, scope), key, "values"])
}

/// Checks that a feature key can be used as a store path segment.
pub fn check_key(scope: FeatureScope, key: &str) -> Result<(), GeffError> {
    if !is_storable_key(key) {
        return Err(GeffError::InvalidModel(format!(
            "{} feature key '{}' cannot be stored (empty, contains '/', or starts with '.')",
            scope, key
        )));
    }
    Ok(())
}

/// Returns true if `key` can name a column directory.
pub(crate) fn is_storable_key(key: &str) -> bool {
    !(key.is_empty() || key.contains('/') || key.starts_with('.'))
}

/// Writes the declarations of every scope.
pub fn declare_features<S: ArrayStore + ?Sized>(
    store: &mut S,
    group: &str,
    schema: &FeatureSchema,
) -> Result<(), GeffError> {
    for scope in FeatureScope::ALL {
        let declarations = schema.declarations(scope);
        for declaration in declarations {
            check_key(scope, &declaration.key)?;
        }

        let path = features_path(group, scope);
        let document = json!({ "declarations": declarations });
        store
            .create_group(&path)
            .map_err(GeffError::store(Phase::Features))?;
        store
            .write_attrs(&path, &document)
            .map_err(GeffError::store(Phase::Features))?;
    }
    Ok(())
}

/// Writes one column per declared feature of `scope`.
///
/// Values under keys with no declaration are dropped; they are reported
/// as one aggregated warning.
pub fn write_values<'a, S, I>(
    store: &mut S,
    group: &str,
    scope: FeatureScope,
    declarations: &[FeatureDeclaration],
    entities: I,
    report: &mut CodecReport,
) -> Result<(), GeffError>
where
    S: ArrayStore + ?Sized,
    I: IntoIterator<Item = &'a BTreeMap<String, f64>>,
    I::IntoIter: Clone,
{
    let entities = entities.into_iter();

    let declared: BTreeSet<&str> = declarations.iter().map(|d| d.key.as_str()).collect();
    let undeclared: BTreeSet<&str> = entities
        .clone()
        .flat_map(|features| features.keys())
        .map(String::as_str)
        .filter(|key| !declared.contains(key))
        .collect();
    if !undeclared.is_empty() {
        let message = format!(
            "{} undeclared {} feature(s) dropped: {}",
            undeclared.len(),
            scope,
            undeclared.into_iter().collect::<Vec<_>>().join(", ")
        );
        tracing::warn!("{}", message);
        report.add(CodecIssue::warning(CodecIssueCode::UndeclaredFeature, message));
    }

    let mut out_of_range = Vec::new();
    for declaration in declarations {
        let (column, dropped) = FeatureColumn::encode(declaration, entities.clone());
        if dropped > 0 {
            out_of_range.push((declaration.key.clone(), dropped));
        }
        store
            .write_array(&column_path(group, scope, &declaration.key), &column.to_array())
            .map_err(GeffError::store(Phase::Features))?;
    }
    report_out_of_range(scope, &out_of_range, report);
    tracing::debug!(
        "wrote {} {} feature column(s)",
        declarations.len(),
        scope
    );
    Ok(())
}

/// Feature declarations and columns read back for one scope.
#[derive(Clone, Debug, Default)]
pub struct ScopeFeatures {
    pub declarations: Vec<FeatureDeclaration>,
    pub columns: Vec<(String, FeatureColumn)>,
}

impl ScopeFeatures {
    /// Copies the non-missing values of entity `row` into `features`.
    pub fn fill(&self, row: usize, features: &mut BTreeMap<String, f64>) {
        for (key, column) in &self.columns {
            if let Some(value) = column.get(row) {
                features.insert(key.clone(), value);
            }
        }
    }

    /// Registers the declarations with `schema`.
    pub fn declare_into(&self, scope: FeatureScope, schema: &mut FeatureSchema) {
        for declaration in &self.declarations {
            schema.declare(scope, declaration.clone());
        }
    }
}

/// Reads the declarations of one scope. A scope without declarations is
/// not an error.
pub fn read_declarations<S: ArrayStore + ?Sized>(
    store: &S,
    group: &str,
    scope: FeatureScope,
) -> Result<Vec<FeatureDeclaration>, GeffError> {
    let path = features_path(group, scope);
    let attrs = store
        .read_attrs(&path)
        .map_err(GeffError::store(Phase::Features))?;
    let Some(document) = attrs.as_ref().and_then(|a| a.get("declarations")) else {
        return Ok(Vec::new());
    };
    Vec::<FeatureDeclaration>::deserialize(document).map_err(|e| GeffError::InvalidColumn {
        phase: Phase::Features,
        column: path,
        message: e.to_string(),
    })
}

/// Reads every feature column of `scope`, checking each has `rows` entries.
///
/// The stored column type wins over a declared kind. Columns without a
/// declaration get a bare one, reported as one aggregated note.
pub fn read_scope<S: ArrayStore + ?Sized>(
    store: &S,
    group: &str,
    scope: FeatureScope,
    rows: usize,
    report: &mut CodecReport,
) -> Result<ScopeFeatures, GeffError> {
    let mut declarations = read_declarations(store, group, scope)?;
    let keys = store
        .list_children(&features_path(group, scope))
        .map_err(GeffError::store(Phase::Features))?;

    let mut columns = Vec::new();
    let mut undeclared = Vec::new();
    let mut out_of_range = Vec::new();
    for key in keys {
        let path = column_path(group, scope, &key);
        let Some(array) = store
            .read_array(&path)
            .map_err(GeffError::store(Phase::Features))?
        else {
            continue;
        };

        let (column, dropped) = FeatureColumn::from_array(Phase::Features, &path, &array)?;
        if dropped > 0 {
            out_of_range.push((key.clone(), dropped));
        }
        if column.len() != rows {
            return Err(GeffError::InvalidColumn {
                phase: Phase::Features,
                column: path,
                message: format!("{} value(s) for {} {}(s)", column.len(), rows, scope),
            });
        }

        match declarations.iter_mut().find(|d| d.key == key) {
            Some(declaration) => declaration.kind = column.kind(),
            None => {
                declarations.push(FeatureDeclaration::bare(key.clone(), column.kind()));
                undeclared.push(key.clone());
            }
        }
        columns.push((key, column));
    }

    report_out_of_range(scope, &out_of_range, report);
    if !undeclared.is_empty() {
        report.add(CodecIssue::info(
            CodecIssueCode::UndeclaredFeature,
            format!(
                "{} {} feature column(s) without declaration: {}",
                undeclared.len(),
                scope,
                undeclared.join(", ")
            ),
        ));
    }
    tracing::debug!("read {} {} feature column(s)", columns.len(), scope);

    Ok(ScopeFeatures {
        declarations,
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Dimension;
    use crate::report::Direction;
    use crate::store::MemoryStore;

    fn maps(values: &[Option<f64>]) -> Vec<BTreeMap<String, f64>> {
        values
            .iter()
            .map(|v| {
                let mut m = BTreeMap::new();
                if let Some(v) = v {
                    m.insert("F".to_string(), *v);
                }
                m
            })
            .collect()
    }

    #[test]
    fn int_sentinel_for_missing_value() {
        let declaration = FeatureDeclaration::bare("F", ValueKind::Int);
        let entities = maps(&[Some(4.0), None]);
        let column = FeatureColumn::values_for(&declaration, &entities);

        assert_eq!(column, FeatureColumn::Int(vec![4, i32::MIN]));
        assert_eq!(column.get(0), Some(4.0));
        assert_eq!(column.get(1), None);
    }

    #[test]
    fn out_of_range_int_is_missing_and_reported() {
        let mut store = MemoryStore::new();
        let mut report = CodecReport::new(Direction::Export, "g");
        let declarations = [FeatureDeclaration::bare("F", ValueKind::Int)];
        let entities = maps(&[Some(3.0e9), Some(-3.0e9), Some(f64::from(i32::MIN)), Some(7.0)]);

        write_values(
            &mut store,
            "g",
            FeatureScope::Node,
            &declarations,
            &entities,
            &mut report,
        )
        .unwrap();

        let issue = report
            .issues
            .iter()
            .find(|i| i.code == CodecIssueCode::IntFeatureOutOfRange)
            .expect("out-of-range warning");
        assert!(issue.message.starts_with("3 node integer feature value(s)"));
        assert!(report.is_lossy());

        let mut import = CodecReport::new(Direction::Import, "g");
        let features = read_scope(&store, "g", FeatureScope::Node, 4, &mut import).unwrap();
        let mut values = BTreeMap::new();
        features.fill(0, &mut values);
        features.fill(1, &mut values);
        features.fill(2, &mut values);
        assert!(values.is_empty());
        features.fill(3, &mut values);
        assert_eq!(values.get("F"), Some(&7.0));
    }

    #[test]
    fn wide_int_column_reports_unreadable_values() {
        let mut store = MemoryStore::new();
        store
            .write_array(
                "g/tracks/features/N/values",
                &Array::from_i64(vec![5, 1 << 40, i64::from(i32::MIN)]),
            )
            .unwrap();

        let mut report = CodecReport::new(Direction::Import, "g");
        let features = read_scope(&store, "g", FeatureScope::Track, 3, &mut report).unwrap();

        assert_eq!(features.columns[0].1, FeatureColumn::Int(vec![5, INT_MISSING, INT_MISSING]));
        let issue = report
            .issues
            .iter()
            .find(|i| i.code == CodecIssueCode::IntFeatureOutOfRange)
            .expect("out-of-range warning");
        assert!(issue.message.starts_with("1 track integer feature value(s)"));
    }

    #[test]
    fn real_sentinel_is_nan() {
        let declaration = FeatureDeclaration::bare("F", ValueKind::Real);
        let entities = maps(&[None, Some(0.0)]);
        let column = FeatureColumn::values_for(&declaration, &entities);

        let FeatureColumn::Real(values) = &column else {
            panic!("expected a real column");
        };
        assert!(values[0].is_nan());
        assert_eq!(column.get(0), None);
        assert_eq!(column.get(1), Some(0.0));
    }

    #[test]
    fn keys_must_be_path_safe() {
        assert!(check_key(FeatureScope::Node, "MEAN_INTENSITY").is_ok());
        assert!(check_key(FeatureScope::Node, "").is_err());
        assert!(check_key(FeatureScope::Edge, "a/b").is_err());
        assert!(check_key(FeatureScope::Track, ".zattrs").is_err());
    }

    #[test]
    fn declarations_written_and_read() {
        let mut schema = FeatureSchema::default();
        schema.declare(
            FeatureScope::Edge,
            FeatureDeclaration::new("SPEED", "Speed", "V", Dimension::Velocity, ValueKind::Real),
        );

        let mut store = MemoryStore::new();
        declare_features(&mut store, "g", &schema).unwrap();

        assert_eq!(
            read_declarations(&store, "g", FeatureScope::Edge).unwrap(),
            schema.edge
        );
        assert!(read_declarations(&store, "g", FeatureScope::Node)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn undeclared_values_dropped_on_write() {
        let mut store = MemoryStore::new();
        let mut report = CodecReport::new(Direction::Export, "g");
        let declarations = [FeatureDeclaration::bare("F", ValueKind::Real)];
        let mut entities = maps(&[Some(1.0)]);
        entities[0].insert("EXTRA".into(), 2.0);

        write_values(
            &mut store,
            "g",
            FeatureScope::Node,
            &declarations,
            &entities,
            &mut report,
        )
        .unwrap();

        assert!(store.contains_array("g/nodes/features/F/values"));
        assert!(!store.contains_array("g/nodes/features/EXTRA/values"));
        assert!(report.has(CodecIssueCode::UndeclaredFeature));
        assert!(report.is_lossy());
    }

    #[test]
    fn undeclared_column_gets_bare_declaration() {
        let mut store = MemoryStore::new();
        store
            .write_array(
                "g/nodes/features/AREA/values",
                &Array::from_f64(vec![1.5, f64::NAN]),
            )
            .unwrap();

        let mut report = CodecReport::new(Direction::Import, "g");
        let features = read_scope(&store, "g", FeatureScope::Node, 2, &mut report).unwrap();

        assert_eq!(
            features.declarations,
            vec![FeatureDeclaration::bare("AREA", ValueKind::Real)]
        );
        assert!(report.has(CodecIssueCode::UndeclaredFeature));
        assert!(!report.is_lossy());

        let mut values = BTreeMap::new();
        features.fill(1, &mut values);
        assert!(values.is_empty());
        features.fill(0, &mut values);
        assert_eq!(values.get("AREA"), Some(&1.5));
    }

    #[test]
    fn column_length_must_match_rows() {
        let mut store = MemoryStore::new();
        store
            .write_array("g/edges/features/F/values", &Array::from_i32(vec![1]))
            .unwrap();

        let mut report = CodecReport::new(Direction::Import, "g");
        assert!(matches!(
            read_scope(&store, "g", FeatureScope::Edge, 3, &mut report),
            Err(GeffError::InvalidColumn { .. })
        ));
    }
}

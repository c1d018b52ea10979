//! In-memory store engine.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::{Array, ArrayStore, StoreError};

/// A store keeping everything in ordered maps.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    arrays: BTreeMap<String, Array>,
    attrs: BTreeMap<String, Value>,
    groups: BTreeSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of all arrays, sorted.
    pub fn array_paths(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(String::as_str)
    }

    fn all_paths(&self) -> impl Iterator<Item = &str> {
        self.arrays
            .keys()
            .chain(self.attrs.keys())
            .chain(self.groups.iter())
            .map(String::as_str)
    }
}

fn is_under(candidate: &str, path: &str) -> bool {
    path.is_empty()
        || candidate == path
        || (candidate.starts_with(path) && candidate[path.len()..].starts_with('/'))
}

impl ArrayStore for MemoryStore {
    fn write_array(&mut self, path: &str, array: &Array) -> Result<(), StoreError> {
        self.arrays.insert(path.to_string(), array.clone());
        Ok(())
    }

    fn read_array(&self, path: &str) -> Result<Option<Array>, StoreError> {
        Ok(self.arrays.get(path).cloned())
    }

    fn contains_array(&self, path: &str) -> bool {
        self.arrays.contains_key(path)
    }

    fn create_group(&mut self, path: &str) -> Result<(), StoreError> {
        self.groups.insert(path.to_string());
        Ok(())
    }

    fn write_attrs(&mut self, path: &str, attrs: &Value) -> Result<(), StoreError> {
        self.attrs.insert(path.to_string(), attrs.clone());
        Ok(())
    }

    fn read_attrs(&self, path: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.attrs.get(path).cloned())
    }

    fn list_children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let prefix_len = if path.is_empty() { 0 } else { path.len() + 1 };
        let children: BTreeSet<String> = self
            .all_paths()
            .filter(|p| *p != path && is_under(p, path))
            .filter_map(|p| p[prefix_len..].split('/').next())
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        Ok(children.into_iter().collect())
    }

    fn remove(&mut self, path: &str) -> Result<(), StoreError> {
        self.arrays.retain(|p, _| !is_under(p, path));
        self.attrs.retain(|p, _| !is_under(p, path));
        self.groups.retain(|p| !is_under(p, path));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn write_then_read_array() {
        let mut store = MemoryStore::new();
        store
            .write_array("g/nodes/ids", &Array::from_i64(vec![1, 2, 3]))
            .unwrap();

        let array = store.read_array("g/nodes/ids").unwrap().expect("array present");
        assert_eq!(array.to_i64_vec(), Some(vec![1, 2, 3]));
        assert!(store.read_array("g/nodes/missing").unwrap().is_none());
    }

    #[test]
    fn children_are_direct_segments() {
        let mut store = MemoryStore::new();
        store.create_group("g").unwrap();
        store.write_array("g/nodes/ids", &Array::from_i64(vec![])).unwrap();
        store.write_array("g/edges/ids", &Array::from_i64(vec![])).unwrap();
        store.write_attrs("g", &json!({"geff": {}})).unwrap();

        assert_eq!(store.list_children("g").unwrap(), vec!["edges", "nodes"]);
        assert_eq!(store.list_children("").unwrap(), vec!["g"]);
        assert_eq!(store.list_children("g/nodes").unwrap(), vec!["ids"]);
    }

    #[test]
    fn remove_is_prefix_aware() {
        let mut store = MemoryStore::new();
        store.write_array("g/nodes/ids", &Array::from_i64(vec![])).unwrap();
        store.write_array("g2/nodes/ids", &Array::from_i64(vec![])).unwrap();

        store.remove("g").unwrap();
        assert!(!store.contains_array("g/nodes/ids"));
        assert!(store.contains_array("g2/nodes/ids"));
    }
}

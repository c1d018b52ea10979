//! Track reconstruction and the persisted track table.
//!
//! The store has no native notion of a track. On import, tracks are the
//! connected components of the undirected link graph, with every unlinked
//! detection forming its own component. Numbering is deterministic for a
//! given row order but carries no identity: ids are handed out from a base
//! offset each time.
//!
//! On export the model's tracks are also written to a small table (id,
//! visibility, name, features). A component whose members all carry the
//! same segment id found in that table can take its attributes back.

use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Bfs;
use serde_json::{json, Map, Value};

use super::columns::{self, ids_path, prop_path};
use super::features::ScopeFeatures;
use crate::error::{GeffError, Phase};
use crate::model::{Detection, Link, Track, TrackingModel};
use crate::store::{join, Array, ArrayStore};

const ENTITY: &str = "tracks";

/// One connected component, as indices into the detection and link lists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Component {
    /// Member detections, ascending.
    pub detections: Vec<usize>,
    /// Member links, ascending.
    pub links: Vec<usize>,
}

/// Partitions `detection_count` detections into connected components.
///
/// `edges` holds one (source, target) pair of detection indices per link;
/// the link index is its position in the slice. Pairs referring to an
/// index past `detection_count` are ignored. Components come out in order
/// of their lowest detection index, so every detection lands in exactly
/// one of them.
pub fn partition(detection_count: usize, edges: &[(usize, usize)]) -> Vec<Component> {
    let mut graph = UnGraph::<(), usize>::with_capacity(detection_count, edges.len());
    for _ in 0..detection_count {
        graph.add_node(());
    }
    for (link, &(source, target)) in edges.iter().enumerate() {
        if source < detection_count && target < detection_count {
            graph.add_edge(NodeIndex::new(source), NodeIndex::new(target), link);
        }
    }

    let mut visited = vec![false; detection_count];
    let mut components = Vec::new();
    for start in 0..detection_count {
        if visited[start] {
            continue;
        }

        let mut component = Component::default();
        let mut bfs = Bfs::new(&graph, NodeIndex::new(start));
        while let Some(node) = bfs.next(&graph) {
            visited[node.index()] = true;
            component.detections.push(node.index());
            component
                .links
                .extend(graph.edges(node).map(|edge| *edge.weight()));
        }

        component.detections.sort_unstable();
        component.links.sort_unstable();
        component.links.dedup();
        components.push(component);
    }
    components
}

/// Turns components into tracks numbered `base`, `base + 1`, ..., visible
/// and named "Track {id}".
pub fn assign_tracks(
    components: &[Component],
    detections: &[Detection],
    links: &[Link],
    base: u32,
) -> Vec<Track> {
    components
        .iter()
        .enumerate()
        .map(|(k, component)| {
            Track::new(i64::from(base) + k as i64).with_members(
                component.detections.iter().map(|&d| detections[d].id),
                component.links.iter().map(|&l| links[l].id),
            )
        })
        .collect()
}

/// Track attributes persisted next to the graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackTable {
    pub ids: Vec<i64>,
    pub visible: Vec<bool>,
    pub names: Vec<String>,
}

impl TrackTable {
    pub fn from_model(model: &TrackingModel) -> Self {
        Self {
            ids: model.tracks.iter().map(|t| t.id.as_i64()).collect(),
            visible: model.tracks.iter().map(|t| t.visible).collect(),
            names: model.tracks.iter().map(|t| t.name.clone()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Maps each stored track id to its row. A repeated id keeps its
    /// first row.
    pub fn row_index(&self) -> HashMap<i64, usize> {
        let mut rows = HashMap::with_capacity(self.ids.len());
        for (row, &id) in self.ids.iter().enumerate() {
            rows.entry(id).or_insert(row);
        }
        rows
    }

    pub fn write<S: ArrayStore + ?Sized>(&self, store: &mut S, group: &str) -> Result<(), GeffError> {
        let phase = Phase::Tracks;
        let path = join(&[group, ENTITY]);
        columns::write(store, phase, &ids_path(group, ENTITY), &Array::from_i64(self.ids.clone()))?;
        columns::write(
            store,
            phase,
            &prop_path(group, ENTITY, "visible"),
            &Array::from_i32(self.visible.iter().map(|&v| i32::from(v)).collect()),
        )?;

        let names: Map<String, Value> = self
            .ids
            .iter()
            .zip(&self.names)
            .map(|(id, name)| (id.to_string(), Value::from(name.as_str())))
            .collect();
        store
            .write_attrs(&path, &json!({ "names": names }))
            .map_err(GeffError::store(phase))?;

        tracing::debug!("wrote {} track(s)", self.len());
        Ok(())
    }

    /// Reads the track table, or `None` if the store has none.
    pub fn read<S: ArrayStore + ?Sized>(store: &S, group: &str) -> Result<Option<Self>, GeffError> {
        let phase = Phase::Tracks;
        let Some(ids) = columns::read(store, phase, &ids_path(group, ENTITY))? else {
            return Ok(None);
        };
        let rows = ids.rows();
        let ids = columns::integers(phase, "ids", &ids, rows)?;

        let visible = match columns::read(store, phase, &prop_path(group, ENTITY, "visible"))? {
            Some(array) => columns::integers(phase, "visible", &array, rows)?
                .into_iter()
                .map(|v| v != 0)
                .collect(),
            None => vec![true; rows],
        };

        let attrs = store
            .read_attrs(&join(&[group, ENTITY]))
            .map_err(GeffError::store(phase))?;
        let names = ids
            .iter()
            .map(|id| {
                attrs
                    .as_ref()
                    .and_then(|a| a.get("names"))
                    .and_then(|n| n.get(id.to_string()))
                    .and_then(Value::as_str)
                    .map_or_else(|| format!("Track {}", id), str::to_string)
            })
            .collect();

        Ok(Some(Self { ids, visible, names }))
    }
}

/// Copies persisted attributes onto rebuilt tracks.
///
/// A track takes them from table row `r` when every member detection has
/// segment hint `table.ids[r]`. Track features always come back; visibility
/// and name only when `restore_visibility_and_name` is set. Returns the
/// number of tracks that matched.
pub fn restore_attributes(
    tracks: &mut [Track],
    detections: &[Detection],
    table: &TrackTable,
    features: &ScopeFeatures,
    restore_visibility_and_name: bool,
) -> usize {
    let handles: HashMap<_, _> = detections
        .iter()
        .enumerate()
        .map(|(handle, d)| (d.id, handle))
        .collect();

    let rows = table.row_index();

    let mut restored = 0;
    for track in tracks.iter_mut() {
        let mut hints = track
            .detections
            .iter()
            .map(|id| handles.get(id).and_then(|&h| detections[h].track_hint));
        let Some(Some(hint)) = hints.next() else {
            continue;
        };
        if !hints.all(|h| h == Some(hint)) {
            continue;
        }
        let Some(&row) = rows.get(&hint) else {
            continue;
        };

        features.fill(row, &mut track.features);
        if restore_visibility_and_name {
            track.visible = table.visible[row];
            track.name = table.names[row].clone();
        }
        restored += 1;
    }
    restored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geff::features::FeatureColumn;
    use crate::model::{DetectionId, LinkId, TrackId};
    use crate::store::MemoryStore;

    fn ids(component: &Component, detections: &[i64]) -> Vec<i64> {
        component.detections.iter().map(|&d| detections[d]).collect()
    }

    #[test]
    fn partition_three_components() {
        let detection_ids = [1, 2, 3, 4, 5, 6];
        // (1,2), (2,3), (4,5) as indices
        let components = partition(6, &[(0, 1), (1, 2), (3, 4)]);

        assert_eq!(components.len(), 3);
        assert_eq!(ids(&components[0], &detection_ids), vec![1, 2, 3]);
        assert_eq!(ids(&components[1], &detection_ids), vec![4, 5]);
        assert_eq!(ids(&components[2], &detection_ids), vec![6]);
        assert_eq!(components[0].links, vec![0, 1]);
        assert_eq!(components[1].links, vec![2]);
        assert!(components[2].links.is_empty());
    }

    #[test]
    fn partition_is_total() {
        let components = partition(5, &[(4, 0), (2, 2), (7, 1)]);
        let mut all: Vec<usize> = components
            .iter()
            .flat_map(|c| c.detections.iter().copied())
            .collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
        assert_eq!(components[0].detections, vec![0, 4]);
        assert_eq!(components.len(), 4);
    }

    #[test]
    fn partition_of_nothing() {
        assert!(partition(0, &[]).is_empty());
    }

    #[test]
    fn tracks_numbered_from_base() {
        let detections = vec![
            Detection::new(10, [0.0; 3], 0, 1.0),
            Detection::new(11, [0.0; 3], 1, 1.0),
            Detection::new(12, [0.0; 3], 0, 1.0),
        ];
        let links = vec![Link::new(7, 10, 11, 0.0)];
        let components = partition(3, &[(0, 1)]);
        let tracks = assign_tracks(&components, &detections, &links, 200);

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].id, TrackId(200));
        assert_eq!(tracks[0].name, "Track 200");
        assert!(tracks[0].visible);
        assert_eq!(tracks[0].detections, vec![DetectionId(10), DetectionId(11)]);
        assert_eq!(tracks[0].links, vec![LinkId(7)]);
        assert_eq!(tracks[1].id, TrackId(201));
        assert_eq!(tracks[1].detections, vec![DetectionId(12)]);
    }

    #[test]
    fn table_survives_the_store() {
        let table = TrackTable {
            ids: vec![3, 8],
            visible: vec![true, false],
            names: vec!["mother".into(), "Track 8".into()],
        };
        let mut store = MemoryStore::new();
        table.write(&mut store, "g").unwrap();

        assert_eq!(TrackTable::read(&store, "g").unwrap(), Some(table));
        assert_eq!(TrackTable::read(&MemoryStore::new(), "g").unwrap(), None);
    }

    #[test]
    fn row_index_keeps_first_row() {
        let table = TrackTable {
            ids: vec![5, 9, 5],
            visible: vec![true; 3],
            names: vec!["a".into(), "b".into(), "c".into()],
        };

        let rows = table.row_index();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[&5], 0);
        assert_eq!(rows[&9], 1);
    }

    #[test]
    fn restore_requires_consistent_hints() {
        let mut detections = vec![
            Detection::new(1, [0.0; 3], 0, 1.0),
            Detection::new(2, [0.0; 3], 1, 1.0),
            Detection::new(3, [0.0; 3], 0, 1.0),
            Detection::new(4, [0.0; 3], 1, 1.0),
        ];
        detections[0].track_hint = Some(8);
        detections[1].track_hint = Some(8);
        detections[2].track_hint = Some(8);
        detections[3].track_hint = Some(3);

        let links = vec![Link::new(0, 1, 2, 1.0), Link::new(1, 3, 4, 1.0)];
        let components = partition(4, &[(0, 1), (2, 3)]);
        let mut tracks = assign_tracks(&components, &detections, &links, 200);

        let table = TrackTable {
            ids: vec![3, 8],
            visible: vec![true, false],
            names: vec!["other".into(), "mother".into()],
        };
        let features = ScopeFeatures {
            declarations: vec![],
            columns: vec![("LENGTH".into(), FeatureColumn::Real(vec![1.0, 2.0]))],
        };

        let restored = restore_attributes(&mut tracks, &detections, &table, &features, true);
        assert_eq!(restored, 1);
        assert_eq!(tracks[0].name, "mother");
        assert!(!tracks[0].visible);
        assert_eq!(tracks[0].features.get("LENGTH"), Some(&2.0));
        assert_eq!(tracks[1].name, "Track 201");
        assert!(tracks[1].features.is_empty());
    }

    #[test]
    fn restore_features_only_by_default() {
        let mut detections = vec![Detection::new(1, [0.0; 3], 0, 1.0)];
        detections[0].track_hint = Some(5);
        let mut tracks = assign_tracks(&partition(1, &[]), &detections, &[], 200);
        let table = TrackTable {
            ids: vec![5],
            visible: vec![false],
            names: vec!["kept".into()],
        };
        let features = ScopeFeatures {
            declarations: vec![],
            columns: vec![("N".into(), FeatureColumn::Int(vec![4]))],
        };

        restore_attributes(&mut tracks, &detections, &table, &features, false);
        assert_eq!(tracks[0].name, "Track 200");
        assert!(tracks[0].visible);
        assert_eq!(tracks[0].features.get("N"), Some(&4.0));
    }
}

/// In-memory storage implementation
///
/// Layout:
/// - Vertices and edges live in insertion-ordered arenas
/// - id → arena position indexes for O(1) lookup
/// - Out/in adjacency lists hold edge positions per vertex id
///
/// All state sits behind one `RwLock`: mutations hold the write lock for the
/// whole call, so a failed call never leaves partial state behind.

use super::error::{StorageError, StorageResult};
use super::GraphStorage;
use crate::types::{Edge, Vertex, ID_KEY, LABEL_KEY};
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct GraphState {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    vertex_index: HashMap<String, usize>,
    edge_index: HashMap<String, usize>,
    out_adjacency: HashMap<String, Vec<usize>>,
    in_adjacency: HashMap<String, Vec<usize>>,
    /// Last id handed out by the counter
    id_counter: u64,
}

impl GraphState {
    fn contains_id(&self, id: &str) -> bool {
        self.vertex_index.contains_key(id) || self.edge_index.contains_key(id)
    }

    fn claim_id(&mut self, requested: Option<&str>) -> StorageResult<String> {
        match requested {
            Some(id) => {
                if id.is_empty() {
                    return Err(StorageError::InvalidArgument("empty element id".into()));
                }
                if self.contains_id(id) {
                    return Err(StorageError::DuplicateId(id.to_string()));
                }
                Ok(id.to_string())
            }
            None => loop {
                self.id_counter = self
                    .id_counter
                    .checked_add(1)
                    .ok_or(StorageError::CounterOverflow)?;
                let candidate = self.id_counter.to_string();
                if !self.contains_id(&candidate) {
                    return Ok(candidate);
                }
            },
        }
    }

    fn edges_at(&self, positions: Option<&Vec<usize>>) -> Vec<Edge> {
        positions
            .map(|list| list.iter().map(|&pos| self.edges[pos].clone()).collect())
            .unwrap_or_default()
    }
}

/// In-memory graph storage
pub struct MemoryStorage {
    /// Graph name (namespace)
    graph_name: String,

    state: RwLock<GraphState>,
}

impl MemoryStorage {
    /// Create an empty graph
    ///
    /// # Arguments
    /// * `graph_name` - Name of the graph (namespace)
    pub fn new(graph_name: impl Into<String>) -> Self {
        Self {
            graph_name: graph_name.into(),
            state: RwLock::new(GraphState::default()),
        }
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("MemoryStorage")
            .field("graph_name", &self.graph_name)
            .field("vertices", &state.vertices.len())
            .field("edges", &state.edges.len())
            .finish()
    }
}

fn validate_label(label: &str) -> StorageResult<()> {
    if label.is_empty() {
        return Err(StorageError::InvalidArgument("label must not be empty".into()));
    }
    Ok(())
}

fn validate_property(key: &str, value: &JsonValue) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidArgument("property key must not be empty".into()));
    }
    if key == ID_KEY || key == LABEL_KEY {
        return Err(StorageError::InvalidArgument(format!(
            "property key '{}' is reserved",
            key
        )));
    }
    if value.is_null() {
        return Err(StorageError::InvalidArgument(format!(
            "property '{}' must not be null",
            key
        )));
    }
    Ok(())
}

impl GraphStorage for MemoryStorage {
    fn graph_name(&self) -> &str {
        &self.graph_name
    }

    fn get_vertex(&self, id: &str) -> StorageResult<Option<Vertex>> {
        let state = self.state.read();
        Ok(state
            .vertex_index
            .get(id)
            .map(|&pos| state.vertices[pos].clone()))
    }

    fn get_edge(&self, id: &str) -> StorageResult<Option<Edge>> {
        let state = self.state.read();
        Ok(state.edge_index.get(id).map(|&pos| state.edges[pos].clone()))
    }

    fn create_vertex(
        &self,
        id: Option<&str>,
        label: &str,
        properties: &[(String, JsonValue)],
    ) -> StorageResult<Vertex> {
        validate_label(label)?;
        for (key, value) in properties {
            validate_property(key, value)?;
        }

        let mut state = self.state.write();
        let id = state.claim_id(id)?;

        let mut vertex = Vertex::new(id.clone(), label);
        for (key, value) in properties {
            vertex.add_property(key.clone(), value.clone());
        }

        let position = state.vertices.len();
        state.vertices.push(vertex.clone());
        state.vertex_index.insert(id, position);

        tracing::debug!(graph = %self.graph_name, id = %vertex.id, label, "created vertex");
        Ok(vertex)
    }

    fn create_edge(
        &self,
        id: Option<&str>,
        label: &str,
        out_v: &str,
        in_v: &str,
        properties: &[(String, JsonValue)],
    ) -> StorageResult<Edge> {
        validate_label(label)?;
        for (key, value) in properties {
            validate_property(key, value)?;
        }

        let mut state = self.state.write();
        if !state.vertex_index.contains_key(out_v) {
            return Err(StorageError::VertexNotFound(out_v.to_string()));
        }
        if !state.vertex_index.contains_key(in_v) {
            return Err(StorageError::VertexNotFound(in_v.to_string()));
        }
        let id = state.claim_id(id)?;

        let mut edge = Edge::new(id.clone(), label, out_v, in_v);
        for (key, value) in properties {
            edge.set_property(key.clone(), value.clone());
        }

        let position = state.edges.len();
        state.edges.push(edge.clone());
        state.edge_index.insert(id, position);
        state
            .out_adjacency
            .entry(out_v.to_string())
            .or_default()
            .push(position);
        state
            .in_adjacency
            .entry(in_v.to_string())
            .or_default()
            .push(position);

        tracing::debug!(
            graph = %self.graph_name,
            id = %edge.id,
            label,
            out_v,
            in_v,
            "created edge"
        );
        Ok(edge)
    }

    fn set_vertex_property(&self, id: &str, key: &str, value: JsonValue) -> StorageResult<Vertex> {
        validate_property(key, &value)?;

        let mut state = self.state.write();
        let position = *state
            .vertex_index
            .get(id)
            .ok_or_else(|| StorageError::VertexNotFound(id.to_string()))?;
        let vertex = &mut state.vertices[position];
        vertex.add_property(key, value);

        tracing::trace!(graph = %self.graph_name, id, key, "appended vertex property");
        Ok(vertex.clone())
    }

    fn set_edge_property(&self, id: &str, key: &str, value: JsonValue) -> StorageResult<Edge> {
        validate_property(key, &value)?;

        let mut state = self.state.write();
        let position = *state
            .edge_index
            .get(id)
            .ok_or_else(|| StorageError::EdgeNotFound(id.to_string()))?;
        let edge = &mut state.edges[position];
        edge.set_property(key, value);

        tracing::trace!(graph = %self.graph_name, id, key, "set edge property");
        Ok(edge.clone())
    }

    fn set_property(&self, element_id: &str, key: &str, value: JsonValue) -> StorageResult<()> {
        validate_property(key, &value)?;

        let mut state = self.state.write();
        if let Some(&position) = state.vertex_index.get(element_id) {
            state.vertices[position].add_property(key, value);
        } else if let Some(&position) = state.edge_index.get(element_id) {
            state.edges[position].set_property(key, value);
        } else {
            return Err(StorageError::ElementNotFound(element_id.to_string()));
        }

        tracing::trace!(graph = %self.graph_name, id = element_id, key, "set property");
        Ok(())
    }

    fn vertex_from(
        &self,
        position: usize,
        label: Option<&str>,
    ) -> StorageResult<Option<(usize, Vertex)>> {
        let state = self.state.read();
        Ok(state
            .vertices
            .iter()
            .enumerate()
            .skip(position)
            .find(|(_, v)| label.map_or(true, |l| v.label == l))
            .map(|(pos, v)| (pos, v.clone())))
    }

    fn edge_from(
        &self,
        position: usize,
        label: Option<&str>,
    ) -> StorageResult<Option<(usize, Edge)>> {
        let state = self.state.read();
        Ok(state
            .edges
            .iter()
            .enumerate()
            .skip(position)
            .find(|(_, e)| label.map_or(true, |l| e.label == l))
            .map(|(pos, e)| (pos, e.clone())))
    }

    fn get_outgoing_edges(&self, vid: &str) -> StorageResult<Vec<Edge>> {
        let state = self.state.read();
        Ok(state.edges_at(state.out_adjacency.get(vid)))
    }

    fn get_incoming_edges(&self, vid: &str) -> StorageResult<Vec<Edge>> {
        let state = self.state.read();
        Ok(state.edges_at(state.in_adjacency.get(vid)))
    }

    fn vertex_count(&self) -> usize {
        self.state.read().vertices.len()
    }

    fn edge_count(&self) -> usize {
        self.state.read().edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_storage() -> MemoryStorage {
        MemoryStorage::new("test_graph")
    }

    #[test]
    fn test_create_and_get_vertex() {
        let storage = create_test_storage();

        let vertex = storage
            .create_vertex(Some("1"), "person", &[("name".into(), json!("Alice"))])
            .unwrap();
        assert_eq!(vertex.id, "1");

        let retrieved = storage.get_vertex("1").unwrap().unwrap();
        assert_eq!(retrieved.label, "person");
        assert_eq!(retrieved.get_property("name"), Some(&json!("Alice")));
        assert!(storage.get_vertex("2").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_vertex_id() {
        let storage = create_test_storage();
        storage.create_vertex(Some("1"), "person", &[]).unwrap();

        let result = storage.create_vertex(Some("1"), "software", &[]);
        assert_eq!(result, Err(StorageError::DuplicateId("1".into())));
        assert_eq!(storage.vertex_count(), 1);
        assert_eq!(storage.get_vertex("1").unwrap().unwrap().label, "person");
    }

    #[test]
    fn test_generated_ids_skip_taken_ids() {
        let storage = create_test_storage();
        storage.create_vertex(Some("1"), "person", &[]).unwrap();

        let generated = storage.create_vertex(None, "person", &[]).unwrap();
        assert_eq!(generated.id, "2");

        let next = storage.create_vertex(None, "person", &[]).unwrap();
        assert_eq!(next.id, "3");
    }

    #[test]
    fn test_create_edge_missing_endpoint_leaves_graph_unchanged() {
        let storage = create_test_storage();
        storage.create_vertex(Some("1"), "person", &[]).unwrap();

        let result = storage.create_edge(Some("e1"), "knows", "1", "2", &[]);
        assert_eq!(result, Err(StorageError::VertexNotFound("2".into())));

        let result = storage.create_edge(Some("e1"), "knows", "0", "1", &[]);
        assert!(result.unwrap_err().is_not_found());

        assert_eq!(storage.edge_count(), 0);
        assert!(storage.get_outgoing_edges("1").unwrap().is_empty());
        assert!(storage.get_incoming_edges("1").unwrap().is_empty());
    }

    #[test]
    fn test_edge_and_vertex_ids_share_namespace() {
        let storage = create_test_storage();
        storage.create_vertex(Some("1"), "person", &[]).unwrap();
        storage.create_vertex(Some("2"), "person", &[]).unwrap();

        let result = storage.create_edge(Some("1"), "knows", "1", "2", &[]);
        assert_eq!(result, Err(StorageError::DuplicateId("1".into())));

        storage.create_edge(Some("e1"), "knows", "1", "2", &[]).unwrap();
        let result = storage.create_vertex(Some("e1"), "person", &[]);
        assert_eq!(result, Err(StorageError::DuplicateId("e1".into())));
    }

    #[test]
    fn test_set_property_appends_on_vertex_and_overwrites_on_edge() {
        let storage = create_test_storage();
        storage.create_vertex(Some("1"), "person", &[]).unwrap();
        storage.create_vertex(Some("2"), "person", &[]).unwrap();
        storage.create_edge(Some("e1"), "knows", "1", "2", &[]).unwrap();

        storage.set_property("1", "name", json!("Alice")).unwrap();
        storage.set_property("1", "name", json!("Ally")).unwrap();
        storage.set_property("e1", "since", json!(2020)).unwrap();
        storage.set_property("e1", "since", json!(2023)).unwrap();

        let vertex = storage.get_vertex("1").unwrap().unwrap();
        assert_eq!(vertex.property_values("name"), &[json!("Alice"), json!("Ally")]);

        let edge = storage.get_edge("e1").unwrap().unwrap();
        assert_eq!(edge.get_property("since"), Some(&json!(2023)));

        let result = storage.set_property("missing", "name", json!("x"));
        assert_eq!(result, Err(StorageError::ElementNotFound("missing".into())));
    }

    #[test]
    fn test_reserved_and_null_properties_rejected() {
        let storage = create_test_storage();
        storage.create_vertex(Some("1"), "person", &[]).unwrap();

        assert!(matches!(
            storage.set_property("1", "id", json!("2")),
            Err(StorageError::InvalidArgument(_))
        ));
        assert!(matches!(
            storage.set_property("1", "name", JsonValue::Null),
            Err(StorageError::InvalidArgument(_))
        ));
        assert!(matches!(
            storage.create_vertex(None, "", &[]),
            Err(StorageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_vertex_from_respects_label_and_order() {
        let storage = create_test_storage();
        storage.create_vertex(Some("a"), "person", &[]).unwrap();
        storage.create_vertex(Some("b"), "software", &[]).unwrap();
        storage.create_vertex(Some("c"), "person", &[]).unwrap();

        let (pos, first) = storage.vertex_from(0, Some("person")).unwrap().unwrap();
        assert_eq!((pos, first.id.as_str()), (0, "a"));

        let (pos, second) = storage.vertex_from(pos + 1, Some("person")).unwrap().unwrap();
        assert_eq!((pos, second.id.as_str()), (2, "c"));

        assert!(storage.vertex_from(pos + 1, Some("person")).unwrap().is_none());
    }

    #[test]
    fn test_outgoing_incoming_edges() {
        let storage = create_test_storage();
        for id in ["1", "2", "3"] {
            storage.create_vertex(Some(id), "person", &[]).unwrap();
        }

        storage.create_edge(None, "knows", "1", "2", &[]).unwrap();
        storage.create_edge(None, "knows", "1", "3", &[]).unwrap();

        let outgoing = storage.get_outgoing_edges("1").unwrap();
        assert_eq!(outgoing.len(), 2);
        assert_eq!(outgoing[0].in_v, "2");
        assert_eq!(outgoing[1].in_v, "3");

        let incoming = storage.get_incoming_edges("2").unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].out_v, "1");
    }
}

use super::ElementId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Vertex (Node) in the graph
///
/// Represents a graph vertex with:
/// - Unique identifier (string)
/// - Label (type/class of the vertex)
/// - Properties where every key maps to an ordered list of values
///
/// Setting a property on a vertex appends to the key's value list, so a
/// vertex can carry several values under the same key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vertex {
    /// Unique identifier
    pub id: ElementId,

    /// Vertex label (e.g., "person", "software")
    pub label: String,

    /// Multi-valued properties, keyed in sorted order
    #[serde(default)]
    pub properties: BTreeMap<String, Vec<JsonValue>>,
}

impl Vertex {
    /// Create a vertex with an empty property map
    pub fn new(id: impl Into<ElementId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Get the first value stored under a key
    pub fn get_property(&self, key: &str) -> Option<&JsonValue> {
        self.properties.get(key).and_then(|values| values.first())
    }

    /// Get every value stored under a key, in insertion order
    pub fn property_values(&self, key: &str) -> &[JsonValue] {
        self.properties
            .get(key)
            .map(|values| values.as_slice())
            .unwrap_or(&[])
    }

    /// Append a value to a property
    pub fn add_property(&mut self, key: impl Into<String>, value: JsonValue) {
        self.properties.entry(key.into()).or_default().push(value);
    }

    /// Remove a property and all of its values
    pub fn remove_property(&mut self, key: &str) -> Option<Vec<JsonValue>> {
        self.properties.remove(key)
    }

    /// Get all property keys
    pub fn property_keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    /// Check if vertex has a specific property
    pub fn has_property(&self, key: &str) -> bool {
        self.properties
            .get(key)
            .map(|values| !values.is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vertex_creation() {
        let vertex = Vertex::new("1", "person");

        assert_eq!(vertex.id, "1");
        assert_eq!(vertex.label, "person");
        assert!(vertex.property_keys().is_empty());
    }

    #[test]
    fn test_vertex_multi_valued_property() {
        let mut vertex = Vertex::new("1", "person");

        vertex.add_property("nickname", json!("Al"));
        vertex.add_property("nickname", json!("Ally"));

        assert_eq!(vertex.get_property("nickname"), Some(&json!("Al")));
        assert_eq!(
            vertex.property_values("nickname"),
            &[json!("Al"), json!("Ally")]
        );
    }

    #[test]
    fn test_vertex_remove_property() {
        let mut vertex = Vertex::new("1", "person");
        vertex.add_property("name", json!("Alice"));
        vertex.add_property("age", json!(30));

        let removed = vertex.remove_property("age");
        assert_eq!(removed, Some(vec![json!(30)]));
        assert!(!vertex.has_property("age"));
        assert!(vertex.has_property("name"));
    }

    #[test]
    fn test_vertex_property_keys_sorted() {
        let mut vertex = Vertex::new("1", "person");
        vertex.add_property("name", json!("Alice"));
        vertex.add_property("city", json!("Beijing"));
        vertex.add_property("age", json!(30));

        assert_eq!(vertex.property_keys(), vec!["age", "city", "name"]);
        assert!(vertex.property_values("missing").is_empty());
    }

    #[test]
    fn test_vertex_serialization() {
        let mut vertex = Vertex::new("1", "person");
        vertex.add_property("name", json!("Alice"));

        let serialized = serde_json::to_string(&vertex).unwrap();
        let deserialized: Vertex = serde_json::from_str(&serialized).unwrap();

        assert_eq!(vertex, deserialized);
    }
}

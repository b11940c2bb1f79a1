use super::ElementId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Edge (Relationship) in the graph
///
/// Represents a directed edge with:
/// - Unique identifier (string)
/// - Out vertex ID (tail)
/// - In vertex ID (head)
/// - Label (type/class of the edge)
/// - Single-valued properties
///
/// The endpoint pair is fixed at creation; only properties change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    /// Unique identifier
    pub id: ElementId,

    /// Edge label (e.g., "knows", "created")
    pub label: String,

    /// Out vertex ID (source)
    pub out_v: ElementId,

    /// In vertex ID (target)
    pub in_v: ElementId,

    /// Properties, keyed in sorted order
    #[serde(default)]
    pub properties: BTreeMap<String, JsonValue>,
}

impl Edge {
    /// Create an edge with an empty property map
    pub fn new(
        id: impl Into<ElementId>,
        label: impl Into<String>,
        out_v: impl Into<ElementId>,
        in_v: impl Into<ElementId>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            out_v: out_v.into(),
            in_v: in_v.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Get a property value by key
    pub fn get_property(&self, key: &str) -> Option<&JsonValue> {
        self.properties.get(key)
    }

    /// Set a property value, replacing any previous one
    pub fn set_property(&mut self, key: impl Into<String>, value: JsonValue) -> Option<JsonValue> {
        self.properties.insert(key.into(), value)
    }

    /// Remove a property
    pub fn remove_property(&mut self, key: &str) -> Option<JsonValue> {
        self.properties.remove(key)
    }

    /// Get all property keys
    pub fn property_keys(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    /// Check if edge has a specific property
    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Check if this edge is a self-loop
    pub fn is_self_loop(&self) -> bool {
        self.out_v == self.in_v
    }

    /// The endpoint opposite to `vertex_id`, if the edge touches it
    pub fn other_end(&self, vertex_id: &str) -> Option<&str> {
        if self.out_v == vertex_id {
            Some(&self.in_v)
        } else if self.in_v == vertex_id {
            Some(&self.out_v)
        } else {
            None
        }
    }
}

/// Traversal engine
///
/// A traversal is an ordered list of steps. Steps are only recorded while the
/// traversal is built; a terminal (`next`, `to_list`, ...) compiles them into
/// a chain of lazy iterators and pulls from the end of the chain. Nothing is
/// cached between terminals, so every terminal re-executes the whole chain
/// against the current state of the store.

mod builder;
mod evaluator;
mod step;

pub use builder::{GraphTraversalSource, Traversal, TraversalIter, __};
pub use step::{Direction, Ids, Keys, Labels, Step, StrList, T};

use crate::storage::StorageError;
use crate::types::{Edge, Vertex, ID_KEY, LABEL_KEY};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Execution errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// Transport failure, or the owning session is closed
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Duplicate element id: {0}")]
    DuplicateId(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// `next()` on an empty result sequence
    #[error("No such element: the traversal produced no results")]
    NoSuchElement,

    #[error("Deadline exceeded before the traversal completed")]
    DeadlineExceeded,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for ExecutionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateId(id) => ExecutionError::DuplicateId(id),
            StorageError::VertexNotFound(id) => ExecutionError::NotFound(format!("vertex {}", id)),
            StorageError::EdgeNotFound(id) => ExecutionError::NotFound(format!("edge {}", id)),
            StorageError::ElementNotFound(id) => {
                ExecutionError::NotFound(format!("element {}", id))
            }
            StorageError::InvalidArgument(msg) => ExecutionError::InvalidArgument(msg),
            other => ExecutionError::Storage(other),
        }
    }
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// A value flowing through a traversal
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Vertex(Vertex),
    Edge(Edge),
}

impl Value {
    pub fn as_vertex(&self) -> ExecutionResult<&Vertex> {
        match self {
            Value::Vertex(v) => Ok(v),
            _ => Err(self.mismatch("Vertex")),
        }
    }

    pub fn as_edge(&self) -> ExecutionResult<&Edge> {
        match self {
            Value::Edge(e) => Ok(e),
            _ => Err(self.mismatch("Edge")),
        }
    }

    /// Id of the vertex or edge this value holds
    pub fn element_id(&self) -> ExecutionResult<&str> {
        match self {
            Value::Vertex(v) => Ok(&v.id),
            Value::Edge(e) => Ok(&e.id),
            _ => Err(self.mismatch("Vertex or Edge")),
        }
    }

    /// Label of the vertex or edge this value holds
    pub fn element_label(&self) -> Option<&str> {
        match self {
            Value::Vertex(v) => Some(&v.label),
            Value::Edge(e) => Some(&e.label),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> ExecutionResult<i64> {
        match self {
            Value::Integer(i) => Ok(*i),
            _ => Err(self.mismatch("Integer")),
        }
    }

    pub fn as_str(&self) -> ExecutionResult<&str> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(self.mismatch("String")),
        }
    }

    pub fn as_bool(&self) -> ExecutionResult<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            _ => Err(self.mismatch("Boolean")),
        }
    }

    pub fn as_map(&self) -> ExecutionResult<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Ok(m),
            _ => Err(self.mismatch("Map")),
        }
    }

    pub fn as_list(&self) -> ExecutionResult<&[Value]> {
        match self {
            Value::List(l) => Ok(l),
            _ => Err(self.mismatch("List")),
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Vertex(_) => "Vertex",
            Value::Edge(_) => "Edge",
        }
    }

    fn mismatch(&self, expected: &str) -> ExecutionError {
        ExecutionError::TypeMismatch {
            expected: expected.to_string(),
            actual: self.type_name().to_string(),
        }
    }

    /// Render as plain JSON (vertices and edges become objects)
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::Integer(i) => JsonValue::from(*i),
            Value::Float(f) => JsonValue::from(*f),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => JsonValue::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Vertex(v) => {
                let mut object = serde_json::Map::new();
                object.insert(ID_KEY.into(), JsonValue::String(v.id.clone()));
                object.insert(LABEL_KEY.into(), JsonValue::String(v.label.clone()));
                object.insert("type".into(), JsonValue::String("vertex".into()));
                object.insert(
                    "properties".into(),
                    serde_json::to_value(&v.properties).unwrap_or(JsonValue::Null),
                );
                JsonValue::Object(object)
            }
            Value::Edge(e) => {
                let mut object = serde_json::Map::new();
                object.insert(ID_KEY.into(), JsonValue::String(e.id.clone()));
                object.insert(LABEL_KEY.into(), JsonValue::String(e.label.clone()));
                object.insert("type".into(), JsonValue::String("edge".into()));
                object.insert("outV".into(), JsonValue::String(e.out_v.clone()));
                object.insert("inV".into(), JsonValue::String(e.in_v.clone()));
                object.insert(
                    "properties".into(),
                    serde_json::to_value(&e.properties).unwrap_or(JsonValue::Null),
                );
                JsonValue::Object(object)
            }
        }
    }
}

impl From<&JsonValue> for Value {
    fn from(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Boolean(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::Null
                }
            }
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(arr) => Value::List(arr.iter().map(Value::from).collect()),
            JsonValue::Object(obj) => Value::Map(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        Value::from(&json)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_conversions() {
        let v = Value::Integer(42);
        assert_eq!(v.as_i64().unwrap(), 42);

        let v = Value::from("hello");
        assert_eq!(v.as_str().unwrap(), "hello");

        let v = Value::Boolean(true);
        assert!(v.as_bool().unwrap());

        let err = Value::Null.as_vertex().unwrap_err();
        assert_eq!(
            err,
            ExecutionError::TypeMismatch {
                expected: "Vertex".into(),
                actual: "Null".into()
            }
        );
    }

    #[test]
    fn test_value_from_json() {
        let value = Value::from(json!({"name": ["Alice"], "age": 30, "score": 1.5}));
        let map = value.as_map().unwrap();

        assert_eq!(map["name"], Value::List(vec![Value::from("Alice")]));
        assert_eq!(map["age"], Value::Integer(30));
        assert_eq!(map["score"], Value::Float(1.5));
    }

    #[test]
    fn test_storage_errors_map_to_execution_kinds() {
        assert_eq!(
            ExecutionError::from(StorageError::DuplicateId("e1".into())),
            ExecutionError::DuplicateId("e1".into())
        );
        assert!(matches!(
            ExecutionError::from(StorageError::VertexNotFound("2".into())),
            ExecutionError::NotFound(_)
        ));
        assert_eq!(
            ExecutionError::from(StorageError::CounterOverflow),
            ExecutionError::Storage(StorageError::CounterOverflow)
        );
    }

    #[test]
    fn test_vertex_to_json() {
        let mut vertex = Vertex::new("1", "person");
        vertex.add_property("name", json!("Alice"));

        assert_eq!(
            Value::Vertex(vertex).to_json(),
            json!({
                "id": "1",
                "label": "person",
                "type": "vertex",
                "properties": {"name": ["Alice"]}
            })
        );
    }
}

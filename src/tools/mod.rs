/// Data import and export tools
///
/// Dumps a graph to JSON or CSV and loads such dumps back, keeping element
/// ids, labels and properties. Useful for seeding test graphs and moving a
/// graph between processes.

pub mod export;
pub mod import;

pub use export::{export_to_csv, export_to_json, ExportOptions};
pub use import::{import_from_csv, import_from_json, ImportOptions, ImportStats};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use thiserror::Error;

/// Import/export errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] crate::storage::StorageError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// JSON dump layout
///
/// ```json
/// {
///   "vertices": [{"id": "1", "label": "person", "properties": {"name": ["Alice"]}}],
///   "edges": [{"id": "e1", "label": "knows", "outV": "1", "inV": "2", "properties": {}}]
/// }
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
struct GraphDump {
    #[serde(default)]
    vertices: Vec<VertexRecord>,
    #[serde(default)]
    edges: Vec<EdgeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VertexRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    label: String,
    /// Arrays hold every value of a multi-valued property
    #[serde(default)]
    properties: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EdgeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    label: String,
    #[serde(rename = "outV", alias = "start")]
    out_v: String,
    #[serde(rename = "inV", alias = "end")]
    in_v: String,
    #[serde(default)]
    properties: BTreeMap<String, JsonValue>,
}

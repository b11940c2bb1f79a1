/// Storage engine abstraction for the graph engine
///
/// This module provides the core storage interface and implementations:
/// - GraphStorage trait: Abstract storage operations
/// - MemoryStorage: In-memory backend guarded by a read/write lock
/// - Scans: Lazy, restartable, insertion-ordered element sequences

pub mod error;
pub mod memory_store;
pub mod scan;

use crate::types::{Edge, Vertex};
pub use error::{StorageError, StorageResult};
pub use memory_store::MemoryStorage;
pub use scan::{EdgeScan, VertexScan};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Properties supplied at element creation time
///
/// A key may appear more than once; for vertices every occurrence is kept,
/// for edges the last one wins.
pub type PropertyList = Vec<(String, JsonValue)>;

/// Graph storage abstraction
///
/// Every method is atomic: a failed mutation leaves the graph unchanged and
/// readers never observe a partially applied one.
pub trait GraphStorage: Send + Sync {
    /// Name of the graph this store holds
    fn graph_name(&self) -> &str;

    /// Get a vertex by ID
    ///
    /// # Returns
    /// * `Ok(Some(vertex))` if found
    /// * `Ok(None)` if not found
    fn get_vertex(&self, id: &str) -> StorageResult<Option<Vertex>>;

    /// Get an edge by ID
    fn get_edge(&self, id: &str) -> StorageResult<Option<Edge>>;

    /// Create a new vertex
    ///
    /// # Arguments
    /// * `id` - Requested id, or `None` to let the store assign one
    /// * `label` - The vertex label
    /// * `properties` - Initial properties, applied together with creation
    ///
    /// # Returns
    /// * `Err(StorageError::DuplicateId)` if the id is already taken
    fn create_vertex(
        &self,
        id: Option<&str>,
        label: &str,
        properties: &[(String, JsonValue)],
    ) -> StorageResult<Vertex>;

    /// Create a new edge from `out_v` to `in_v`
    ///
    /// # Returns
    /// * `Err(StorageError::VertexNotFound)` if either endpoint is missing
    /// * `Err(StorageError::DuplicateId)` if the id is already taken
    fn create_edge(
        &self,
        id: Option<&str>,
        label: &str,
        out_v: &str,
        in_v: &str,
        properties: &[(String, JsonValue)],
    ) -> StorageResult<Edge>;

    /// Append a value to a vertex property
    fn set_vertex_property(&self, id: &str, key: &str, value: JsonValue) -> StorageResult<Vertex>;

    /// Set (overwrite) an edge property
    fn set_edge_property(&self, id: &str, key: &str, value: JsonValue) -> StorageResult<Edge>;

    /// Set a property on whichever element carries `element_id`
    ///
    /// Appends for vertices, overwrites for edges.
    fn set_property(&self, element_id: &str, key: &str, value: JsonValue) -> StorageResult<()>;

    /// First vertex at or after insertion position `position`, optionally
    /// restricted to `label`, together with the position it was found at
    fn vertex_from(&self, position: usize, label: Option<&str>)
        -> StorageResult<Option<(usize, Vertex)>>;

    /// First edge at or after insertion position `position`
    fn edge_from(&self, position: usize, label: Option<&str>)
        -> StorageResult<Option<(usize, Edge)>>;

    /// All edges leaving a vertex, in insertion order
    fn get_outgoing_edges(&self, vid: &str) -> StorageResult<Vec<Edge>>;

    /// All edges entering a vertex, in insertion order
    fn get_incoming_edges(&self, vid: &str) -> StorageResult<Vec<Edge>>;

    /// Number of vertices
    fn vertex_count(&self) -> usize;

    /// Number of edges
    fn edge_count(&self) -> usize;
}

/// Shared storage handle
pub type SharedStorage = Arc<dyn GraphStorage>;

/// Lazily enumerate the vertices carrying `label`, in insertion order
pub fn vertices_by_label(storage: &SharedStorage, label: &str) -> VertexScan {
    VertexScan::new(storage.clone(), Some(label.to_string()))
}

/// Lazily enumerate the edges carrying `label`, in insertion order
pub fn edges_by_label(storage: &SharedStorage, label: &str) -> EdgeScan {
    EdgeScan::new(storage.clone(), Some(label.to_string()))
}

/// Lazy element scans
///
/// A scan holds only a cursor into the store's insertion order. Each pull
/// takes the read lock for one lookup, and no lock is held between pulls.
/// An open scan also produces elements added after it started; `until`
/// stops it at a fixed insertion position instead.

use super::{SharedStorage, StorageResult};
use crate::types::{Edge, Vertex};

/// Lazy, restartable sequence of vertices in insertion order
#[derive(Clone)]
pub struct VertexScan {
    storage: SharedStorage,
    label: Option<String>,
    position: usize,
    end: Option<usize>,
}

impl VertexScan {
    /// Scan all vertices, or only those carrying `label`
    pub fn new(storage: SharedStorage, label: Option<String>) -> Self {
        Self {
            storage,
            label,
            position: 0,
            end: None,
        }
    }

    /// Stop before insertion position `end`
    pub fn until(mut self, end: usize) -> Self {
        self.end = Some(end);
        self
    }

    /// Rewind to the first vertex
    pub fn restart(&mut self) {
        self.position = 0;
    }
}

impl Iterator for VertexScan {
    type Item = StorageResult<Vertex>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.end.map_or(false, |end| self.position >= end) {
            return None;
        }
        match self.storage.vertex_from(self.position, self.label.as_deref()) {
            Ok(Some((pos, _))) if self.end.map_or(false, |end| pos >= end) => {
                self.position = pos;
                None
            }
            Ok(Some((pos, vertex))) => {
                self.position = pos + 1;
                Some(Ok(vertex))
            }
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Lazy, restartable sequence of edges in insertion order
#[derive(Clone)]
pub struct EdgeScan {
    storage: SharedStorage,
    label: Option<String>,
    position: usize,
    end: Option<usize>,
}

impl EdgeScan {
    /// Scan all edges, or only those carrying `label`
    pub fn new(storage: SharedStorage, label: Option<String>) -> Self {
        Self {
            storage,
            label,
            position: 0,
            end: None,
        }
    }

    /// Stop before insertion position `end`
    pub fn until(mut self, end: usize) -> Self {
        self.end = Some(end);
        self
    }

    /// Rewind to the first edge
    pub fn restart(&mut self) {
        self.position = 0;
    }
}

impl Iterator for EdgeScan {
    type Item = StorageResult<Edge>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.end.map_or(false, |end| self.position >= end) {
            return None;
        }
        match self.storage.edge_from(self.position, self.label.as_deref()) {
            Ok(Some((pos, _))) if self.end.map_or(false, |end| pos >= end) => {
                self.position = pos;
                None
            }
            Ok(Some((pos, edge))) => {
                self.position = pos + 1;
                Some(Ok(edge))
            }
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

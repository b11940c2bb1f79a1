/// Core data types for the graph engine
///
/// This module defines the fundamental types used throughout the system:
/// - Vertex: Labeled graph node with multi-valued properties
/// - Edge: Labeled, directed relationship with single-valued properties
/// - ElementId: String identifier shared by vertices and edges

pub mod edge;
pub mod vertex;

pub use edge::Edge;
pub use vertex::Vertex;

/// Identifier of a vertex or an edge
///
/// Vertices and edges share a single id namespace within one graph.
pub type ElementId = String;

/// Reserved key naming the element id in value maps and `property()` calls
pub const ID_KEY: &str = "id";

/// Reserved key naming the element label in value maps
pub const LABEL_KEY: &str = "label";

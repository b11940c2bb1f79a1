/// Data export utilities
///
/// Supports exporting graph data to:
/// - JSON files (one document with vertices and edges)
/// - CSV files (one file for vertices, one for edges)

use super::{EdgeRecord, GraphDump, ToolError, ToolResult, VertexRecord};
use crate::storage::{EdgeScan, SharedStorage, VertexScan};
use crate::types::{Edge, Vertex};
use serde_json::Value as JsonValue;
use std::fs::File;
use std::path::Path;

/// Export options
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Pretty-print JSON output
    pub pretty_json: bool,
    /// Include header row in CSV
    pub csv_header: bool,
    /// Only export vertices with these labels (`None` exports all)
    pub vertex_labels: Option<Vec<String>>,
    /// Only export edges with these labels (`None` exports all)
    pub edge_labels: Option<Vec<String>>,
    /// Progress reporting interval
    pub progress_interval: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            pretty_json: true,
            csv_header: true,
            vertex_labels: None,
            edge_labels: None,
            progress_interval: 10000,
        }
    }
}

fn wanted(filter: &Option<Vec<String>>, label: &str) -> bool {
    filter
        .as_ref()
        .map_or(true, |labels| labels.iter().any(|l| l == label))
}

fn report(kind: &str, count: usize, options: &ExportOptions) {
    if options.progress_interval > 0 && count % options.progress_interval == 0 {
        tracing::info!(count, "exported {}...", kind);
    }
}

/// Selected vertices in insertion order
fn vertices(storage: &SharedStorage, options: &ExportOptions) -> impl Iterator<Item = ToolResult<Vertex>> {
    let filter = options.vertex_labels.clone();
    VertexScan::new(storage.clone(), None)
        .map(|item| item.map_err(ToolError::from))
        .filter(move |item| match item {
            Ok(vertex) => wanted(&filter, &vertex.label),
            Err(_) => true,
        })
}

/// Selected edges in insertion order
fn edges(storage: &SharedStorage, options: &ExportOptions) -> impl Iterator<Item = ToolResult<Edge>> {
    let filter = options.edge_labels.clone();
    EdgeScan::new(storage.clone(), None)
        .map(|item| item.map_err(ToolError::from))
        .filter(move |item| match item {
            Ok(edge) => wanted(&filter, &edge.label),
            Err(_) => true,
        })
}

fn vertex_record(vertex: Vertex) -> VertexRecord {
    VertexRecord {
        id: Some(vertex.id),
        label: vertex.label,
        properties: vertex
            .properties
            .into_iter()
            .map(|(key, values)| (key, JsonValue::Array(values)))
            .collect(),
    }
}

fn edge_record(edge: Edge) -> EdgeRecord {
    EdgeRecord {
        id: Some(edge.id),
        label: edge.label,
        out_v: edge.out_v,
        in_v: edge.in_v,
        properties: edge.properties,
    }
}

/// Export the graph to a JSON file
///
/// Edges are exported even when a label filter left out one of their
/// endpoints; importing such a dump needs those vertices to exist already.
///
/// # Returns
/// * `(vertices, edges)` written
pub fn export_to_json<P: AsRef<Path>>(
    storage: &SharedStorage,
    path: P,
    options: &ExportOptions,
) -> ToolResult<(usize, usize)> {
    let mut dump = GraphDump::default();

    for vertex in vertices(storage, options) {
        dump.vertices.push(vertex_record(vertex?));
        report("vertices", dump.vertices.len(), options);
    }
    for edge in edges(storage, options) {
        dump.edges.push(edge_record(edge?));
        report("edges", dump.edges.len(), options);
    }

    let file = File::create(path)?;
    if options.pretty_json {
        serde_json::to_writer_pretty(file, &dump)?;
    } else {
        serde_json::to_writer(file, &dump)?;
    }

    tracing::info!(
        graph = %storage.graph_name(),
        vertices = dump.vertices.len(),
        edges = dump.edges.len(),
        "JSON export complete"
    );
    Ok((dump.vertices.len(), dump.edges.len()))
}

/// Export vertices to a CSV file
///
/// Columns: `id,label,properties`, with properties as a JSON object.
pub fn export_vertices_to_csv<P: AsRef<Path>>(
    storage: &SharedStorage,
    path: P,
    options: &ExportOptions,
) -> ToolResult<usize> {
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    if options.csv_header {
        writer.write_record(["id", "label", "properties"])?;
    }

    let mut count = 0;
    for vertex in vertices(storage, options) {
        let record = vertex_record(vertex?);
        let properties = serde_json::to_string(&record.properties)?;
        writer.write_record([
            record.id.unwrap_or_default().as_str(),
            record.label.as_str(),
            properties.as_str(),
        ])?;
        count += 1;
        report("vertices", count, options);
    }

    writer.flush()?;
    Ok(count)
}

/// Export edges to a CSV file
///
/// Columns: `id,label,outV,inV,properties`.
pub fn export_edges_to_csv<P: AsRef<Path>>(
    storage: &SharedStorage,
    path: P,
    options: &ExportOptions,
) -> ToolResult<usize> {
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    if options.csv_header {
        writer.write_record(["id", "label", "outV", "inV", "properties"])?;
    }

    let mut count = 0;
    for edge in edges(storage, options) {
        let edge = edge?;
        let properties = serde_json::to_string(&edge.properties)?;
        writer.write_record([
            edge.id.as_str(),
            edge.label.as_str(),
            edge.out_v.as_str(),
            edge.in_v.as_str(),
            properties.as_str(),
        ])?;
        count += 1;
        report("edges", count, options);
    }

    writer.flush()?;
    Ok(count)
}

/// Export the graph to two CSV files
pub fn export_to_csv<P: AsRef<Path>>(
    storage: &SharedStorage,
    vertices_path: P,
    edges_path: P,
    options: &ExportOptions,
) -> ToolResult<(usize, usize)> {
    let vertex_count = export_vertices_to_csv(storage, vertices_path, options)?;
    let edge_count = export_edges_to_csv(storage, edges_path, options)?;

    tracing::info!(
        graph = %storage.graph_name(),
        vertices = vertex_count,
        edges = edge_count,
        "CSV export complete"
    );
    Ok((vertex_count, edge_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn sample() -> SharedStorage {
        let storage: SharedStorage = Arc::new(MemoryStorage::new("export"));
        storage
            .create_vertex(Some("1"), "person", &[("name".into(), json!("Alice"))])
            .unwrap();
        storage
            .create_vertex(Some("2"), "person", &[("name".into(), json!("Bob"))])
            .unwrap();
        storage
            .create_vertex(Some("3"), "software", &[("name".into(), json!("lop"))])
            .unwrap();
        storage
            .create_edge(Some("e1"), "knows", "1", "2", &[("since".into(), json!(2023))])
            .unwrap();
        storage
    }

    #[test]
    fn test_export_to_json() {
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join("export.json");

        let (v_count, e_count) =
            export_to_json(&sample(), &json_path, &ExportOptions::default()).unwrap();

        assert_eq!(v_count, 3);
        assert_eq!(e_count, 1);

        let content = std::fs::read_to_string(&json_path).unwrap();
        let parsed: JsonValue = serde_json::from_str(&content).unwrap();

        assert_eq!(
            parsed["vertices"][0],
            json!({"id": "1", "label": "person", "properties": {"name": ["Alice"]}})
        );
        assert_eq!(
            parsed["edges"][0],
            json!({"id": "e1", "label": "knows", "outV": "1", "inV": "2", "properties": {"since": 2023}})
        );
    }

    #[test]
    fn test_export_with_label_filter() {
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join("people.json");
        let options = ExportOptions {
            vertex_labels: Some(vec!["software".into()]),
            edge_labels: Some(vec![]),
            ..ExportOptions::default()
        };

        let counts = export_to_json(&sample(), &json_path, &options).unwrap();
        assert_eq!(counts, (1, 0));
    }

    #[test]
    fn test_export_to_csv() {
        let temp_dir = TempDir::new().unwrap();
        let vertices_path = temp_dir.path().join("vertices.csv");
        let edges_path = temp_dir.path().join("edges.csv");

        let counts =
            export_to_csv(&sample(), &vertices_path, &edges_path, &ExportOptions::default())
                .unwrap();
        assert_eq!(counts, (3, 1));

        let edges = std::fs::read_to_string(&edges_path).unwrap();
        let mut lines = edges.lines();
        assert_eq!(lines.next(), Some("id,label,outV,inV,properties"));
        assert_eq!(lines.next(), Some(r#"e1,knows,1,2,"{""since"":2023}""#));
    }
}

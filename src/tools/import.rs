/// Data import utilities
///
/// Supports importing graph data from:
/// - JSON files in the layout written by `export_to_json`
/// - CSV files (vertices and edges), either exported ones with a
///   `properties` JSON column or hand-written ones with one column per
///   property

use super::{EdgeRecord, GraphDump, ToolError, ToolResult, VertexRecord};
use crate::storage::{PropertyList, SharedStorage};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Import options
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Skip invalid rows instead of failing
    pub skip_errors: bool,
    /// Default label if not specified
    pub default_vertex_label: String,
    /// Default edge label if not specified
    pub default_edge_label: String,
    /// Progress reporting interval (rows)
    pub progress_interval: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            skip_errors: false,
            default_vertex_label: "vertex".to_string(),
            default_edge_label: "edge".to_string(),
            progress_interval: 10000,
        }
    }
}

/// Import statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportStats {
    pub vertices_imported: usize,
    pub edges_imported: usize,
    pub vertices_skipped: usize,
    pub edges_skipped: usize,
    pub errors: Vec<String>,
}

impl ImportStats {
    fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }
}

/// Loads records into a store, remembering which dump key became which id
struct Loader<'a> {
    storage: &'a SharedStorage,
    options: &'a ImportOptions,
    /// Dump key (given id, or row index when the id was blank) → stored id
    id_mapping: HashMap<String, String>,
    stats: ImportStats,
}

impl<'a> Loader<'a> {
    fn new(storage: &'a SharedStorage, options: &'a ImportOptions) -> Self {
        Self {
            storage,
            options,
            id_mapping: HashMap::new(),
            stats: ImportStats::default(),
        }
    }

    fn progress(&self, kind: &str, count: usize) {
        if self.options.progress_interval > 0 && count % self.options.progress_interval == 0 {
            tracing::info!(count, "imported {}...", kind);
        }
    }

    fn vertex(&mut self, index: usize, record: ToolResult<VertexRecord>) -> ToolResult<()> {
        match record.and_then(|r| self.create_vertex(index, r)) {
            Ok(()) => {
                self.stats.vertices_imported += 1;
                self.progress("vertices", self.stats.vertices_imported);
                Ok(())
            }
            Err(e) if self.options.skip_errors => {
                self.stats.vertices_skipped += 1;
                self.stats.add_error(format!("Vertex {}: {}", index, e));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn edge(&mut self, index: usize, record: ToolResult<EdgeRecord>) -> ToolResult<()> {
        match record.and_then(|r| self.create_edge(r)) {
            Ok(()) => {
                self.stats.edges_imported += 1;
                self.progress("edges", self.stats.edges_imported);
                Ok(())
            }
            Err(e) if self.options.skip_errors => {
                self.stats.edges_skipped += 1;
                self.stats.add_error(format!("Edge {}: {}", index, e));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn create_vertex(&mut self, index: usize, record: VertexRecord) -> ToolResult<()> {
        let label = if record.label.is_empty() {
            self.options.default_vertex_label.as_str()
        } else {
            record.label.as_str()
        };
        let properties = vertex_properties(record.properties);

        let vertex = self
            .storage
            .create_vertex(record.id.as_deref(), label, &properties)?;

        let key = record.id.unwrap_or_else(|| index.to_string());
        self.id_mapping.insert(key, vertex.id);
        Ok(())
    }

    /// Endpoint keys resolve through the mapping first, then as stored ids
    fn resolve(&self, key: &str) -> ToolResult<String> {
        if let Some(id) = self.id_mapping.get(key) {
            return Ok(id.clone());
        }
        if self.storage.get_vertex(key)?.is_some() {
            return Ok(key.to_string());
        }
        Err(ToolError::InvalidFormat(format!("vertex not found: {}", key)))
    }

    fn create_edge(&mut self, record: EdgeRecord) -> ToolResult<()> {
        let out_v = self.resolve(&record.out_v)?;
        let in_v = self.resolve(&record.in_v)?;
        let label = if record.label.is_empty() {
            self.options.default_edge_label.as_str()
        } else {
            record.label.as_str()
        };
        let properties: PropertyList = record.properties.into_iter().collect();

        self.storage
            .create_edge(record.id.as_deref(), label, &out_v, &in_v, &properties)?;
        Ok(())
    }

    fn finish(self, format: &str) -> ImportStats {
        tracing::info!(
            graph = %self.storage.graph_name(),
            format,
            vertices = self.stats.vertices_imported,
            vertices_skipped = self.stats.vertices_skipped,
            edges = self.stats.edges_imported,
            edges_skipped = self.stats.edges_skipped,
            "import complete"
        );
        self.stats
    }
}

/// Arrays expand to one value each, so multi-valued properties survive a
/// dump/load cycle
fn vertex_properties(properties: BTreeMap<String, JsonValue>) -> PropertyList {
    let mut list = PropertyList::new();
    for (key, value) in properties {
        match value {
            JsonValue::Array(values) => {
                list.extend(values.into_iter().map(|v| (key.clone(), v)));
            }
            other => list.push((key, other)),
        }
    }
    list
}

/// Import graph from JSON file
///
/// JSON format:
/// ```json
/// {
///   "vertices": [
///     {"id": "alice", "label": "person", "properties": {"name": "Alice", "age": 30}},
///     {"label": "person", "properties": {"name": "Bob"}}
///   ],
///   "edges": [
///     {"label": "knows", "outV": "alice", "inV": "1", "properties": {"since": 2020}}
///   ]
/// }
/// ```
///
/// A vertex without an id gets a store-assigned one; edges may refer to it
/// by its position in the `vertices` array.
pub fn import_from_json<P: AsRef<Path>>(
    storage: &SharedStorage,
    path: P,
    options: &ImportOptions,
) -> ToolResult<ImportStats> {
    let reader = BufReader::new(File::open(path)?);
    let dump: GraphDump = serde_json::from_reader(reader)?;

    let mut loader = Loader::new(storage, options);
    for (index, record) in dump.vertices.into_iter().enumerate() {
        loader.vertex(index, Ok(record))?;
    }
    for (index, record) in dump.edges.into_iter().enumerate() {
        loader.edge(index, Ok(record))?;
    }

    Ok(loader.finish("json"))
}

/// Typed value of a hand-written CSV cell
fn infer_cell(cell: &str) -> JsonValue {
    if let Ok(i) = cell.parse::<i64>() {
        return JsonValue::from(i);
    }
    if let Ok(f) = cell.parse::<f64>() {
        if f.is_finite() {
            return JsonValue::from(f);
        }
    }
    match cell {
        "true" => JsonValue::Bool(true),
        "false" => JsonValue::Bool(false),
        _ => JsonValue::String(cell.to_string()),
    }
}

/// One CSV row split into the element fields and its properties
#[derive(Default)]
struct CsvRow {
    id: Option<String>,
    label: String,
    out_v: Option<String>,
    in_v: Option<String>,
    properties: BTreeMap<String, JsonValue>,
}

fn parse_row(headers: &csv::StringRecord, row: &csv::StringRecord) -> ToolResult<CsvRow> {
    let mut parsed = CsvRow::default();

    for (header, cell) in headers.iter().zip(row.iter()) {
        if cell.is_empty() {
            continue;
        }
        match header {
            "id" => parsed.id = Some(cell.to_string()),
            "label" => parsed.label = cell.to_string(),
            "outV" | "start" => parsed.out_v = Some(cell.to_string()),
            "inV" | "end" => parsed.in_v = Some(cell.to_string()),
            "properties" => {
                let object: BTreeMap<String, JsonValue> = serde_json::from_str(cell)?;
                parsed.properties.extend(object);
            }
            key => {
                parsed.properties.insert(key.to_string(), infer_cell(cell));
            }
        }
    }

    Ok(parsed)
}

/// Import vertices from CSV file
///
/// CSV format:
/// ```csv
/// id,label,name,age
/// alice,person,Alice,30
/// ,person,Bob,25
/// ```
///
/// A blank id is store-assigned; edges may refer to such a vertex by its
/// 0-based row index.
fn import_vertices_from_csv(loader: &mut Loader<'_>, path: &Path) -> ToolResult<()> {
    let mut reader = csv::Reader::from_reader(BufReader::new(File::open(path)?));
    let headers = reader.headers()?.clone();

    for (index, row) in reader.records().enumerate() {
        let record = row
            .map_err(ToolError::from)
            .and_then(|row| parse_row(&headers, &row))
            .map(|row| VertexRecord {
                id: row.id,
                label: row.label,
                properties: row.properties,
            });
        loader.vertex(index, record)?;
    }
    Ok(())
}

/// Import edges from CSV file
///
/// CSV format:
/// ```csv
/// id,label,outV,inV,since
/// ,knows,alice,1,2020
/// ```
fn import_edges_from_csv(loader: &mut Loader<'_>, path: &Path) -> ToolResult<()> {
    let mut reader = csv::Reader::from_reader(BufReader::new(File::open(path)?));
    let headers = reader.headers()?.clone();

    for (index, row) in reader.records().enumerate() {
        let record = row
            .map_err(ToolError::from)
            .and_then(|row| parse_row(&headers, &row))
            .and_then(|row| match (row.out_v, row.in_v) {
                (Some(out_v), Some(in_v)) => Ok(EdgeRecord {
                    id: row.id,
                    label: row.label,
                    out_v,
                    in_v,
                    properties: row.properties,
                }),
                _ => Err(ToolError::InvalidFormat(
                    "edge row needs both outV and inV".to_string(),
                )),
            });
        loader.edge(index, record)?;
    }
    Ok(())
}

/// Import graph from CSV files (vertices first, then edges)
pub fn import_from_csv<P: AsRef<Path>>(
    storage: &SharedStorage,
    vertices_path: P,
    edges_path: P,
    options: &ImportOptions,
) -> ToolResult<ImportStats> {
    let mut loader = Loader::new(storage, options);
    import_vertices_from_csv(&mut loader, vertices_path.as_ref())?;
    import_edges_from_csv(&mut loader, edges_path.as_ref())?;

    Ok(loader.finish("csv"))
}

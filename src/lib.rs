/// Gremlin Graph Database
///
/// An embeddable, in-memory property graph engine driven by Gremlin-style
/// traversals, either built in Rust or parsed from script text.
///
/// # Architecture
///
/// ```text
/// ┌──────────────────────────────────────────────────┐
/// │           Gremlin Graph Database                 │
/// ├──────────────────────────────────────────────────┤
/// │  ┌────────────────────────────────┐              │
/// │  │   Session (memory:// endpoint) │              │
/// │  └────────────┬───────────────────┘              │
/// │               ↓                                   │
/// │  ┌──────────────────┐   ┌─────────────────────┐  │
/// │  │ Traversal builder│ ← │ Gremlin parser(pest)│  │
/// │  └────────────┬─────┘   └─────────────────────┘  │
/// │               ↓                                   │
/// │  ┌────────────────────────────────┐              │
/// │  │   Lazy step evaluator          │              │
/// │  └────────────┬───────────────────┘              │
/// │               ↓                                   │
/// │  ┌────────────────────────────────┐              │
/// │  │   Storage Engine (in-memory)   │              │
/// │  └────────────────────────────────┘              │
/// └──────────────────────────────────────────────────┘
/// ```
///
/// # Modules
///
/// - `types`: Core data types (Vertex, Edge, element ids)
/// - `storage`: Storage abstraction and the in-memory implementation
/// - `traversal`: Traversal builder, steps and lazy evaluation
/// - `parser`: Gremlin script parser
/// - `session`: Sessions, configuration and logging setup
/// - `tools`: Utilities (JSON/CSV import and export)
///
/// # Example
///
/// ```
/// use gremlin_graph_db::{Session, SessionConfig};
///
/// let session = Session::open(SessionConfig::memory("demo")).unwrap();
/// let g = session.g();
///
/// g.add_v("person").property("id", "1").property("name", "Alice").next().unwrap();
/// let maps = g.v(()).has_label("person").value_map(true).to_list().unwrap();
/// assert_eq!(maps.len(), 1);
///
/// session.close();
/// ```

pub mod types;
pub mod storage;
pub mod traversal;
pub mod parser;
pub mod session;
pub mod tools;

// Re-export commonly used types
pub use types::{Edge, ElementId, Vertex};

// Re-export storage types
pub use storage::{GraphStorage, MemoryStorage, SharedStorage, StorageError, StorageResult};

// Re-export traversal types
pub use traversal::{
    Direction, ExecutionError, ExecutionResult, GraphTraversalSource, Step, Traversal, Value, T, __,
};

// Re-export parser types
pub use parser::{parse_gremlin, ParseError, ParseResult, Script, Terminal};

// Re-export session types
pub use session::{
    init_logging, Credentials, LogFormat, LoggingConfig, Session, SessionConfig, SessionError,
    SessionResult,
};

// Re-export tool types
pub use tools::{
    export_to_csv, export_to_json, import_from_csv, import_from_json, ExportOptions,
    ImportOptions, ImportStats, ToolError, ToolResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

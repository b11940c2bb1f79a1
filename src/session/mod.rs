/// Session layer
///
/// A `Session` plays the role a remote driver connection plays elsewhere:
/// it is opened from an endpoint and credentials, hands out the traversal
/// source, evaluates submitted scripts and is closed when done. The only
/// endpoint kind served is `memory://<graph-name>`, so opening never does I/O.
///
/// Closing flips a flag shared with every traversal source the session handed
/// out; traversals built from it then fail with a connection error at their
/// terminal.

mod config;
mod logging;

pub use config::{Credentials, SessionConfig, DEFAULT_ENDPOINT, DEFAULT_TRAVERSAL_SOURCE};
pub use logging::{init_logging, LogFormat, LoggingConfig};

use crate::parser::{parse_gremlin, ParseError, Terminal};
use crate::storage::{MemoryStorage, SharedStorage};
use crate::traversal::{ExecutionError, GraphTraversalSource, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Session errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// Unreachable endpoint or closed session
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Script starts from '{found}' but the session serves '{expected}'")]
    UnknownSource { expected: String, found: String },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl SessionError {
    /// True for failures of the connection itself rather than of a request
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            SessionError::Connection(_) | SessionError::Execution(ExecutionError::Connection(_))
        )
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// An open connection to a graph
pub struct Session {
    config: SessionConfig,
    storage: SharedStorage,
    open: Arc<AtomicBool>,
}

impl Session {
    /// Open a session on a fresh graph named by the endpoint
    pub fn open(config: SessionConfig) -> SessionResult<Self> {
        let graph_name = config.graph_name()?.to_string();
        let storage: SharedStorage = Arc::new(MemoryStorage::new(graph_name));
        Self::open_with_storage(config, storage)
    }

    /// Open a session on an existing store shared with other sessions
    pub fn open_with_storage(config: SessionConfig, storage: SharedStorage) -> SessionResult<Self> {
        config.graph_name()?;
        config.validate()?;

        if let Some(credentials) = &config.credentials {
            tracing::debug!(
                username = %credentials.username,
                "credentials accepted without verification by in-process endpoint"
            );
        }

        tracing::info!(
            endpoint = %config.endpoint,
            graph = %storage.graph_name(),
            traversal_source = %config.traversal_source,
            "session opened"
        );

        Ok(Self {
            config,
            storage,
            open: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// The traversal source, named after the configured label
    ///
    /// Handing out a source from a closed session is allowed; its traversals
    /// fail at their terminal.
    pub fn g(&self) -> GraphTraversalSource {
        GraphTraversalSource::bound(
            self.config.traversal_source.clone(),
            self.storage.clone(),
            self.open.clone(),
        )
    }

    /// Parse and evaluate a script such as `g.V().hasLabel('person').toList()`
    ///
    /// `next()` yields one value, `iterate()` none, and `toList()` (or no
    /// terminal) every result.
    pub fn submit(&self, script: &str) -> SessionResult<Vec<Value>> {
        if !self.is_open() {
            return Err(SessionError::Connection(
                "cannot submit to a closed session".to_string(),
            ));
        }

        let parsed = parse_gremlin(script)?;
        if parsed.source != self.config.traversal_source {
            return Err(SessionError::UnknownSource {
                expected: self.config.traversal_source.clone(),
                found: parsed.source,
            });
        }

        tracing::debug!(script = %script, "submitting script");
        let traversal = parsed.traversal.with_source(self.g());

        let results = match parsed.terminal {
            Terminal::Next => vec![traversal.next()?],
            Terminal::ToList => traversal.to_list()?,
            Terminal::Iterate => {
                traversal.iterate()?;
                Vec::new()
            }
        };
        Ok(results)
    }

    /// Close the session; closing again is a no-op
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            tracing::info!(endpoint = %self.config.endpoint, "session closed");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("graph", &self.storage.graph_name())
            .field("open", &self.is_open())
            .finish()
    }
}

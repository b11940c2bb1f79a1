/// Session configuration
///
/// Values come from the environment (optionally via a `.env` file); nothing
/// secret is ever a literal in code.

use super::{SessionError, SessionResult};
use std::env;
use std::fmt;

pub const DEFAULT_ENDPOINT: &str = "memory://default";
pub const DEFAULT_TRAVERSAL_SOURCE: &str = "g";

/// Scheme of the only endpoint kind this engine serves
pub const MEMORY_SCHEME: &str = "memory";

/// Username/password pair passed to the endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// `memory://<graph-name>`
    pub endpoint: String,
    pub credentials: Option<Credentials>,
    /// Name scripts must start from, `g` by default
    pub traversal_source: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials: None,
            traversal_source: DEFAULT_TRAVERSAL_SOURCE.to_string(),
        }
    }
}

impl SessionConfig {
    /// Config for a named in-memory graph
    pub fn memory(graph_name: &str) -> Self {
        Self {
            endpoint: format!("{}://{}", MEMORY_SCHEME, graph_name),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_traversal_source(mut self, name: impl Into<String>) -> Self {
        self.traversal_source = name.into();
        self
    }

    /// Load configuration from environment variables
    ///
    /// Reads `GRAPH_ENDPOINT`, `GRAPH_USERNAME`, `GRAPH_PASSWORD` and
    /// `GRAPH_TRAVERSAL_SOURCE`. Credentials are set only when both the
    /// username and the password are present.
    pub fn from_env() -> Self {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let credentials = match (lookup("GRAPH_USERNAME"), lookup("GRAPH_PASSWORD")) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            _ => None,
        };

        Self {
            endpoint: lookup("GRAPH_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            credentials,
            traversal_source: lookup("GRAPH_TRAVERSAL_SOURCE")
                .unwrap_or_else(|| DEFAULT_TRAVERSAL_SOURCE.to_string()),
        }
    }

    /// Graph name addressed by a `memory://` endpoint
    ///
    /// Other schemes are remote endpoints, which this engine cannot reach.
    pub fn graph_name(&self) -> SessionResult<&str> {
        let (scheme, rest) = self.endpoint.split_once("://").ok_or_else(|| {
            SessionError::InvalidConfig(format!("malformed endpoint '{}'", self.endpoint))
        })?;

        if scheme != MEMORY_SCHEME {
            return Err(SessionError::Connection(format!(
                "cannot reach '{}': only {}:// endpoints are served in-process",
                self.endpoint, MEMORY_SCHEME
            )));
        }

        let name = rest.trim_end_matches('/');
        if name.is_empty() {
            return Ok("default");
        }
        Ok(name)
    }

    /// Check the traversal source label is a usable identifier
    pub fn validate(&self) -> SessionResult<()> {
        let label = self.traversal_source.as_str();
        let mut chars = label.chars();
        let well_formed = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };

        if !well_formed || label == "__" {
            return Err(SessionError::InvalidConfig(format!(
                "traversal source label '{}' is not a valid identifier",
                label
            )));
        }
        Ok(())
    }
}

/// Error types for storage operations

use thiserror::Error;

/// Storage operation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// An element with this id already exists
    #[error("Duplicate element id: {0}")]
    DuplicateId(String),

    /// Vertex not found
    #[error("Vertex not found: {0}")]
    VertexNotFound(String),

    /// Edge not found
    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    /// Neither a vertex nor an edge carries this id
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Malformed label, key or value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Counter overflow
    #[error("Id counter overflow")]
    CounterOverflow,
}

impl StorageError {
    /// True for every "missing element" variant
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::VertexNotFound(_)
                | StorageError::EdgeNotFound(_)
                | StorageError::ElementNotFound(_)
        )
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

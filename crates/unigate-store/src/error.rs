//! Error types for the store layer

use thiserror::Error;
use unigate_core::CoreError;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to the backing document store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Container has not been provisioned
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    /// No document with this id under this partition key value
    #[error("Document '{id}' not found in {container}")]
    NotFound { container: String, id: String },

    /// A document with this id already exists under this partition key value
    #[error("Document '{id}' already exists in {container}")]
    Conflict { container: String, id: String },

    /// Conditional write lost against a concurrent write
    #[error("Document '{id}' in {container} was modified concurrently")]
    PreconditionFailed { container: String, id: String },

    /// Document lacks a value for the container's partition key field
    #[error("Document for {container} has no value for partition key {path}")]
    MissingPartitionKey { container: String, path: String },

    /// Container exists with a different partition key path than requested
    #[error(
        "Container {container} is partitioned by {existing}, but {requested} was requested"
    )]
    PartitionKeyMismatch {
        container: String,
        existing: String,
        requested: String,
    },

    /// Backing store refused or failed to create a container
    #[error("Failed to ensure {container} container exists: {reason}")]
    ProvisioningFailed { container: String, reason: String },

    /// Document rejected by the store
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Query could not be rendered
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] CoreError),

    /// Database error (when database feature is enabled)
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Connection has been closed
    #[error("Store connection is closed")]
    Closed,

    /// Generic backend failure
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether this error means "no such document"
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

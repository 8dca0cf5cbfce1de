//! Error types for the repository layer
//!
//! [`RepositoryError`] is the normalized taxonomy every caller sees. Store and
//! core errors are folded into it here so no backend-specific error crosses
//! the repository boundary.

use thiserror::Error;
use unigate_core::CoreError;
use unigate_store::StoreError;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors that can occur during repository operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    /// Input rejected before reaching the store
    #[error("{0}")]
    Validation(String),

    /// Point operation attempted without a partition key value
    #[error("{entity} ID and {field} (partition key) are required")]
    MissingPartitionKey { entity: String, field: String },

    /// Nothing lives at this id and partition key value
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Id already taken, or a concurrent write won
    #[error("{entity} '{id}' conflicts with an existing or newer version")]
    Conflict { entity: String, id: String },

    /// The backing container could not be created or reached
    #[error("Failed to ensure {container} container exists: {reason}")]
    ContainerProvisioningFailed { container: String, reason: String },

    /// Container exists with a different partition key path
    #[error("Container {container} is partitioned by {existing}, not {requested}")]
    PartitionKeyMismatch {
        container: String,
        existing: String,
        requested: String,
    },

    /// The store failed or refused the operation
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Entity type name did not resolve
    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    /// Query could not be built (bad field name or pagination)
    #[error("Invalid query: {0}")]
    InvalidQuery(CoreError),
}

impl RepositoryError {
    pub fn validation(message: impl Into<String>) -> Self {
        RepositoryError::Validation(message.into())
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        RepositoryError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether this is a client-side error (bad input or unknown resource)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RepositoryError::Validation(_)
                | RepositoryError::MissingPartitionKey { .. }
                | RepositoryError::NotFound { .. }
                | RepositoryError::Conflict { .. }
                | RepositoryError::UnknownEntityType(_)
                | RepositoryError::InvalidQuery(_)
        )
    }
}

impl From<CoreError> for RepositoryError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownEntityType(name) => RepositoryError::UnknownEntityType(name),
            CoreError::InvalidDocument(message) => RepositoryError::Validation(message),
            other => RepositoryError::InvalidQuery(other),
        }
    }
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { container, id } => RepositoryError::NotFound {
                entity: container,
                id,
            },
            StoreError::Conflict { container, id }
            | StoreError::PreconditionFailed { container, id } => RepositoryError::Conflict {
                entity: container,
                id,
            },
            StoreError::MissingPartitionKey { container, path } => {
                RepositoryError::MissingPartitionKey {
                    entity: container,
                    field: path.trim_start_matches('/').to_string(),
                }
            }
            StoreError::PartitionKeyMismatch {
                container,
                existing,
                requested,
            } => RepositoryError::PartitionKeyMismatch {
                container,
                existing,
                requested,
            },
            StoreError::ProvisioningFailed { container, reason } => {
                RepositoryError::ContainerProvisioningFailed { container, reason }
            }
            StoreError::ContainerNotFound(container) => {
                RepositoryError::ContainerProvisioningFailed {
                    container,
                    reason: "container has not been provisioned".to_string(),
                }
            }
            StoreError::InvalidDocument(message) => RepositoryError::Validation(message),
            StoreError::InvalidQuery(core) => core.into(),
            other => RepositoryError::StoreUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_is_normalized() {
        let err: RepositoryError = StoreError::NotFound {
            container: "Jobs".to_string(),
            id: "j1".to_string(),
        }
        .into();
        assert_eq!(err, RepositoryError::not_found("Jobs", "j1"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_lost_race_is_conflict() {
        let err: RepositoryError = StoreError::PreconditionFailed {
            container: "Jobs".to_string(),
            id: "j1".to_string(),
        }
        .into();
        assert!(matches!(err, RepositoryError::Conflict { .. }));
    }

    #[test]
    fn test_closed_store_is_unavailable() {
        let err: RepositoryError = StoreError::Closed.into();
        assert!(matches!(err, RepositoryError::StoreUnavailable(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_core_errors() {
        let err: RepositoryError = CoreError::UnknownEntityType("Widgets".to_string()).into();
        assert_eq!(err, RepositoryError::UnknownEntityType("Widgets".to_string()));

        let err: RepositoryError = CoreError::InvalidPagination("page must be >= 1".to_string()).into();
        assert!(matches!(err, RepositoryError::InvalidQuery(CoreError::InvalidPagination(_))));
    }

    #[test]
    fn test_missing_partition_key_message() {
        let err: RepositoryError = StoreError::MissingPartitionKey {
            container: "Jobs".to_string(),
            path: "/location".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Jobs ID and location (partition key) are required");
    }
}

//! Error types for Unigate Core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("Invalid partition key path '{path}': {reason}")]
    InvalidPartitionKeyPath { path: String, reason: String },

    #[error("Invalid field name: {0}")]
    InvalidField(String),

    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

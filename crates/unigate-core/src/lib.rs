//! Unigate Core - core types for the Unigate document gateway
//!
//! This crate provides the store-independent building blocks shared by every
//! other Unigate crate:
//! - Entity types and their partition key policy
//! - The schemaless `Document` with shallow merge semantics
//! - Typed query predicates and the parameterized `QueryBuilder`
//! - Error types

pub mod document;
pub mod entity;
pub mod error;
pub mod query;

// Re-export commonly used types
pub use document::{Document, SYSTEM_FIELDS};
pub use entity::{EntityType, PartitionKeyPath, PartitionKeyPolicy};
pub use error::{CoreError, Result};
pub use query::{
    Pagination, Predicate, QueryBuilder, QueryParameter, QuerySpec, RangeBound, Selection,
};

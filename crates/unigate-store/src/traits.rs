//! The document store connection
//!
//! [`DocumentStore`] is the only seam between Unigate and the physical store.
//! Every point operation is addressed by container, document id and partition
//! key value; implementations must never fall back to scanning partitions when
//! the key is wrong, a wrong key simply finds nothing.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`: one connection is shared by every
//! request-handling task for the lifetime of the process.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use unigate_core::{Document, PartitionKeyPath, QuerySpec};

use crate::StoreResult;

/// Definition of a provisioned container as reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerProperties {
    pub id: String,
    pub partition_key: PartitionKeyPath,
}

/// Connection to a partitioned document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name, used in logs
    fn backend(&self) -> &'static str;

    /// Create a container unless it exists, returning its actual definition.
    ///
    /// Must be idempotent and safe to race: concurrent calls for the same
    /// container all resolve to the same container. An existing container is
    /// reported with the partition key it was created with, whatever was
    /// requested.
    async fn create_container_if_not_exists(
        &self,
        container: &str,
        partition_key: &PartitionKeyPath,
    ) -> StoreResult<ContainerProperties>;

    /// Insert a new document.
    ///
    /// Assigns a UUID `id` when the document has none. Fails with `Conflict`
    /// if the id is taken within the partition.
    async fn create_item(&self, container: &str, document: Document) -> StoreResult<Document>;

    /// Insert or fully replace a document
    async fn upsert_item(&self, container: &str, document: Document) -> StoreResult<Document>;

    /// Point read; `None` when nothing lives at this id and partition key
    async fn read_item(
        &self,
        container: &str,
        id: &str,
        partition_key: &str,
    ) -> StoreResult<Option<Document>>;

    /// Replace an existing document.
    ///
    /// With `if_match`, the write only happens while the stored `_etag` still
    /// equals it, otherwise `PreconditionFailed`.
    async fn replace_item(
        &self,
        container: &str,
        id: &str,
        partition_key: &str,
        document: Document,
        if_match: Option<&str>,
    ) -> StoreResult<Document>;

    /// Delete a document; `NotFound` if it does not exist
    async fn delete_item(&self, container: &str, id: &str, partition_key: &str)
        -> StoreResult<()>;

    /// Execute a query and collect every result
    async fn query_items(&self, container: &str, query: &QuerySpec) -> StoreResult<Vec<Document>>;

    /// Release the connection. Further calls fail with `Closed`.
    async fn close(&self) -> StoreResult<()>;
}

/// Write the store-owned `_etag` and `_ts` fields, returning the new etag
pub(crate) fn stamp_system_fields(document: &mut Document) -> String {
    let etag = uuid::Uuid::new_v4().to_string();
    document.insert("_etag", etag.clone());
    document.insert("_ts", Utc::now().timestamp());
    etag
}

/// Assign a UUID id to documents that arrive without one
pub(crate) fn ensure_id(document: &mut Document) -> String {
    match document.id() {
        Some(id) => id.to_string(),
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            document.set_id(id.clone());
            id
        }
    }
}

//! Common test utilities for repository integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use unigate_core::{Document, PartitionKeyPath, QuerySpec};
use unigate_repository::{ConcurrencyMode, Gateway};
use unigate_store::{ContainerProperties, DocumentStore, MemoryStore, StoreResult};

/// Memory store that counts document operations.
///
/// With `interfere` set, every replace is preceded by a write from a
/// simulated concurrent client, so the caller's etag is always stale.
pub struct CountingStore {
    inner: MemoryStore,
    document_calls: AtomicUsize,
    interfere: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            document_calls: AtomicUsize::new(0),
            interfere: AtomicBool::new(false),
        }
    }

    /// Reads, writes and queries seen so far (provisioning excluded)
    pub fn document_calls(&self) -> usize {
        self.document_calls.load(Ordering::SeqCst)
    }

    pub fn interfere_with_replaces(&self) {
        self.interfere.store(true, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn count(&self) {
        self.document_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    fn backend(&self) -> &'static str {
        "counting"
    }

    async fn create_container_if_not_exists(
        &self,
        container: &str,
        partition_key: &PartitionKeyPath,
    ) -> StoreResult<ContainerProperties> {
        self.inner
            .create_container_if_not_exists(container, partition_key)
            .await
    }

    async fn create_item(&self, container: &str, document: Document) -> StoreResult<Document> {
        self.count();
        self.inner.create_item(container, document).await
    }

    async fn upsert_item(&self, container: &str, document: Document) -> StoreResult<Document> {
        self.count();
        self.inner.upsert_item(container, document).await
    }

    async fn read_item(
        &self,
        container: &str,
        id: &str,
        partition_key: &str,
    ) -> StoreResult<Option<Document>> {
        self.count();
        self.inner.read_item(container, id, partition_key).await
    }

    async fn replace_item(
        &self,
        container: &str,
        id: &str,
        partition_key: &str,
        document: Document,
        if_match: Option<&str>,
    ) -> StoreResult<Document> {
        self.count();
        if self.interfere.load(Ordering::SeqCst) {
            if let Some(mut current) = self.inner.read_item(container, id, partition_key).await? {
                current.insert("touchedBy", Value::from("another client"));
                self.inner.upsert_item(container, current).await?;
            }
        }
        self.inner
            .replace_item(container, id, partition_key, document, if_match)
            .await
    }

    async fn delete_item(&self, container: &str, id: &str, partition_key: &str) -> StoreResult<()> {
        self.count();
        self.inner.delete_item(container, id, partition_key).await
    }

    async fn query_items(&self, container: &str, query: &QuerySpec) -> StoreResult<Vec<Document>> {
        self.count();
        self.inner.query_items(container, query).await
    }

    async fn close(&self) -> StoreResult<()> {
        self.inner.close().await
    }
}

/// Provisioned gateway over a fresh counting store
pub async fn gateway_with(concurrency: ConcurrencyMode) -> (Gateway, Arc<CountingStore>) {
    let store = Arc::new(CountingStore::new());
    let gateway = Gateway::new(store.clone()).with_concurrency(concurrency);
    gateway.init().await.expect("provisioning succeeds");
    (gateway, store)
}

pub async fn gateway() -> (Gateway, Arc<CountingStore>) {
    gateway_with(ConcurrencyMode::LastWriteWins).await
}

pub fn doc(value: Value) -> Document {
    Document::try_from(value).expect("test documents are objects")
}

/// A job that passes validation
pub fn job(title: &str, location: &str) -> Document {
    doc(serde_json::json!({
        "title": title,
        "description": format!("{} wanted", title),
        "companyName": "Beans",
        "location": location,
        "jobType": "full-time",
        "contactEmail": "hr@beans.example"
    }))
}

/// User fields only, without `_etag` and `_ts`
pub fn user_fields(mut document: Document) -> Document {
    document.strip_system_fields();
    document
}

//! In-memory document store
//!
//! Keeps containers in process memory. Suitable for tests and local
//! development; data is lost when the process exits.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;
use unigate_core::{Document, PartitionKeyPath, QuerySpec, Selection};

use crate::traits::{ensure_id, stamp_system_fields, ContainerProperties, DocumentStore};
use crate::{StoreError, StoreResult};

/// (partition key value, id)
type ItemKey = (String, String);

struct StoredItem {
    /// Insertion sequence, gives queries a stable order
    seq: u64,
    document: Document,
}

struct MemoryContainer {
    partition_key: PartitionKeyPath,
    items: HashMap<ItemKey, StoredItem>,
}

/// In-memory document store
pub struct MemoryStore {
    containers: RwLock<HashMap<String, MemoryContainer>>,
    next_seq: AtomicU64,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            containers: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of documents in a container, `None` if it does not exist
    pub async fn item_count(&self, container: &str) -> Option<usize> {
        let containers = self.containers.read().await;
        containers.get(container).map(|c| c.items.len())
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn partition_key_of(
        container: &str,
        partition_key: &PartitionKeyPath,
        document: &Document,
    ) -> StoreResult<String> {
        document
            .partition_key_value(partition_key)
            .ok_or_else(|| StoreError::MissingPartitionKey {
                container: container.to_string(),
                path: partition_key.to_string(),
            })
    }

    fn container_not_found(container: &str) -> StoreError {
        StoreError::ContainerNotFound(container.to_string())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create_container_if_not_exists(
        &self,
        container: &str,
        partition_key: &PartitionKeyPath,
    ) -> StoreResult<ContainerProperties> {
        self.check_open()?;
        let mut containers = self.containers.write().await;

        let entry = containers
            .entry(container.to_string())
            .or_insert_with(|| {
                tracing::debug!("Created memory container {} ({})", container, partition_key);
                MemoryContainer {
                    partition_key: partition_key.clone(),
                    items: HashMap::new(),
                }
            });

        Ok(ContainerProperties {
            id: container.to_string(),
            partition_key: entry.partition_key.clone(),
        })
    }

    async fn create_item(&self, container: &str, mut document: Document) -> StoreResult<Document> {
        self.check_open()?;
        let mut containers = self.containers.write().await;
        let target = containers
            .get_mut(container)
            .ok_or_else(|| Self::container_not_found(container))?;

        let id = ensure_id(&mut document);
        let pk = Self::partition_key_of(container, &target.partition_key, &document)?;
        let key = (pk, id.clone());

        if target.items.contains_key(&key) {
            return Err(StoreError::Conflict {
                container: container.to_string(),
                id,
            });
        }

        stamp_system_fields(&mut document);
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        target.items.insert(
            key,
            StoredItem {
                seq,
                document: document.clone(),
            },
        );

        Ok(document)
    }

    async fn upsert_item(&self, container: &str, mut document: Document) -> StoreResult<Document> {
        self.check_open()?;
        let mut containers = self.containers.write().await;
        let target = containers
            .get_mut(container)
            .ok_or_else(|| Self::container_not_found(container))?;

        let id = ensure_id(&mut document);
        let pk = Self::partition_key_of(container, &target.partition_key, &document)?;
        stamp_system_fields(&mut document);

        let key = (pk, id);
        let seq = match target.items.get(&key) {
            Some(existing) => existing.seq,
            None => self.next_seq.fetch_add(1, Ordering::SeqCst),
        };
        target.items.insert(
            key,
            StoredItem {
                seq,
                document: document.clone(),
            },
        );

        Ok(document)
    }

    async fn read_item(
        &self,
        container: &str,
        id: &str,
        partition_key: &str,
    ) -> StoreResult<Option<Document>> {
        self.check_open()?;
        let containers = self.containers.read().await;
        let target = containers
            .get(container)
            .ok_or_else(|| Self::container_not_found(container))?;

        Ok(target
            .items
            .get(&(partition_key.to_string(), id.to_string()))
            .map(|item| item.document.clone()))
    }

    async fn replace_item(
        &self,
        container: &str,
        id: &str,
        partition_key: &str,
        mut document: Document,
        if_match: Option<&str>,
    ) -> StoreResult<Document> {
        self.check_open()?;
        let mut containers = self.containers.write().await;
        let target = containers
            .get_mut(container)
            .ok_or_else(|| Self::container_not_found(container))?;

        if document.id() != Some(id) {
            return Err(StoreError::InvalidDocument(format!(
                "replacement for '{}' carries a different id",
                id
            )));
        }
        let new_pk = Self::partition_key_of(container, &target.partition_key, &document)?;
        if new_pk != partition_key {
            return Err(StoreError::InvalidDocument(format!(
                "replacement for '{}' changes the partition key value",
                id
            )));
        }

        let key = (partition_key.to_string(), id.to_string());
        let item = target
            .items
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound {
                container: container.to_string(),
                id: id.to_string(),
            })?;

        if let Some(expected) = if_match {
            if item.document.etag() != Some(expected) {
                return Err(StoreError::PreconditionFailed {
                    container: container.to_string(),
                    id: id.to_string(),
                });
            }
        }

        stamp_system_fields(&mut document);
        item.document = document.clone();
        Ok(document)
    }

    async fn delete_item(
        &self,
        container: &str,
        id: &str,
        partition_key: &str,
    ) -> StoreResult<()> {
        self.check_open()?;
        let mut containers = self.containers.write().await;
        let target = containers
            .get_mut(container)
            .ok_or_else(|| Self::container_not_found(container))?;

        target
            .items
            .remove(&(partition_key.to_string(), id.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                container: container.to_string(),
                id: id.to_string(),
            })
    }

    async fn query_items(&self, container: &str, query: &QuerySpec) -> StoreResult<Vec<Document>> {
        self.check_open()?;
        let containers = self.containers.read().await;
        let target = containers
            .get(container)
            .ok_or_else(|| Self::container_not_found(container))?;

        let mut matching: Vec<&StoredItem> = target
            .items
            .values()
            .filter(|item| query.predicates().iter().all(|p| p.matches(&item.document)))
            .collect();
        matching.sort_by_key(|item| item.seq);

        let projected: Vec<Document> = match query.selection() {
            Selection::All => matching.into_iter().map(|i| i.document.clone()).collect(),
            Selection::Distinct(field) => {
                let mut seen: Vec<&Value> = Vec::new();
                for item in matching {
                    if let Some(value) = item.document.get(field) {
                        if !seen.contains(&value) {
                            seen.push(value);
                        }
                    }
                }
                seen.into_iter()
                    .map(|value| {
                        let mut doc = Document::new();
                        doc.insert(field.clone(), value.clone());
                        doc
                    })
                    .collect()
            }
        };

        let results = match query.pagination() {
            Some(page) => projected
                .into_iter()
                .skip(page.offset() as usize)
                .take(page.limit() as usize)
                .collect(),
            None => projected,
        };

        Ok(results)
    }

    async fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        tracing::info!("Memory store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use unigate_core::{EntityType, Pagination, Predicate, QueryBuilder};

    fn doc(value: Value) -> Document {
        Document::try_from(value).unwrap()
    }

    async fn store_with_jobs() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .create_container_if_not_exists("Jobs", &PartitionKeyPath::parse("/location").unwrap())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_system_fields() {
        let store = store_with_jobs().await;
        let created = store
            .create_item("Jobs", doc(json!({"location": "Oslo", "title": "Dev"})))
            .await
            .unwrap();

        assert!(created.id().is_some());
        assert!(created.etag().is_some());
        assert!(created.contains("_ts"));
    }

    #[tokio::test]
    async fn test_create_keeps_caller_id_and_rejects_duplicates() {
        let store = store_with_jobs().await;
        let job = doc(json!({"id": "j1", "location": "Oslo"}));

        let created = store.create_item("Jobs", job.clone()).await.unwrap();
        assert_eq!(created.id(), Some("j1"));

        let err = store.create_item("Jobs", job).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        // Same id under another partition key value is a different document
        store
            .create_item("Jobs", doc(json!({"id": "j1", "location": "Bergen"})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_requires_partition_key() {
        let store = store_with_jobs().await;
        let err = store
            .create_item("Jobs", doc(json!({"title": "Dev"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingPartitionKey { .. }));
    }

    #[tokio::test]
    async fn test_read_with_wrong_partition_key_finds_nothing() {
        let store = store_with_jobs().await;
        store
            .create_item("Jobs", doc(json!({"id": "j1", "location": "Oslo"})))
            .await
            .unwrap();

        assert!(store.read_item("Jobs", "j1", "Oslo").await.unwrap().is_some());
        assert!(store.read_item("Jobs", "j1", "Bergen").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_with_stale_etag() {
        let store = store_with_jobs().await;
        let created = store
            .create_item("Jobs", doc(json!({"id": "j1", "location": "Oslo"})))
            .await
            .unwrap();
        let etag = created.etag().unwrap().to_string();

        let mut first = created.clone();
        first.insert("views", 1);
        store
            .replace_item("Jobs", "j1", "Oslo", first, Some(&etag))
            .await
            .unwrap();

        let mut second = created;
        second.insert("views", 2);
        let err = store
            .replace_item("Jobs", "j1", "Oslo", second, Some(&etag))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed { .. }));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let store = store_with_jobs().await;
        let err = store.delete_item("Jobs", "nope", "Oslo").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_query_filters_and_pages_in_insertion_order() {
        let store = store_with_jobs().await;
        for i in 0..5 {
            store
                .create_item(
                    "Jobs",
                    doc(json!({"id": format!("j{}", i), "location": "Oslo", "jobType": "remote"})),
                )
                .await
                .unwrap();
        }
        store
            .create_item("Jobs", doc(json!({"id": "x", "location": "Oslo", "jobType": "onsite"})))
            .await
            .unwrap();

        let query = QueryBuilder::new(EntityType::Job)
            .filter(Predicate::exact("jobType", "remote"))
            .paginate(Some(Pagination::new(2, 2).unwrap()))
            .build()
            .unwrap();
        let page = store.query_items("Jobs", &query).await.unwrap();

        let ids: Vec<_> = page.iter().filter_map(|d| d.id()).collect();
        assert_eq!(ids, ["j2", "j3"]);
    }

    #[tokio::test]
    async fn test_query_distinct() {
        let store = MemoryStore::new();
        store
            .create_container_if_not_exists("RentalItems", &PartitionKeyPath::parse("/category").unwrap())
            .await
            .unwrap();
        for (id, category) in [("1", "tools"), ("2", "bikes"), ("3", "tools")] {
            store
                .create_item("RentalItems", doc(json!({"id": id, "category": category})))
                .await
                .unwrap();
        }

        let query = QueryBuilder::distinct(EntityType::RentalItem, "category")
            .build()
            .unwrap();
        let values = store.query_items("RentalItems", &query).await.unwrap();
        assert_eq!(values, vec![doc(json!({"category": "tools"})), doc(json!({"category": "bikes"}))]);
    }

    #[tokio::test]
    async fn test_closed_store_rejects_calls() {
        let store = store_with_jobs().await;
        store.close().await.unwrap();
        let err = store.read_item("Jobs", "j1", "Oslo").await.unwrap_err();
        assert!(matches!(err, StoreError::Closed));
    }
}

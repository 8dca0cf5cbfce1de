//! Generic CRUD over one entity type's container

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use unigate_core::{Document, EntityType, Pagination, Predicate, QueryBuilder};
use unigate_store::{ContainerHandle, ContainerRegistry, DocumentStore, StoreError};

use crate::filters::EntityFilter;
use crate::schema::EntitySchema;
use crate::{RepositoryError, RepositoryResult};

/// How `update` guards against concurrent writers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyMode {
    /// Read, merge and write unconditionally; the last writer wins
    #[default]
    LastWriteWins,
    /// Write only if the document is unchanged since the read, else `Conflict`
    Optimistic,
}

/// CRUD for one entity type, bound to its provisioned container
#[derive(Clone)]
pub struct EntityRepository {
    store: Arc<dyn DocumentStore>,
    handle: ContainerHandle,
    schema: EntitySchema,
    concurrency: ConcurrencyMode,
}

impl EntityRepository {
    /// Provision (or reuse) the container for `entity` and bind to it
    pub async fn open(
        registry: &ContainerRegistry,
        entity: EntityType,
        concurrency: ConcurrencyMode,
    ) -> RepositoryResult<Self> {
        let handle = registry.handle(entity).await?;
        Ok(Self {
            store: registry.store().clone(),
            handle,
            schema: EntitySchema::for_entity(entity),
            concurrency,
        })
    }

    pub fn entity(&self) -> EntityType {
        self.handle.entity()
    }

    pub fn handle(&self) -> &ContainerHandle {
        &self.handle
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn concurrency(&self) -> ConcurrencyMode {
        self.concurrency
    }

    /// Validate, stamp managed fields and insert
    pub async fn create(&self, document: Document) -> RepositoryResult<Document> {
        let document = self.schema.prepare_create(document)?;
        let created = self
            .store
            .create_item(self.handle.name(), document)
            .await
            .map_err(|e| self.normalize(e))?;

        tracing::info!(
            "Created {} {}",
            self.entity().display_name(),
            created.id().unwrap_or_default()
        );
        Ok(created)
    }

    /// Insert or replace by id and partition key value
    pub async fn upsert(&self, mut document: Document) -> RepositoryResult<Document> {
        document.strip_system_fields();
        self.schema.validate(&document)?;

        let stored = self
            .store
            .upsert_item(self.handle.name(), document)
            .await
            .map_err(|e| self.normalize(e))?;

        tracing::info!(
            "Upserted {} {}",
            self.entity().display_name(),
            stored.id().unwrap_or_default()
        );
        Ok(stored)
    }

    /// Point read. The partition key value is mandatory; with the wrong one
    /// the document is simply not found.
    pub async fn get_by_id(&self, id: &str, partition_key: Option<&str>) -> RepositoryResult<Document> {
        let partition_key = self.require_key(id, partition_key)?;

        self.store
            .read_item(self.handle.name(), id, partition_key)
            .await
            .map_err(|e| self.normalize(e))?
            .ok_or_else(|| RepositoryError::not_found(self.entity().display_name(), id))
    }

    /// Run a filtered, optionally paginated query
    pub async fn query(
        &self,
        predicates: Vec<Predicate>,
        pagination: Option<Pagination>,
    ) -> RepositoryResult<Vec<Document>> {
        let query = QueryBuilder::new(self.entity())
            .filters(predicates)
            .paginate(pagination)
            .build()?;

        self.store
            .query_items(self.handle.name(), &query)
            .await
            .map_err(|e| self.normalize(e))
    }

    /// Run the query described by a list filter
    pub async fn list(&self, filter: &impl EntityFilter) -> RepositoryResult<Vec<Document>> {
        if filter.entity() != self.entity() {
            return Err(RepositoryError::validation(format!(
                "{} filter cannot be applied to {}",
                filter.entity().display_name(),
                self.handle.name()
            )));
        }
        self.query(filter.predicates(), filter.pagination()?).await
    }

    /// Distinct values of one field across the container
    pub async fn distinct_values(&self, field: &str) -> RepositoryResult<Vec<Value>> {
        let query = QueryBuilder::distinct(self.entity(), field).build()?;
        let rows = self
            .store
            .query_items(self.handle.name(), &query)
            .await
            .map_err(|e| self.normalize(e))?;

        Ok(rows
            .into_iter()
            .filter_map(|mut row| row.remove(field))
            .collect())
    }

    /// Read, shallow-merge `patch`, write back.
    ///
    /// The patch may not move the document: changing `id` or the partition
    /// key value is rejected. Store-owned fields in the patch are ignored.
    pub async fn update(
        &self,
        id: &str,
        partition_key: Option<&str>,
        mut patch: Document,
    ) -> RepositoryResult<Document> {
        let partition_key = self.require_key(id, partition_key)?;
        patch.strip_system_fields();
        self.check_patch(id, partition_key, &patch)?;

        let existing = self.get_by_id(id, Some(partition_key)).await?;
        let mut merged = existing.merged(&patch);
        self.schema.touch(&mut merged);

        let if_match = match self.concurrency {
            ConcurrencyMode::LastWriteWins => None,
            ConcurrencyMode::Optimistic => existing.etag(),
        };

        let updated = self
            .store
            .replace_item(self.handle.name(), id, partition_key, merged, if_match)
            .await
            .map_err(|e| self.normalize(e))?;

        tracing::info!("Updated {} {}", self.entity().display_name(), id);
        Ok(updated)
    }

    pub async fn delete(&self, id: &str, partition_key: Option<&str>) -> RepositoryResult<()> {
        let partition_key = self.require_key(id, partition_key)?;

        self.store
            .delete_item(self.handle.name(), id, partition_key)
            .await
            .map_err(|e| self.normalize(e))?;

        tracing::info!("Deleted {} {}", self.entity().display_name(), id);
        Ok(())
    }

    fn require_key<'a>(&self, id: &str, partition_key: Option<&'a str>) -> RepositoryResult<&'a str> {
        let field = self.handle.partition_key().field();
        match partition_key.filter(|pk| !pk.trim().is_empty()) {
            Some(pk) if !id.trim().is_empty() => Ok(pk),
            _ => Err(RepositoryError::MissingPartitionKey {
                entity: self.entity().display_name().to_string(),
                field: field.to_string(),
            }),
        }
    }

    fn check_patch(&self, id: &str, partition_key: &str, patch: &Document) -> RepositoryResult<()> {
        if patch.contains("id") && patch.id() != Some(id) {
            return Err(RepositoryError::validation(format!(
                "Cannot change the id of {} {}",
                self.entity().display_name(),
                id
            )));
        }

        let path = self.handle.partition_key();
        if patch.contains(path.field())
            && patch.partition_key_value(path).as_deref() != Some(partition_key)
        {
            tracing::warn!(
                "Rejected attempt to change {} (partition key value) of {} {}",
                path.field(),
                self.entity().display_name(),
                id
            );
            return Err(RepositoryError::validation(format!(
                "Cannot change {} (partition key) of an existing {}; delete and recreate it instead",
                path.field(),
                self.entity().display_name()
            )));
        }

        Ok(())
    }

    /// Normalize a store error, naming the entity rather than the container
    fn normalize(&self, err: StoreError) -> RepositoryError {
        let entity = self.entity().display_name().to_string();
        match RepositoryError::from(err) {
            RepositoryError::NotFound { id, .. } => RepositoryError::NotFound { entity, id },
            RepositoryError::Conflict { id, .. } => RepositoryError::Conflict { entity, id },
            RepositoryError::MissingPartitionKey { field, .. } => {
                RepositoryError::MissingPartitionKey { entity, field }
            }
            other => {
                if !other.is_client_error() {
                    tracing::error!("{} store operation failed: {}", self.handle.name(), other);
                }
                other
            }
        }
    }
}

impl std::fmt::Debug for EntityRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRepository")
            .field("backend", &self.store.backend())
            .field("handle", &self.handle)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

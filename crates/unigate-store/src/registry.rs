//! Container registry
//!
//! Provisions one container per entity type and caches the resulting handle
//! for the life of the process. The cache is read-mostly: after warm-up every
//! lookup is a shared read.
//!
//! Two tasks racing to provision the same container may both reach the store.
//! That is harmless since `create_container_if_not_exists` is idempotent; the
//! first handle inserted into the cache wins and both callers get equal
//! handles.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use unigate_core::{EntityType, PartitionKeyPath, PartitionKeyPolicy};

use crate::{DocumentStore, StoreError, StoreResult};

/// A provisioned container bound to its partition key definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    entity: EntityType,
    name: Arc<str>,
    partition_key: PartitionKeyPath,
}

impl ContainerHandle {
    pub fn entity(&self) -> EntityType {
        self.entity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition_key(&self) -> &PartitionKeyPath {
        &self.partition_key
    }
}

/// Idempotent, cached container provisioning
pub struct ContainerRegistry {
    store: Arc<dyn DocumentStore>,
    containers: RwLock<HashMap<EntityType, ContainerHandle>>,
}

impl ContainerRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            containers: RwLock::new(HashMap::new()),
        }
    }

    /// The shared store connection
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Handle for an entity type using its policy partition key
    pub async fn handle(&self, entity: EntityType) -> StoreResult<ContainerHandle> {
        self.ensure(entity, &PartitionKeyPolicy::resolve(entity)).await
    }

    /// Ensure the container for `entity` exists, partitioned by `partition_key`.
    ///
    /// Fails with `PartitionKeyMismatch` if the container already exists with
    /// a different partition key path; the store cannot change it.
    pub async fn ensure(
        &self,
        entity: EntityType,
        partition_key: &PartitionKeyPath,
    ) -> StoreResult<ContainerHandle> {
        if let Some(handle) = self.cached(entity).await {
            check_partition_key(&handle, partition_key)?;
            return Ok(handle);
        }

        let name = entity.container_name();
        let properties = self
            .store
            .create_container_if_not_exists(name, partition_key)
            .await
            .map_err(|e| {
                tracing::error!("Error accessing or creating {} container: {}", name, e);
                StoreError::ProvisioningFailed {
                    container: name.to_string(),
                    reason: e.to_string(),
                }
            })?;

        let handle = ContainerHandle {
            entity,
            name: Arc::from(name),
            partition_key: properties.partition_key,
        };
        check_partition_key(&handle, partition_key)?;

        let mut containers = self.containers.write().await;
        let handle = containers.entry(entity).or_insert(handle).clone();
        tracing::debug!(
            "Container {} ready on {} store ({})",
            handle.name(),
            self.store.backend(),
            handle.partition_key()
        );

        Ok(handle)
    }

    /// Provision several containers, stopping at the first failure
    pub async fn provision_all(&self, entities: &[EntityType]) -> StoreResult<Vec<ContainerHandle>> {
        let mut handles = Vec::with_capacity(entities.len());
        for entity in entities {
            handles.push(self.handle(*entity).await?);
        }
        tracing::info!("All {} containers are ready", handles.len());
        Ok(handles)
    }

    /// Cached handle, without touching the store
    pub async fn cached(&self, entity: EntityType) -> Option<ContainerHandle> {
        self.containers.read().await.get(&entity).cloned()
    }

    /// Number of cached containers
    pub async fn len(&self) -> usize {
        self.containers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.containers.read().await.is_empty()
    }
}

fn check_partition_key(handle: &ContainerHandle, requested: &PartitionKeyPath) -> StoreResult<()> {
    if handle.partition_key() == requested {
        Ok(())
    } else {
        tracing::error!(
            "Container {} is partitioned by {} but {} was requested",
            handle.name(),
            handle.partition_key(),
            requested
        );
        Err(StoreError::PartitionKeyMismatch {
            container: handle.name().to_string(),
            existing: handle.partition_key().to_string(),
            requested: requested.to_string(),
        })
    }
}

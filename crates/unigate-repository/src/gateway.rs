//! Gateway facade
//!
//! Owns the shared store connection and container registry, and hands out
//! repositories and workflows bound to them. Cloning is cheap.

use std::sync::Arc;
use unigate_core::EntityType;
use unigate_store::{ContainerRegistry, DocumentStore, StoreConfig};

use crate::repository::{ConcurrencyMode, EntityRepository};
use crate::workflow::{ApplicationWorkflow, UserDataWorkflow};
use crate::RepositoryResult;

#[derive(Clone)]
pub struct Gateway {
    registry: Arc<ContainerRegistry>,
    concurrency: ConcurrencyMode,
}

impl Gateway {
    /// Wrap an already open store connection
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            registry: Arc::new(ContainerRegistry::new(store)),
            concurrency: ConcurrencyMode::default(),
        }
    }

    /// Open the store described by `config`
    pub async fn connect(config: &StoreConfig) -> RepositoryResult<Self> {
        let store = config.connect().await?;
        Ok(Self::new(store))
    }

    pub fn with_concurrency(mut self, concurrency: ConcurrencyMode) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Provision every well-known container.
    ///
    /// Run once at startup; a failure here means the gateway cannot serve.
    pub async fn init(&self) -> RepositoryResult<()> {
        tracing::info!(
            "Setting up containers on {} store...",
            self.registry.store().backend()
        );
        self.registry.provision_all(&EntityType::ALL).await?;
        Ok(())
    }

    pub async fn repository(&self, entity: EntityType) -> RepositoryResult<EntityRepository> {
        EntityRepository::open(&self.registry, entity, self.concurrency).await
    }

    pub async fn applications(&self) -> RepositoryResult<ApplicationWorkflow> {
        Ok(ApplicationWorkflow::new(
            self.repository(EntityType::Job).await?,
            self.repository(EntityType::Application).await?,
        ))
    }

    pub async fn user_data(&self) -> RepositoryResult<UserDataWorkflow> {
        Ok(UserDataWorkflow::new(
            self.repository(EntityType::HousingProperty).await?,
        ))
    }

    pub fn registry(&self) -> &Arc<ContainerRegistry> {
        &self.registry
    }

    pub fn concurrency(&self) -> ConcurrencyMode {
        self.concurrency
    }

    /// Release the store connection
    pub async fn close(&self) -> RepositoryResult<()> {
        self.registry.store().close().await?;
        tracing::info!("Store connection closed");
        Ok(())
    }
}

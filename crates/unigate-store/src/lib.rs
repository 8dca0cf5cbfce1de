//! Store layer for the Unigate gateway
//!
//! This crate owns everything that talks to the backing document store:
//!
//! - [`DocumentStore`]: the injectable store connection every repository
//!   shares. It is constructed once at startup and closed on shutdown.
//! - [`MemoryStore`]: in-process backend for tests and local development
//! - `PostgresStore` (feature `postgres`): containers as JSONB tables
//! - [`ContainerRegistry`]: idempotent, cached container provisioning
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use unigate_core::EntityType;
//! use unigate_store::{ContainerRegistry, DocumentStore, MemoryStore};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
//! let registry = ContainerRegistry::new(store);
//!
//! let jobs = registry.handle(EntityType::Job).await?;
//! assert_eq!(jobs.partition_key().as_str(), "/location");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod registry;
pub mod traits;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use registry::{ContainerHandle, ContainerRegistry};
pub use traits::{ContainerProperties, DocumentStore};

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

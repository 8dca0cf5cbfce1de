//! Store connection configuration
//!
//! ```rust
//! use unigate_store::StoreConfig;
//!
//! // In-memory store (tests, local development)
//! let config = StoreConfig::memory();
//!
//! // PostgreSQL-backed store
//! let config = StoreConfig::postgres("postgresql://localhost/unigate");
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{DocumentStore, MemoryStore, StoreResult};

fn default_max_connections() -> u32 {
    10
}

/// Which backend to connect to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-process memory store
    Memory,
    /// PostgreSQL with one JSONB table per container
    Postgres {
        /// Connection URL
        url: String,
        /// Pool size
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory
    }
}

impl StoreConfig {
    pub fn memory() -> Self {
        StoreConfig::Memory
    }

    pub fn postgres(url: impl Into<String>) -> Self {
        StoreConfig::Postgres {
            url: url.into(),
            max_connections: default_max_connections(),
        }
    }

    /// Open the connection described by this configuration
    pub async fn connect(&self) -> StoreResult<Arc<dyn DocumentStore>> {
        match self {
            StoreConfig::Memory => {
                tracing::info!("Using in-memory document store");
                Ok(Arc::new(MemoryStore::new()))
            }
            #[cfg(feature = "postgres")]
            StoreConfig::Postgres {
                url,
                max_connections,
            } => {
                let store = crate::PostgresStore::connect(url, *max_connections).await?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "postgres"))]
            StoreConfig::Postgres { .. } => Err(crate::StoreError::Unavailable(
                "PostgreSQL support requires the 'postgres' feature".to_string(),
            )),
        }
    }
}

//! Entity repositories for the Unigate gateway
//!
//! Sits between the HTTP surface and the store layer:
//!
//! - [`EntityRepository`]: CRUD for one entity type, bound to its container
//! - [`EntitySchema`]: required fields, server-managed fields and id rules
//! - [`filters`]: typed list filters mapped onto query predicates
//! - [`ApplicationWorkflow`]: job application submission (reads the job,
//!   writes the application)
//! - [`Gateway`]: owns the store connection and hands out the above
//!
//! Every operation returns a [`RepositoryError`]; store errors never leak.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use std::sync::Arc;
//! use unigate_core::{Document, EntityType};
//! use unigate_repository::Gateway;
//! use unigate_store::MemoryStore;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let gateway = Gateway::new(Arc::new(MemoryStore::new()));
//! gateway.init().await?;
//!
//! let jobs = gateway.repository(EntityType::Job).await?;
//! let job = jobs
//!     .create(Document::try_from(json!({
//!         "title": "Barista",
//!         "description": "Morning shifts",
//!         "companyName": "Beans",
//!         "location": "Berlin",
//!         "jobType": "part-time",
//!         "contactEmail": "hr@beans.example"
//!     }))?)
//!     .await?;
//!
//! let found = jobs.get_by_id(job.id().unwrap_or_default(), Some("Berlin")).await?;
//! assert_eq!(found.get_str("status"), Some("active"));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod filters;
pub mod gateway;
pub mod repository;
pub mod schema;
pub mod workflow;

pub use error::{RepositoryError, RepositoryResult};
pub use filters::{
    AllOf, ApplicationFilter, EntityFilter, FoodItemFilter, JobFilter, RentalFilter,
};
pub use gateway::Gateway;
pub use repository::{ConcurrencyMode, EntityRepository};
pub use schema::{EntitySchema, IdStrategy, Managed};
pub use workflow::{ApplicationSubmission, ApplicationWorkflow, UserDataWorkflow};

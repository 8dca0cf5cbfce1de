//! Unigate HTTP server library
//!
//! Exposes the router, configuration and error types so the binary and the
//! integration tests build the same application.

pub mod api;
pub mod config;
pub mod error;

use std::sync::Arc;
use unigate_repository::Gateway;
use unigate_store::MemoryStore;

pub use api::{create_router, AppState};
pub use config::ServerConfig;
pub use error::ServerError;

/// Build the full application for a configured gateway
pub fn app(gateway: Gateway, config: &ServerConfig) -> axum::Router {
    create_router(
        AppState::new(gateway, &config.environment),
        &config.cors_allowed_origins,
    )
}

/// Provisioned application over a fresh in-memory store
pub async fn memory_app(config: &ServerConfig) -> Result<axum::Router, ServerError> {
    let gateway = Gateway::new(Arc::new(MemoryStore::new()))
        .with_concurrency(config.update_concurrency);
    gateway.init().await?;
    Ok(app(gateway, config))
}

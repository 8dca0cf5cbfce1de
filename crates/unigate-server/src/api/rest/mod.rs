//! REST API implementation
//!
//! - types: request/response type definitions and shared state
//! - extractors: JSON and query extractors with uniform error bodies
//! - handlers: endpoint handlers
//! - router: route table, CORS and tracing layers
//! - tests: router-level unit tests

mod extractors;
mod handlers;
mod router;
pub mod types;

// Re-export public API
pub use extractors::{JsonExtractor, QueryExtractor};
pub use router::create_router;
pub use types::{ApiResponse, AppState, HealthResponse, MessageResponse, RouteNotFoundResponse};

//! REST API type definitions
//!
//! Request and response types for the REST API endpoints.

use crate::error::ServerError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use unigate_core::Document;
use unigate_repository::{Gateway, RepositoryError};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub environment: Arc<str>,
}

impl AppState {
    pub fn new(gateway: Gateway, environment: &str) -> Self {
        Self {
            gateway,
            environment: Arc::from(environment),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Turn a repository error into a response, hiding internals in production
    pub fn reject(&self, err: RepositoryError) -> ServerError {
        let err = ServerError::from(err);
        if self.is_production() {
            err.redacted()
        } else {
            err
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
    pub status: String,
    pub version: String,
    pub environment: String,
    pub store: String,
    pub timestamp: String,
}

/// Success envelope: `{"message", "data"}`, plus `count` for lists
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl ApiResponse<Document> {
    pub fn item(message: impl Into<String>, data: Document) -> Self {
        Self {
            message: message.into(),
            data,
            count: None,
        }
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    pub fn list(message: impl Into<String>, data: Vec<T>) -> Self {
        Self {
            message: message.into(),
            count: Some(data.len()),
            data,
        }
    }
}

/// Body of a successful delete
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Fallback body for unknown routes
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteNotFoundResponse {
    pub message: String,
    pub status: u16,
    pub available_routes: Vec<&'static str>,
}

/// `?jobLocation=` on application submission
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobLocationQuery {
    pub job_location: Option<String>,
}

/// Arbitrary JSON object carried by `POST /api/users/:email/properties`
pub type PropertyPayload = serde_json::Map<String, Value>;

//! Custom extractors
//!
//! JSON and query-string extractors whose rejections use the same
//! `{"error", "status"}` body as every other error.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::{request::Parts, StatusCode},
    Json,
};
use serde_json::json;

type Rejection = (StatusCode, Json<serde_json::Value>);

fn bad_request(message: String) -> Rejection {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": message,
            "status": 400,
        })),
    )
}

/// Custom JSON extractor with better error messages
pub struct JsonExtractor<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonExtractor<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(value) => Ok(Self(value.0)),
            Err(rejection) => {
                let error_message = match rejection {
                    JsonRejection::JsonDataError(err) => {
                        format!("Invalid JSON data: {}", err)
                    }
                    JsonRejection::JsonSyntaxError(err) => {
                        format!("JSON syntax error: {}", err)
                    }
                    JsonRejection::MissingJsonContentType(_) => {
                        "Missing 'Content-Type: application/json' header".to_string()
                    }
                    _ => format!("Failed to parse JSON: {}", rejection),
                };
                Err(bad_request(error_message))
            }
        }
    }
}

/// Query string extractor, e.g. rejects `?page=abc` with a JSON body
pub struct QueryExtractor<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for QueryExtractor<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(QueryRejection::FailedToDeserializeQueryString(err)) => {
                Err(bad_request(format!("Invalid query string: {}", err.body_text())))
            }
            Err(rejection) => Err(bad_request(rejection.body_text())),
        }
    }
}

//! Router creation and configuration
//!
//! Creates the Axum router for every REST endpoint.

use super::handlers::*;
use super::types::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create REST API router
pub fn create_router(state: AppState, cors_allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .nest("/api/jobs", job_routes())
        .nest("/api/applications", application_routes())
        .nest("/api/rentals", rental_routes())
        .nest("/api/food", food_routes())
        .nest("/api/events", event_routes())
        .nest("/api/users", user_routes())
        .nest("/api/products", product_routes())
        // Legacy paths
        .nest("/events", event_routes())
        .nest("/users", user_routes())
        .nest("/products", product_routes())
        .fallback(route_not_found)
        .with_state(state)
        .layer(cors_layer(cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}

fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create::<Jobs>).get(list_jobs))
        .route(
            "/:id",
            get(get_one::<Jobs>)
                .put(update::<Jobs>)
                .delete(delete::<Jobs>),
        )
}

fn application_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_applications))
        .route("/:job_id/apply", post(apply))
}

fn rental_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(rental_categories))
        .route("/filter/:category", get(filter_rentals))
        .route("/items", post(create::<RentalItems>))
        .route(
            "/items/:id",
            get(get_one::<RentalItems>)
                .put(update::<RentalItems>)
                .delete(delete::<RentalItems>),
        )
}

fn food_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/restaurants",
            post(create_restaurant).get(list_restaurants),
        )
        .route(
            "/restaurants/:id/food",
            post(add_food_item).get(list_food_items),
        )
}

fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all::<Events>))
        .route("/createEvent", post(create::<Events>))
        .route(
            "/:id",
            get(get_one::<Events>)
                .put(update::<Events>)
                .delete(delete::<Events>),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create::<Users>).get(list_all::<Users>))
        .route(
            "/:id",
            get(get_one::<Users>)
                .put(update::<Users>)
                .delete(delete::<Users>),
        )
        .route("/:id/properties", post(record_user_data))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create::<Products>).get(list_all::<Products>))
        .route(
            "/:id",
            get(get_one::<Products>)
                .put(update::<Products>)
                .delete(delete::<Products>),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

//! API endpoint handlers
//!
//! Plain CRUD collections share the generic handlers below, parameterized by
//! a [`Resource`]. Endpoints with their own semantics (job and rental
//! listings, applications, food) have dedicated handlers.

use super::extractors::{JsonExtractor, QueryExtractor};
use super::types::*;
use crate::error::ServerError;
use axum::{
    extract::{OriginalUri, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::collections::HashMap;
use unigate_core::{Document, EntityType};
use unigate_repository::{
    AllOf, ApplicationFilter, ApplicationSubmission, EntityRepository, FoodItemFilter,
    JobFilter, RentalFilter,
};

type Params = HashMap<String, String>;

/// A collection exposed through the generic CRUD handlers
pub(super) trait Resource: Send + Sync + 'static {
    const ENTITY: EntityType;

    /// Query parameter carrying the partition key value; `None` when the
    /// document id is the partition key
    const KEY_PARAM: Option<&'static str>;

    /// Query parameter carrying the partition key value on update
    const UPDATE_KEY_PARAM: Option<&'static str> = Self::KEY_PARAM;
}

pub(super) struct Jobs;
pub(super) struct Events;
pub(super) struct RentalItems;
pub(super) struct Users;
pub(super) struct Products;

impl Resource for Jobs {
    const ENTITY: EntityType = EntityType::Job;
    const KEY_PARAM: Option<&'static str> = Some("location");
    const UPDATE_KEY_PARAM: Option<&'static str> = Some("currentLocation");
}

impl Resource for Events {
    const ENTITY: EntityType = EntityType::Event;
    const KEY_PARAM: Option<&'static str> = None;
}

impl Resource for RentalItems {
    const ENTITY: EntityType = EntityType::RentalItem;
    const KEY_PARAM: Option<&'static str> = Some("category");
}

impl Resource for Users {
    const ENTITY: EntityType = EntityType::User;
    const KEY_PARAM: Option<&'static str> = Some("email");
}

impl Resource for Products {
    const ENTITY: EntityType = EntityType::Product;
    const KEY_PARAM: Option<&'static str> = None;
}

pub(super) fn partition_key<'a>(id: &'a str, params: &'a Params, param: Option<&str>) -> Option<&'a str> {
    match param {
        None => Some(id),
        Some(name) => params.get(name).map(String::as_str),
    }
}

async fn repository(state: &AppState, entity: EntityType) -> Result<EntityRepository, ServerError> {
    state
        .gateway
        .repository(entity)
        .await
        .map_err(|e| state.reject(e))
}

fn created(message: String, data: Document) -> impl IntoResponse {
    (StatusCode::CREATED, Json(ApiResponse::item(message, data)))
}

/// Health check endpoint
pub(super) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "Unified Backend API is running!".to_string(),
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.environment.to_string(),
        store: state.gateway.registry().store().backend().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub(super) async fn create<R: Resource>(
    State(state): State<AppState>,
    JsonExtractor(document): JsonExtractor<Document>,
) -> Result<impl IntoResponse, ServerError> {
    let repo = repository(&state, R::ENTITY).await?;
    let document = repo.create(document).await.map_err(|e| state.reject(e))?;

    Ok(created(
        format!("{} created successfully", R::ENTITY.display_name()),
        document,
    ))
}

pub(super) async fn list_all<R: Resource>(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Document>>>, ServerError> {
    let repo = repository(&state, R::ENTITY).await?;
    let documents = repo
        .list(&AllOf(R::ENTITY))
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(ApiResponse::list(
        format!("{} retrieved successfully", R::ENTITY.container_name()),
        documents,
    )))
}

pub(super) async fn get_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    QueryExtractor(params): QueryExtractor<Params>,
) -> Result<Json<ApiResponse<Document>>, ServerError> {
    let repo = repository(&state, R::ENTITY).await?;
    let document = repo
        .get_by_id(&id, partition_key(&id, &params, R::KEY_PARAM))
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(ApiResponse::item(
        format!("{} retrieved successfully", R::ENTITY.display_name()),
        document,
    )))
}

pub(super) async fn update<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    QueryExtractor(params): QueryExtractor<Params>,
    JsonExtractor(patch): JsonExtractor<Document>,
) -> Result<Json<ApiResponse<Document>>, ServerError> {
    let repo = repository(&state, R::ENTITY).await?;
    let document = repo
        .update(&id, partition_key(&id, &params, R::UPDATE_KEY_PARAM), patch)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(ApiResponse::item(
        format!("{} updated successfully", R::ENTITY.display_name()),
        document,
    )))
}

pub(super) async fn delete<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    QueryExtractor(params): QueryExtractor<Params>,
) -> Result<Json<MessageResponse>, ServerError> {
    let repo = repository(&state, R::ENTITY).await?;
    repo.delete(&id, partition_key(&id, &params, R::KEY_PARAM))
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(MessageResponse {
        message: format!("{} deleted successfully", R::ENTITY.display_name()),
    }))
}

/// `GET /api/jobs`
pub(super) async fn list_jobs(
    State(state): State<AppState>,
    QueryExtractor(filter): QueryExtractor<JobFilter>,
) -> Result<Json<ApiResponse<Vec<Document>>>, ServerError> {
    let repo = repository(&state, EntityType::Job).await?;
    let jobs = repo.list(&filter).await.map_err(|e| state.reject(e))?;
    Ok(Json(ApiResponse::list("Jobs retrieved successfully", jobs)))
}

/// `POST /api/applications/:jobId/apply`
pub(super) async fn apply(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    QueryExtractor(query): QueryExtractor<JobLocationQuery>,
    JsonExtractor(submission): JsonExtractor<ApplicationSubmission>,
) -> Result<impl IntoResponse, ServerError> {
    let workflow = state
        .gateway
        .applications()
        .await
        .map_err(|e| state.reject(e))?;
    let application = workflow
        .submit(&job_id, query.job_location.as_deref(), submission)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(created(
        "Application submitted successfully".to_string(),
        application,
    ))
}

/// `GET /api/applications`
pub(super) async fn list_applications(
    State(state): State<AppState>,
    QueryExtractor(filter): QueryExtractor<ApplicationFilter>,
) -> Result<Json<ApiResponse<Vec<Document>>>, ServerError> {
    let repo = repository(&state, EntityType::Application).await?;
    let applications = repo.list(&filter).await.map_err(|e| state.reject(e))?;
    Ok(Json(ApiResponse::list(
        "Applications retrieved successfully",
        applications,
    )))
}

/// `GET /api/rentals/categories`
pub(super) async fn rental_categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, ServerError> {
    let repo = repository(&state, EntityType::RentalItem).await?;
    let categories = repo
        .distinct_values("category")
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(ApiResponse::list(
        "Categories retrieved successfully",
        categories,
    )))
}

/// `GET /api/rentals/filter/:category`
pub(super) async fn filter_rentals(
    State(state): State<AppState>,
    Path(category): Path<String>,
    QueryExtractor(filter): QueryExtractor<RentalFilter>,
) -> Result<Json<ApiResponse<Vec<Document>>>, ServerError> {
    let repo = repository(&state, EntityType::RentalItem).await?;
    let items = repo
        .list(&filter.in_category(category))
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(ApiResponse::list("Items retrieved successfully", items)))
}

/// `POST /api/food/restaurants`
pub(super) async fn create_restaurant(
    state: State<AppState>,
    body: JsonExtractor<Document>,
) -> Result<impl IntoResponse, ServerError> {
    create_in(state, EntityType::Restaurant, body.0).await
}

/// `GET /api/food/restaurants`
pub(super) async fn list_restaurants(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Document>>>, ServerError> {
    let repo = repository(&state, EntityType::Restaurant).await?;
    let restaurants = repo
        .list(&AllOf(EntityType::Restaurant))
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(ApiResponse::list(
        "Restaurants retrieved successfully",
        restaurants,
    )))
}

/// `POST /api/food/restaurants/:id/food`
pub(super) async fn add_food_item(
    state: State<AppState>,
    Path(restaurant_id): Path<String>,
    JsonExtractor(mut item): JsonExtractor<Document>,
) -> Result<impl IntoResponse, ServerError> {
    item.insert("restaurantId", restaurant_id);
    create_in(state, EntityType::FoodItem, item).await
}

/// `GET /api/food/restaurants/:id/food`
pub(super) async fn list_food_items(
    State(state): State<AppState>,
    Path(restaurant_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Document>>>, ServerError> {
    let repo = repository(&state, EntityType::FoodItem).await?;
    let items = repo
        .list(&FoodItemFilter { restaurant_id })
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(ApiResponse::list(
        "Food items retrieved successfully",
        items,
    )))
}

/// `POST /api/users/:email/properties`
pub(super) async fn record_user_data(
    State(state): State<AppState>,
    Path(email): Path<String>,
    JsonExtractor(data): JsonExtractor<PropertyPayload>,
) -> Result<impl IntoResponse, ServerError> {
    let workflow = state
        .gateway
        .user_data()
        .await
        .map_err(|e| state.reject(e))?;
    let stored = workflow
        .record(&email, Document::from(data))
        .await
        .map_err(|e| state.reject(e))?;

    Ok(created("User data saved successfully".to_string(), stored))
}

async fn create_in(
    State(state): State<AppState>,
    entity: EntityType,
    document: Document,
) -> Result<impl IntoResponse, ServerError> {
    let repo = repository(&state, entity).await?;
    let document = repo.create(document).await.map_err(|e| state.reject(e))?;
    Ok(created(
        format!("{} created successfully", entity.display_name()),
        document,
    ))
}

/// Fallback for unknown routes
pub(super) async fn route_not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(RouteNotFoundResponse {
            message: format!("Route {} not found", uri),
            status: 404,
            available_routes: vec![
                "/api/users",
                "/api/products",
                "/api/events",
                "/api/food",
                "/api/jobs",
                "/api/applications",
                "/api/rentals",
            ],
        }),
    )
}

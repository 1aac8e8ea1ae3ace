use axum::{extract::Path, http::StatusCode, Json};
use contracts::domain::a001_customer::aggregate::{
    Customer, CustomerDto, CustomerId, CustomerPatch, RevenueEditRequest, StageChangeRequest,
};

use super::{api_error, parse_id, ApiError};
use crate::domain::a001_customer::service;
use crate::shared::config;
use crate::shared::data::store::get_store;
use crate::system::auth::extractor::CurrentUser;

/// GET /api/customers
pub async fn list_all() -> Result<Json<Vec<Customer>>, ApiError> {
    service::list_all(get_store())
        .await
        .map(Json)
        .map_err(api_error)
}

/// GET /api/customers/:id
pub async fn get_by_id(Path(id): Path<String>) -> Result<Json<Customer>, ApiError> {
    let id: CustomerId = parse_id(&id)?;
    service::get_active(get_store(), id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// POST /api/customers
pub async fn create(
    Json(dto): Json<CustomerDto>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    service::create(get_store(), dto)
        .await
        .map(|c| (StatusCode::CREATED, Json(c)))
        .map_err(api_error)
}

/// PUT /api/customers/:id
pub async fn update(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(patch): Json<CustomerPatch>,
) -> Result<Json<Customer>, ApiError> {
    let id: CustomerId = parse_id(&id)?;
    let settings = config::field_settings();
    service::update_fields(get_store(), id, &patch, claims.role(), &settings)
        .await
        .map(Json)
        .map_err(api_error)
}

/// POST /api/customers/:id/stage
pub async fn change_stage(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<StageChangeRequest>,
) -> Result<Json<Customer>, ApiError> {
    let id: CustomerId = parse_id(&id)?;
    let settings = config::field_settings();
    service::change_stage(get_store(), id, request.stage, claims.role(), &settings)
        .await
        .map(Json)
        .map_err(api_error)
}

/// PUT /api/customers/:id/revenue
pub async fn edit_revenue(
    CurrentUser(claims): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<RevenueEditRequest>,
) -> Result<Json<Customer>, ApiError> {
    let id: CustomerId = parse_id(&id)?;
    let settings = config::field_settings();
    service::edit_revenue(
        get_store(),
        id,
        request.total_revenue,
        claims.role(),
        &settings,
    )
        .await
        .map(Json)
        .map_err(api_error)
}

/// DELETE /api/customers/:id (admin only)
pub async fn delete(Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let id: CustomerId = parse_id(&id)?;
    service::delete(get_store(), id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(api_error)
}

use axum::{extract::Path, http::StatusCode, Json};
use contracts::domain::a001_customer::aggregate::CustomerId;
use contracts::domain::a003_order::aggregate::{Order, OrderDto, OrderId};

use super::{api_error, parse_id, ApiError};
use crate::domain::a003_order::service;
use crate::shared::data::store::get_store;

/// GET /api/customers/:id/orders
pub async fn list(Path(customer_id): Path<String>) -> Result<Json<Vec<Order>>, ApiError> {
    let customer_id: CustomerId = parse_id(&customer_id)?;
    service::list(get_store(), customer_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// POST /api/customers/:id/orders
pub async fn add(
    Path(customer_id): Path<String>,
    Json(dto): Json<OrderDto>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let customer_id: CustomerId = parse_id(&customer_id)?;
    service::add(get_store(), customer_id, dto)
        .await
        .map(|o| (StatusCode::CREATED, Json(o)))
        .map_err(api_error)
}

/// DELETE /api/customers/:id/orders/:order_id
///
/// Responds with the removed order so the client can show what was undone.
pub async fn delete(
    Path((customer_id, order_id)): Path<(String, String)>,
) -> Result<Json<Order>, ApiError> {
    let customer_id: CustomerId = parse_id(&customer_id)?;
    let order_id: OrderId = parse_id(&order_id)?;
    service::delete(get_store(), customer_id, order_id)
        .await
        .map(Json)
        .map_err(api_error)
}

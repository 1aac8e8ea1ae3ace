use axum::{extract::Path, http::StatusCode, Json};
use contracts::domain::a001_customer::aggregate::CustomerId;
use contracts::domain::a002_note::aggregate::{Note, NoteDto, NoteFlagsDto, NoteId};

use super::{api_error, parse_id, ApiError};
use crate::domain::a002_note::service;
use crate::shared::data::store::get_store;

/// GET /api/customers/:id/notes
pub async fn list(Path(customer_id): Path<String>) -> Result<Json<Vec<Note>>, ApiError> {
    let customer_id: CustomerId = parse_id(&customer_id)?;
    service::list(get_store(), customer_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// POST /api/customers/:id/notes
pub async fn add(
    Path(customer_id): Path<String>,
    Json(dto): Json<NoteDto>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let customer_id: CustomerId = parse_id(&customer_id)?;
    service::add(get_store(), customer_id, dto)
        .await
        .map(|n| (StatusCode::CREATED, Json(n)))
        .map_err(api_error)
}

/// PATCH /api/customers/:id/notes/:note_id
pub async fn set_flags(
    Path((customer_id, note_id)): Path<(String, String)>,
    Json(flags): Json<NoteFlagsDto>,
) -> Result<Json<Note>, ApiError> {
    let customer_id: CustomerId = parse_id(&customer_id)?;
    let note_id: NoteId = parse_id(&note_id)?;
    service::set_flags(get_store(), customer_id, note_id, &flags)
        .await
        .map(Json)
        .map_err(api_error)
}

/// DELETE /api/customers/:id/notes/:note_id
pub async fn delete(
    Path((customer_id, note_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let customer_id: CustomerId = parse_id(&customer_id)?;
    let note_id: NoteId = parse_id(&note_id)?;
    service::delete(get_store(), customer_id, note_id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(api_error)
}

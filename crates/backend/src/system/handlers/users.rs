use axum::{extract::Json, http::StatusCode};
use contracts::system::auth::UserInfo;
use contracts::system::users::CreateUserDto;
use serde_json::{json, Value};

use crate::system::auth::extractor::CurrentUser;
use crate::system::users::service as user_service;

/// GET /api/system/users (admin only)
pub async fn list() -> Result<Json<Vec<UserInfo>>, StatusCode> {
    match user_service::list_all().await {
        Ok(users) => Ok(Json(users.iter().map(|u| u.info()).collect())),
        Err(e) => {
            tracing::error!("Failed to list users: {:#}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// POST /api/system/users (admin only)
pub async fn create(
    CurrentUser(claims): CurrentUser,
    Json(dto): Json<CreateUserDto>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    match user_service::create(dto, Some(claims.sub)).await {
        Ok(id) => Ok((StatusCode::CREATED, Json(json!({ "id": id })))),
        Err(e) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": e.to_string() })),
        )),
    }
}

pub mod a001_customer;
pub mod a002_note;
pub mod a003_order;
pub mod d001_customer_kpi;
pub mod field_settings;

use axum::{http::StatusCode, Json};
use contracts::domain::common::AggregateId;
use contracts::shared::error::CrmError;
use serde_json::{json, Value};

/// Error half of every CRM handler result: status plus `{ "message": ... }`
pub type ApiError = (StatusCode, Json<Value>);

pub fn status_of(err: &CrmError) -> StatusCode {
    match err {
        CrmError::Validation(_) => StatusCode::BAD_REQUEST,
        CrmError::NotFound(_) => StatusCode::NOT_FOUND,
        CrmError::Authorization(_) => StatusCode::FORBIDDEN,
        CrmError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn api_error(err: CrmError) -> ApiError {
    let status = status_of(&err);
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    }
    let message = match err {
        CrmError::Validation(m)
        | CrmError::NotFound(m)
        | CrmError::Authorization(m)
        | CrmError::Storage(m) => m,
    };
    (status, Json(json!({ "message": message })))
}

/// Parse an id from the URL path; malformed ids are a 400
pub fn parse_id<T: AggregateId>(raw: &str) -> Result<T, ApiError> {
    T::from_string(raw).map_err(|e| api_error(CrmError::validation(e)))
}

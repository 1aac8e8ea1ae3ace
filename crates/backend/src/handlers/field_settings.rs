use axum::Json;
use contracts::shared::field_settings::{CustomerField, FieldSettings};
use serde::Serialize;

use crate::shared::config;

#[derive(Debug, Serialize)]
pub struct FieldSettingsResponse {
    pub settings: FieldSettings,
    /// Fields to render, in display order
    pub visible: Vec<CustomerField>,
}

/// GET /api/settings/fields
pub async fn get_settings() -> Json<FieldSettingsResponse> {
    let settings = config::field_settings();
    let visible = settings.visible_fields();
    Json(FieldSettingsResponse { settings, visible })
}

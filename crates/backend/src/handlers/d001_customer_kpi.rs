use axum::{extract::Query, Json};
use contracts::shared::kpi::{CustomerKpis, KpiFilter};

use super::{api_error, ApiError};
use crate::dashboards::d001_customer_kpi::service;
use crate::shared::data::store::get_store;

/// GET /api/kpis?customer_id=<uuid>
pub async fn get_kpis(Query(filter): Query<KpiFilter>) -> Result<Json<CustomerKpis>, ApiError> {
    service::get_customer_kpis(get_store(), &filter)
        .await
        .map(Json)
        .map_err(api_error)
}

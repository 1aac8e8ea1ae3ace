use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::a001_customer::aggregate::CustomerId;

pub mod compute;

pub use compute::compute_kpis;

// ---------------------------------------------------------------------------
// Вычисленные показатели
// ---------------------------------------------------------------------------

/// Сводные показатели по набору клиентов
///
/// Отношение с нулевым знаменателем всегда равно 0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomerKpis {
    /// Средняя выручка клиента на этапе "ordered"
    pub clv: f64,
    /// Доля клиентов на этапе "ordered", в процентах
    #[serde(rename = "conversionRate")]
    pub conversion_rate: f64,
    #[serde(rename = "averageTouchpoints")]
    pub average_touchpoints: f64,
    /// Менеджер -> число его заметок
    #[serde(rename = "activityPerSalesAgent")]
    pub activity_per_sales_agent: BTreeMap<String, u64>,
    #[serde(rename = "revenuePerTouchpoint")]
    pub revenue_per_touchpoint: f64,
}

// ---------------------------------------------------------------------------
// Запрос API
// ---------------------------------------------------------------------------

/// Набор клиентов: все или ровно один
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KpiFilter {
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
}

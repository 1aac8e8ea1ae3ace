use crate::domain::a001_customer::aggregate::CustomerId;
use crate::domain::a002_note::aggregate::normalize_key;
use crate::domain::common::AggregateRoot;
use crate::shared::error::{CrmError, CrmResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// ID Type
// ============================================================================
crate::aggregate_id!(
    /// Идентификатор заказа
    OrderId
);

// ============================================================================
// Aggregate Root
// ============================================================================

/// Денежная операция клиента
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(rename = "customerId")]
    pub customer_id: CustomerId,
    /// Сумма; осмысленны только положительные значения
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    /// Время создания, не меняется
    pub date: DateTime<Utc>,
    #[serde(rename = "idempotencyKey", default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl Order {
    pub fn new_for_insert(customer_id: CustomerId, dto: OrderDto) -> Self {
        Self {
            id: OrderId::new_v4(),
            customer_id,
            amount: dto.amount,
            description: dto.description.trim().to_string(),
            date: Utc::now(),
            idempotency_key: normalize_key(dto.idempotency_key),
        }
    }

    pub fn validate(&self) -> CrmResult<()> {
        if !self.amount.is_finite() {
            return Err(CrmError::validation("Order amount must be a number"));
        }
        if self.amount <= 0.0 {
            return Err(CrmError::validation(format!(
                "Order amount must be positive, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn aggregate_index() -> &'static str {
        "a003"
    }

    fn collection_name() -> &'static str {
        "order"
    }

    fn element_name() -> &'static str {
        "Order"
    }
}

// ============================================================================
// DTO
// ============================================================================
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrderDto {
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "idempotencyKey", default)]
    pub idempotency_key: Option<String>,
}

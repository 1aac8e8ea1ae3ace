use crate::domain::a002_note::aggregate::Note;
use crate::domain::a003_order::aggregate::Order;
use crate::domain::common::{AggregateRoot, EntityMetadata};
use crate::shared::error::{CrmError, CrmResult};
use serde::{Deserialize, Serialize};

// ============================================================================
// ID Type
// ============================================================================
crate::aggregate_id!(
    /// Идентификатор клиента
    CustomerId
);

// ============================================================================
// Stage
// ============================================================================

/// Этап воронки: фиксированная линейная последовательность
/// new < engaged < ordered < closed lost
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CustomerStage {
    #[default]
    #[serde(rename = "new")]
    New,
    #[serde(rename = "engaged")]
    Engaged,
    #[serde(rename = "ordered")]
    Ordered,
    #[serde(rename = "closed lost", alias = "closed-lost", alias = "closed_lost")]
    ClosedLost,
}

impl CustomerStage {
    pub const ALL: [CustomerStage; 4] = [
        CustomerStage::New,
        CustomerStage::Engaged,
        CustomerStage::Ordered,
        CustomerStage::ClosedLost,
    ];

    /// Порядковый номер этапа в воронке
    pub fn ordinal(&self) -> u8 {
        match self {
            CustomerStage::New => 0,
            CustomerStage::Engaged => 1,
            CustomerStage::Ordered => 2,
            CustomerStage::ClosedLost => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStage::New => "new",
            CustomerStage::Engaged => "engaged",
            CustomerStage::Ordered => "ordered",
            CustomerStage::ClosedLost => "closed lost",
        }
    }

    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "new" => Some(CustomerStage::New),
            "engaged" => Some(CustomerStage::Engaged),
            "ordered" => Some(CustomerStage::Ordered),
            "closed lost" | "closed-lost" | "closed_lost" => Some(CustomerStage::ClosedLost),
            _ => None,
        }
    }

    /// Переход на `target` считается движением назад
    pub fn is_backward_to(&self, target: CustomerStage) -> bool {
        target.ordinal() < self.ordinal()
    }
}

impl std::fmt::Display for CustomerStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub stage: CustomerStage,
    /// Сумма заказов, прикреплённых к клиенту
    #[serde(rename = "totalRevenue", default)]
    pub total_revenue: f64,
    /// Количество когда-либо добавленных заметок (не уменьшается)
    #[serde(default)]
    pub touchpoints: i64,
    #[serde(flatten)]
    pub metadata: EntityMetadata,
}

impl Customer {
    pub fn new_for_insert(dto: CustomerDto) -> Self {
        Self {
            id: CustomerId::new_v4(),
            name: dto.name.trim().to_string(),
            email: dto.email.unwrap_or_default().trim().to_string(),
            phone: dto.phone.unwrap_or_default().trim().to_string(),
            stage: CustomerStage::New,
            total_revenue: 0.0,
            touchpoints: 0,
            metadata: EntityMetadata::new(),
        }
    }

    pub fn validate(&self) -> CrmResult<()> {
        if self.name.trim().is_empty() {
            return Err(CrmError::validation("Customer name cannot be empty"));
        }
        if !self.email.is_empty() && !self.email.contains('@') {
            return Err(CrmError::validation("Invalid email format"));
        }
        if !self.total_revenue.is_finite() {
            return Err(CrmError::validation("Total revenue must be a finite number"));
        }
        if self.touchpoints < 0 {
            return Err(CrmError::validation("Touchpoints cannot be negative"));
        }
        Ok(())
    }

    pub fn before_write(&mut self) {
        self.metadata.before_write();
    }
}

impl AggregateRoot for Customer {
    type Id = CustomerId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn aggregate_index() -> &'static str {
        "a001"
    }

    fn collection_name() -> &'static str {
        "customer"
    }

    fn element_name() -> &'static str {
        "Customer"
    }
}

// ============================================================================
// Customer card: клиент вместе с заметками и заказами
// ============================================================================

/// Персистентное состояние клиента, над которым работает движок жизненного цикла
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerCard {
    pub customer: Customer,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl CustomerCard {
    pub fn new(customer: Customer) -> Self {
        Self {
            customer,
            notes: Vec::new(),
            orders: Vec::new(),
        }
    }

    pub fn with_history(customer: Customer, notes: Vec<Note>, orders: Vec<Order>) -> Self {
        Self {
            customer,
            notes,
            orders,
        }
    }
}

// ============================================================================
// DTO
// ============================================================================

/// Создание клиента
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CustomerDto {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Частичное изменение полей клиента; отсутствующие поля не трогаются
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub stage: Option<CustomerStage>,
    #[serde(rename = "totalRevenue")]
    pub total_revenue: Option<f64>,
    pub touchpoints: Option<i64>,
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.stage.is_none()
            && self.total_revenue.is_none()
            && self.touchpoints.is_none()
    }
}

/// Запрос смены этапа
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageChangeRequest {
    pub stage: CustomerStage,
}

/// Прямое изменение выручки (только администратор)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueEditRequest {
    #[serde(rename = "totalRevenue")]
    pub total_revenue: f64,
}

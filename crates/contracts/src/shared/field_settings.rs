//! Настройки доступа к полям карточки клиента
//!
//! Какие поля видны и какие редактируются, задаёт конфигурация;
//! она явно передаётся в операции, которым нужна.

use serde::{Deserialize, Serialize};

/// Уровень доступа к полю клиента
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldAccess {
    /// Не показывается и не редактируется
    Hidden,
    /// Показывается, не редактируется
    ReadOnly,
    /// Редактирует любой пользователь
    Editable,
    /// Редактирует только администратор
    AdminOnly,
}

impl FieldAccess {
    pub fn is_visible(&self) -> bool {
        !matches!(self, FieldAccess::Hidden)
    }
}

/// Поля клиента, на которые распространяются настройки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerField {
    Name,
    Email,
    Phone,
    Stage,
    TotalRevenue,
    Touchpoints,
}

impl CustomerField {
    pub const ALL: [CustomerField; 6] = [
        CustomerField::Name,
        CustomerField::Email,
        CustomerField::Phone,
        CustomerField::Stage,
        CustomerField::TotalRevenue,
        CustomerField::Touchpoints,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerField::Name => "name",
            CustomerField::Email => "email",
            CustomerField::Phone => "phone",
            CustomerField::Stage => "stage",
            CustomerField::TotalRevenue => "total_revenue",
            CustomerField::Touchpoints => "touchpoints",
        }
    }
}

/// Доступ по полям, секция `[fields]` в config.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSettings {
    pub name: FieldAccess,
    pub email: FieldAccess,
    pub phone: FieldAccess,
    pub stage: FieldAccess,
    pub total_revenue: FieldAccess,
    pub touchpoints: FieldAccess,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            name: FieldAccess::Editable,
            email: FieldAccess::Editable,
            phone: FieldAccess::Editable,
            stage: FieldAccess::Editable,
            total_revenue: FieldAccess::AdminOnly,
            touchpoints: FieldAccess::ReadOnly,
        }
    }
}

impl FieldSettings {
    pub fn access(&self, field: CustomerField) -> FieldAccess {
        match field {
            CustomerField::Name => self.name,
            CustomerField::Email => self.email,
            CustomerField::Phone => self.phone,
            CustomerField::Stage => self.stage,
            CustomerField::TotalRevenue => self.total_revenue,
            CustomerField::Touchpoints => self.touchpoints,
        }
    }

    /// Поля для отображения, в порядке вывода
    pub fn visible_fields(&self) -> Vec<CustomerField> {
        CustomerField::ALL
            .into_iter()
            .filter(|f| self.access(*f).is_visible())
            .collect()
    }
}

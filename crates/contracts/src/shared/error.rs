use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::common::AggregateRoot;

/// Ошибки ядра CRM
///
/// Ядро никогда не повторяет операции: любая ошибка возвращается вызывающему
/// как есть, а транспортный слой переводит её в ответ.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum CrmError {
    /// Некорректный ввод: пустая заметка, неположительная сумма заказа и т.п.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Запрошенный клиент, заметка или заказ отсутствует
    #[error("Not found: {0}")]
    NotFound(String),

    /// Роли недостаточно для привилегированного изменения
    #[error("Permission denied: {0}")]
    Authorization(String),

    /// Сбой хранилища (непрозрачный)
    #[error("Storage error: {0}")]
    Storage(String),
}

pub type CrmResult<T> = Result<T, CrmError>;

impl CrmError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    /// "Customer 5f0c... not found"
    pub fn not_found<A: AggregateRoot>(id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{} {} not found", A::element_name(), id))
    }

    /// Стабильный код вида ошибки для логов и клиентов
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Authorization(_) => "authorization",
            Self::Storage(_) => "storage",
        }
    }
}

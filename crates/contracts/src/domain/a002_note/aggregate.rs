use crate::domain::a001_customer::aggregate::CustomerId;
use crate::domain::common::AggregateRoot;
use crate::shared::error::{CrmError, CrmResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// ID Type
// ============================================================================
crate::aggregate_id!(
    /// Идентификатор заметки
    NoteId
);

/// Канал контакта
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    #[default]
    Call,
    Email,
}

impl NoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteType::Call => "call",
            NoteType::Email => "email",
        }
    }

    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "call" => Some(NoteType::Call),
            "email" => Some(NoteType::Email),
            _ => None,
        }
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Заметка о контакте с клиентом. Каждая добавленная заметка - одно касание.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    #[serde(rename = "customerId")]
    pub customer_id: CustomerId,
    #[serde(rename = "type")]
    pub note_type: NoteType,
    pub content: String,
    #[serde(rename = "salesAgent", default)]
    pub sales_agent: String,
    /// Время создания, не меняется
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "isPinned", default)]
    pub is_pinned: bool,
    #[serde(rename = "isHighlighted", default)]
    pub is_highlighted: bool,
    #[serde(rename = "idempotencyKey", default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

impl Note {
    pub fn new_for_insert(customer_id: CustomerId, dto: NoteDto) -> Self {
        Self {
            id: NoteId::new_v4(),
            customer_id,
            note_type: dto.note_type,
            content: dto.content,
            sales_agent: dto.sales_agent.trim().to_string(),
            timestamp: Utc::now(),
            is_pinned: false,
            is_highlighted: false,
            idempotency_key: normalize_key(dto.idempotency_key),
        }
    }

    pub fn validate(&self) -> CrmResult<()> {
        if self.content.trim().is_empty() {
            return Err(CrmError::validation("Note content cannot be empty"));
        }
        Ok(())
    }

    pub fn apply_flags(&mut self, flags: &NoteFlagsDto) {
        if let Some(pinned) = flags.is_pinned {
            self.is_pinned = pinned;
        }
        if let Some(highlighted) = flags.is_highlighted {
            self.is_highlighted = highlighted;
        }
    }
}

impl AggregateRoot for Note {
    type Id = NoteId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn aggregate_index() -> &'static str {
        "a002"
    }

    fn collection_name() -> &'static str {
        "note"
    }

    fn element_name() -> &'static str {
        "Note"
    }
}

/// Пустой ключ идемпотентности равнозначен его отсутствию
pub(crate) fn normalize_key(key: Option<String>) -> Option<String> {
    key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
}

// ============================================================================
// DTO
// ============================================================================
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NoteDto {
    #[serde(rename = "type", default)]
    pub note_type: NoteType,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "salesAgent", default)]
    pub sales_agent: String,
    #[serde(rename = "idempotencyKey", default)]
    pub idempotency_key: Option<String>,
}

/// Изменение флагов заметки; каждый флаг независим
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NoteFlagsDto {
    #[serde(rename = "isPinned")]
    pub is_pinned: Option<bool>,
    #[serde(rename = "isHighlighted")]
    pub is_highlighted: Option<bool>,
}

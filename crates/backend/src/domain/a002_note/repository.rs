use contracts::domain::a001_customer::aggregate::CustomerId;
use contracts::domain::a002_note::aggregate::{Note, NoteId, NoteType};
use contracts::domain::common::AggregateId;
use contracts::shared::error::CrmError;
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a002_note")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub customer_id: String,
    pub note_type: String,
    pub content: String,
    pub sales_agent: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub is_pinned: bool,
    pub is_highlighted: bool,
    pub idempotency_key: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Note {
    type Error = CrmError;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        Ok(Note {
            id: NoteId::from_string(&m.id).map_err(CrmError::storage)?,
            customer_id: CustomerId::from_string(&m.customer_id).map_err(CrmError::storage)?,
            note_type: NoteType::from_code(&m.note_type).unwrap_or_default(),
            content: m.content,
            sales_agent: m.sales_agent,
            timestamp: m.timestamp,
            is_pinned: m.is_pinned,
            is_highlighted: m.is_highlighted,
            idempotency_key: m.idempotency_key,
        })
    }
}

/// Notes of one customer, oldest first
pub async fn list_by_customer<C: ConnectionTrait>(
    db: &C,
    customer_id: CustomerId,
) -> anyhow::Result<Vec<Note>> {
    let models = Entity::find()
        .filter(Column::CustomerId.eq(customer_id.as_string()))
        .order_by_asc(Column::Timestamp)
        .all(db)
        .await?;

    models
        .into_iter()
        .map(|m| Note::try_from(m).map_err(anyhow::Error::from))
        .collect()
}

pub async fn insert<C: ConnectionTrait>(db: &C, note: &Note) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(note.id.as_string()),
        customer_id: Set(note.customer_id.as_string()),
        note_type: Set(note.note_type.as_str().to_string()),
        content: Set(note.content.clone()),
        sales_agent: Set(note.sales_agent.clone()),
        timestamp: Set(note.timestamp),
        is_pinned: Set(note.is_pinned),
        is_highlighted: Set(note.is_highlighted),
        idempotency_key: Set(note.idempotency_key.clone()),
    };
    active.insert(db).await?;
    Ok(())
}

/// Only the flags are mutable after insert
pub async fn update_flags<C: ConnectionTrait>(db: &C, note: &Note) -> anyhow::Result<bool> {
    use sea_orm::sea_query::Expr;
    let result = Entity::update_many()
        .col_expr(Column::IsPinned, Expr::value(note.is_pinned))
        .col_expr(Column::IsHighlighted, Expr::value(note.is_highlighted))
        .filter(Column::Id.eq(note.id.as_string()))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn delete<C: ConnectionTrait>(db: &C, id: NoteId) -> anyhow::Result<bool> {
    let result = Entity::delete_by_id(id.as_string()).exec(db).await?;
    Ok(result.rows_affected > 0)
}

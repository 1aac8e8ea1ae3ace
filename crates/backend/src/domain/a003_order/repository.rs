use contracts::domain::a001_customer::aggregate::CustomerId;
use contracts::domain::a003_order::aggregate::{Order, OrderId};
use contracts::domain::common::AggregateId;
use contracts::shared::error::CrmError;
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a003_order")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub customer_id: String,
    pub amount: f64,
    pub description: String,
    pub date: chrono::DateTime<chrono::Utc>,
    pub idempotency_key: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Order {
    type Error = CrmError;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId::from_string(&m.id).map_err(CrmError::storage)?,
            customer_id: CustomerId::from_string(&m.customer_id).map_err(CrmError::storage)?,
            amount: m.amount,
            description: m.description,
            date: m.date,
            idempotency_key: m.idempotency_key,
        })
    }
}

pub async fn list_by_customer<C: ConnectionTrait>(
    db: &C,
    customer_id: CustomerId,
) -> anyhow::Result<Vec<Order>> {
    let models = Entity::find()
        .filter(Column::CustomerId.eq(customer_id.as_string()))
        .order_by_asc(Column::Date)
        .all(db)
        .await?;

    models
        .into_iter()
        .map(|m| Order::try_from(m).map_err(anyhow::Error::from))
        .collect()
}

pub async fn insert<C: ConnectionTrait>(db: &C, order: &Order) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(order.id.as_string()),
        customer_id: Set(order.customer_id.as_string()),
        amount: Set(order.amount),
        description: Set(order.description.clone()),
        date: Set(order.date),
        idempotency_key: Set(order.idempotency_key.clone()),
    };
    active.insert(db).await?;
    Ok(())
}

pub async fn delete<C: ConnectionTrait>(db: &C, id: OrderId) -> anyhow::Result<bool> {
    let result = Entity::delete_by_id(id.as_string()).exec(db).await?;
    Ok(result.rows_affected > 0)
}

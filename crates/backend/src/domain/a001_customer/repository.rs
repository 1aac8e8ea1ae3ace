use chrono::Utc;
use contracts::domain::a001_customer::aggregate::{Customer, CustomerId, CustomerStage};
use contracts::domain::a001_customer::lifecycle::{CounterDelta, StageShift};
use contracts::domain::common::{AggregateId, EntityMetadata};
use contracts::shared::error::CrmError;
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, DatabaseBackend, EntityTrait, QueryFilter, Set, Statement};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a001_customer")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub stage: String,
    pub total_revenue: f64,
    pub touchpoints: i64,
    pub is_deleted: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Customer {
    type Error = CrmError;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let id = CustomerId::from_string(&m.id).map_err(CrmError::storage)?;
        let stage = CustomerStage::from_code(&m.stage).ok_or_else(|| {
            CrmError::storage(format!("Unknown stage '{}' for customer {}", m.stage, m.id))
        })?;
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            is_deleted: m.is_deleted,
            version: m.version,
        };

        Ok(Customer {
            id,
            name: m.name,
            email: m.email,
            phone: m.phone,
            stage,
            total_revenue: m.total_revenue,
            touchpoints: m.touchpoints,
            metadata,
        })
    }
}

fn to_active(customer: &Customer) -> ActiveModel {
    ActiveModel {
        id: Set(customer.id.as_string()),
        name: Set(customer.name.clone()),
        email: Set(customer.email.clone()),
        phone: Set(customer.phone.clone()),
        stage: Set(customer.stage.as_str().to_string()),
        total_revenue: Set(customer.total_revenue),
        touchpoints: Set(customer.touchpoints),
        is_deleted: Set(customer.metadata.is_deleted),
        created_at: Set(Some(customer.metadata.created_at)),
        updated_at: Set(Some(customer.metadata.updated_at)),
        version: Set(customer.metadata.version),
    }
}

pub async fn list_active<C: ConnectionTrait>(db: &C) -> anyhow::Result<Vec<Customer>> {
    let models = Entity::find()
        .filter(Column::IsDeleted.eq(false))
        .all(db)
        .await?;

    let mut items = Vec::with_capacity(models.len());
    for model in models {
        match Customer::try_from(model) {
            Ok(customer) => items.push(customer),
            Err(e) => tracing::warn!("Skipping unreadable customer row: {}", e),
        }
    }
    items.sort_by_key(|c| c.name.to_lowercase());
    Ok(items)
}

pub async fn get_by_id<C: ConnectionTrait>(
    db: &C,
    id: CustomerId,
) -> anyhow::Result<Option<Customer>> {
    let model = Entity::find_by_id(id.as_string()).one(db).await?;
    Ok(model.map(Customer::try_from).transpose()?)
}

pub async fn insert<C: ConnectionTrait>(db: &C, customer: &Customer) -> anyhow::Result<()> {
    to_active(customer).insert(db).await?;
    Ok(())
}

/// Overwrite editable columns. touchpoints only moves through `increment_counters`.
pub async fn update<C: ConnectionTrait>(db: &C, customer: &Customer) -> anyhow::Result<()> {
    let mut active = to_active(customer);
    active.created_at = sea_orm::ActiveValue::NotSet;
    active.touchpoints = sea_orm::ActiveValue::NotSet;
    active.update(db).await?;
    Ok(())
}

pub async fn soft_delete<C: ConnectionTrait>(db: &C, id: CustomerId) -> anyhow::Result<bool> {
    use sea_orm::sea_query::Expr;
    let result = Entity::update_many()
        .col_expr(Column::IsDeleted, Expr::value(true))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id.as_string()))
        .filter(Column::IsDeleted.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// New stage computed from the value currently stored in the row
fn stage_expr(shift: StageShift) -> String {
    match shift {
        StageShift::Keep => "stage".to_string(),
        StageShift::EngageIfNew => format!(
            "CASE WHEN stage = '{}' THEN '{}' ELSE stage END",
            CustomerStage::New.as_str(),
            CustomerStage::Engaged.as_str()
        ),
        StageShift::Ordered => format!("'{}'", CustomerStage::Ordered.as_str()),
    }
}

/// In-place counter increment. Returns false when the customer is missing
/// or soft-deleted.
pub async fn increment_counters<C: ConnectionTrait>(
    db: &C,
    delta: &CounterDelta,
) -> anyhow::Result<bool> {
    let sql = format!(
        "UPDATE a001_customer
         SET touchpoints = touchpoints + ?,
             total_revenue = total_revenue + ?,
             stage = {},
             updated_at = ?,
             version = version + 1
         WHERE id = ? AND is_deleted = 0",
        stage_expr(delta.stage)
    );
    let result = db
        .execute(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            &sql,
            [
                delta.touchpoints.into(),
                delta.total_revenue.into(),
                Utc::now().into(),
                delta.customer_id.as_string().into(),
            ],
        ))
        .await?;
    Ok(result.rows_affected() > 0)
}

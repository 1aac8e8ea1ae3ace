use async_trait::async_trait;
use contracts::domain::a001_customer::aggregate::{Customer, CustomerId};
use contracts::domain::a001_customer::lifecycle::CounterDelta;
use contracts::domain::a002_note::aggregate::{Note, NoteId};
use contracts::domain::a003_order::aggregate::{Order, OrderId};
use contracts::shared::error::{CrmError, CrmResult};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use super::store::CrmStore;
use crate::domain::{a001_customer, a002_note, a003_order};

/// `CrmStore` over the SQLite database
#[derive(Clone)]
pub struct SqliteStore {
    conn: DatabaseConnection,
}

impl SqliteStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Private in-process database with the schema applied
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        let mut options = sea_orm::ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1).sqlx_logging(false);
        let conn = sea_orm::Database::connect(options).await.unwrap();
        crate::shared::data::db::bootstrap_schema(&conn).await.unwrap();
        Self::new(conn)
    }

    async fn begin(&self) -> CrmResult<DatabaseTransaction> {
        self.conn.begin().await.map_err(CrmError::storage)
    }
}

fn storage(e: anyhow::Error) -> CrmError {
    CrmError::storage(e)
}

/// Counter update inside an open transaction; a missing customer aborts it
async fn apply_delta(txn: &DatabaseTransaction, delta: &CounterDelta) -> CrmResult<()> {
    let updated = a001_customer::repository::increment_counters(txn, delta)
        .await
        .map_err(storage)?;
    if !updated {
        return Err(CrmError::not_found::<Customer>(delta.customer_id));
    }
    Ok(())
}

#[async_trait]
impl CrmStore for SqliteStore {
    async fn list_customers(&self) -> CrmResult<Vec<Customer>> {
        a001_customer::repository::list_active(&self.conn)
            .await
            .map_err(storage)
    }

    async fn find_customer(&self, id: CustomerId) -> CrmResult<Option<Customer>> {
        a001_customer::repository::get_by_id(&self.conn, id)
            .await
            .map_err(storage)
    }

    async fn insert_customer(&self, customer: &Customer) -> CrmResult<()> {
        a001_customer::repository::insert(&self.conn, customer)
            .await
            .map_err(storage)
    }

    async fn save_customer(&self, customer: &Customer) -> CrmResult<()> {
        a001_customer::repository::update(&self.conn, customer)
            .await
            .map_err(storage)
    }

    async fn soft_delete_customer(&self, id: CustomerId) -> CrmResult<bool> {
        a001_customer::repository::soft_delete(&self.conn, id)
            .await
            .map_err(storage)
    }

    async fn notes_of(&self, customer_id: CustomerId) -> CrmResult<Vec<Note>> {
        a002_note::repository::list_by_customer(&self.conn, customer_id)
            .await
            .map_err(storage)
    }

    async fn orders_of(&self, customer_id: CustomerId) -> CrmResult<Vec<Order>> {
        a003_order::repository::list_by_customer(&self.conn, customer_id)
            .await
            .map_err(storage)
    }

    async fn insert_note(&self, note: &Note, delta: &CounterDelta) -> CrmResult<()> {
        // Dropping the transaction without commit rolls it back
        let txn = self.begin().await?;
        a002_note::repository::insert(&txn, note)
            .await
            .map_err(storage)?;
        apply_delta(&txn, delta).await?;
        txn.commit().await.map_err(CrmError::storage)
    }

    async fn update_note_flags(&self, note: &Note) -> CrmResult<()> {
        let updated = a002_note::repository::update_flags(&self.conn, note)
            .await
            .map_err(storage)?;
        if !updated {
            return Err(CrmError::not_found::<Note>(note.id));
        }
        Ok(())
    }

    async fn delete_note(&self, id: NoteId) -> CrmResult<()> {
        let deleted = a002_note::repository::delete(&self.conn, id)
            .await
            .map_err(storage)?;
        if !deleted {
            return Err(CrmError::not_found::<Note>(id));
        }
        Ok(())
    }

    async fn insert_order(&self, order: &Order, delta: &CounterDelta) -> CrmResult<()> {
        let txn = self.begin().await?;
        a003_order::repository::insert(&txn, order)
            .await
            .map_err(storage)?;
        apply_delta(&txn, delta).await?;
        txn.commit().await.map_err(CrmError::storage)
    }

    async fn delete_order(&self, id: OrderId, delta: &CounterDelta) -> CrmResult<()> {
        let txn = self.begin().await?;
        let deleted = a003_order::repository::delete(&txn, id)
            .await
            .map_err(storage)?;
        if !deleted {
            return Err(CrmError::not_found::<Order>(id));
        }
        apply_delta(&txn, delta).await?;
        txn.commit().await.map_err(CrmError::storage)
    }
}

use async_trait::async_trait;
use contracts::domain::a001_customer::aggregate::{Customer, CustomerId};
use contracts::domain::a001_customer::lifecycle::CounterDelta;
use contracts::domain::a002_note::aggregate::{Note, NoteId};
use contracts::domain::a003_order::aggregate::{Order, OrderId};
use contracts::shared::error::CrmResult;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Persistent storage of customers, notes and orders
///
/// Writes that touch a note or an order together with the customer counters
/// are atomic: either both land or neither does. Counter changes are applied
/// as increments (`CounterDelta`), never as absolute values.
#[async_trait]
pub trait CrmStore: Send + Sync {
    /// Active (not soft-deleted) customers
    async fn list_customers(&self) -> CrmResult<Vec<Customer>>;
    async fn find_customer(&self, id: CustomerId) -> CrmResult<Option<Customer>>;
    async fn insert_customer(&self, customer: &Customer) -> CrmResult<()>;
    /// Overwrite of the editable customer columns (last write wins); touchpoints are kept
    async fn save_customer(&self, customer: &Customer) -> CrmResult<()>;
    async fn soft_delete_customer(&self, id: CustomerId) -> CrmResult<bool>;

    async fn notes_of(&self, customer_id: CustomerId) -> CrmResult<Vec<Note>>;
    async fn orders_of(&self, customer_id: CustomerId) -> CrmResult<Vec<Order>>;

    /// Insert the note and apply `delta` in one transaction
    async fn insert_note(&self, note: &Note, delta: &CounterDelta) -> CrmResult<()>;
    async fn update_note_flags(&self, note: &Note) -> CrmResult<()>;
    async fn delete_note(&self, id: NoteId) -> CrmResult<()>;

    /// Insert the order and apply `delta` in one transaction
    async fn insert_order(&self, order: &Order, delta: &CounterDelta) -> CrmResult<()>;
    /// Delete the order and apply `delta` in one transaction
    async fn delete_order(&self, id: OrderId, delta: &CounterDelta) -> CrmResult<()>;
}

static STORE: OnceCell<Arc<dyn CrmStore>> = OnceCell::new();

pub fn install_store(store: Arc<dyn CrmStore>) -> anyhow::Result<()> {
    STORE
        .set(store)
        .map_err(|_| anyhow::anyhow!("CRM store has already been installed"))
}

pub fn get_store() -> &'static dyn CrmStore {
    STORE
        .get()
        .map(|s| s.as_ref())
        .expect("CRM store has not been installed")
}

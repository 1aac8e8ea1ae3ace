//! In-memory `CrmStore` for service tests

use async_trait::async_trait;
use contracts::domain::a001_customer::aggregate::{Customer, CustomerId};
use contracts::domain::a001_customer::lifecycle::CounterDelta;
use contracts::domain::a002_note::aggregate::{Note, NoteId};
use contracts::domain::a003_order::aggregate::{Order, OrderId};
use contracts::shared::error::{CrmError, CrmResult};
use std::collections::HashMap;
use std::sync::Mutex;

use super::store::CrmStore;

#[derive(Default)]
struct Tables {
    customers: HashMap<CustomerId, Customer>,
    notes: Vec<Note>,
    orders: Vec<Order>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// When set, every write fails with a storage error
    fail_writes: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    fn check_writable(&self) -> CrmResult<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(CrmError::storage("disk I/O error"));
        }
        Ok(())
    }
}

fn apply_delta(tables: &mut Tables, delta: &CounterDelta) -> CrmResult<()> {
    let customer = tables
        .customers
        .get_mut(&delta.customer_id)
        .filter(|c| !c.metadata.is_deleted)
        .ok_or_else(|| CrmError::not_found::<Customer>(delta.customer_id))?;
    delta.apply_to(customer);
    customer.metadata.before_write();
    Ok(())
}

fn duplicate_key(kind: &str, key: &str) -> CrmError {
    CrmError::storage(format!(
        "UNIQUE constraint failed: {} idempotency key '{}'",
        kind, key
    ))
}

#[async_trait]
impl CrmStore for MemoryStore {
    async fn list_customers(&self) -> CrmResult<Vec<Customer>> {
        let tables = self.tables.lock().unwrap();
        let mut items: Vec<Customer> = tables
            .customers
            .values()
            .filter(|c| !c.metadata.is_deleted)
            .cloned()
            .collect();
        items.sort_by_key(|c| c.name.to_lowercase());
        Ok(items)
    }

    async fn find_customer(&self, id: CustomerId) -> CrmResult<Option<Customer>> {
        Ok(self.tables.lock().unwrap().customers.get(&id).cloned())
    }

    async fn insert_customer(&self, customer: &Customer) -> CrmResult<()> {
        self.check_writable()?;
        self.tables
            .lock()
            .unwrap()
            .customers
            .insert(customer.id, customer.clone());
        Ok(())
    }

    async fn save_customer(&self, customer: &Customer) -> CrmResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        match tables.customers.get_mut(&customer.id) {
            Some(existing) => {
                let touchpoints = existing.touchpoints;
                *existing = customer.clone();
                existing.touchpoints = touchpoints;
                Ok(())
            }
            None => Err(CrmError::not_found::<Customer>(customer.id)),
        }
    }

    async fn soft_delete_customer(&self, id: CustomerId) -> CrmResult<bool> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        match tables.customers.get_mut(&id) {
            Some(c) if !c.metadata.is_deleted => {
                c.metadata.is_deleted = true;
                c.metadata.touch();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn notes_of(&self, customer_id: CustomerId) -> CrmResult<Vec<Note>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .notes
            .iter()
            .filter(|n| n.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn orders_of(&self, customer_id: CustomerId) -> CrmResult<Vec<Order>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .orders
            .iter()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn insert_note(&self, note: &Note, delta: &CounterDelta) -> CrmResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        if let Some(key) = &note.idempotency_key {
            if tables.notes.iter().any(|n| {
                n.customer_id == note.customer_id && n.idempotency_key.as_ref() == Some(key)
            }) {
                return Err(duplicate_key("note", key));
            }
        }
        apply_delta(&mut tables, delta)?;
        tables.notes.push(note.clone());
        Ok(())
    }

    async fn update_note_flags(&self, note: &Note) -> CrmResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        let existing = tables
            .notes
            .iter_mut()
            .find(|n| n.id == note.id)
            .ok_or_else(|| CrmError::not_found::<Note>(note.id))?;
        existing.is_pinned = note.is_pinned;
        existing.is_highlighted = note.is_highlighted;
        Ok(())
    }

    async fn delete_note(&self, id: NoteId) -> CrmResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        let before = tables.notes.len();
        tables.notes.retain(|n| n.id != id);
        if tables.notes.len() == before {
            return Err(CrmError::not_found::<Note>(id));
        }
        Ok(())
    }

    async fn insert_order(&self, order: &Order, delta: &CounterDelta) -> CrmResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        if let Some(key) = &order.idempotency_key {
            if tables.orders.iter().any(|o| {
                o.customer_id == order.customer_id && o.idempotency_key.as_ref() == Some(key)
            }) {
                return Err(duplicate_key("order", key));
            }
        }
        apply_delta(&mut tables, delta)?;
        tables.orders.push(order.clone());
        Ok(())
    }

    async fn delete_order(&self, id: OrderId, delta: &CounterDelta) -> CrmResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.lock().unwrap();
        let position = tables
            .orders
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| CrmError::not_found::<Order>(id))?;
        apply_delta(&mut tables, delta)?;
        tables.orders.remove(position);
        Ok(())
    }
}

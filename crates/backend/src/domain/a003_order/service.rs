use contracts::domain::a001_customer::aggregate::CustomerId;
use contracts::domain::a001_customer::lifecycle::{self, CounterDelta};
use contracts::domain::a003_order::aggregate::{Order, OrderDto, OrderId};
use contracts::shared::error::{CrmError, CrmResult};

use crate::domain::a001_customer::service::load_card;
use crate::shared::data::store::CrmStore;

/// Attach an order: revenue grows by the amount, stage becomes "ordered"
pub async fn add(store: &dyn CrmStore, customer_id: CustomerId, dto: OrderDto) -> CrmResult<Order> {
    let mut card = load_card(store, customer_id).await?;

    let applied = lifecycle::apply_order(&mut card, Order::new_for_insert(customer_id, dto))?;
    let order = card
        .orders
        .iter()
        .find(|o| o.id == applied.id())
        .cloned()
        .ok_or_else(|| CrmError::not_found::<Order>(applied.id()))?;

    if applied.is_replay() {
        tracing::warn!(
            "Order for customer {} replayed with key {:?}",
            customer_id,
            order.idempotency_key
        );
        return Ok(order);
    }

    let stored = insert_or_replay(store, order.clone()).await?;
    if stored.id != order.id {
        return Ok(stored);
    }
    tracing::info!(
        "Order {} of {:.2} added to customer {} (revenue {:.2})",
        order.id,
        order.amount,
        customer_id,
        card.customer.total_revenue
    );
    Ok(order)
}

/// Insert a new order. When a concurrent request with the same idempotency key
/// committed first, the insert is rolled back and the stored order is returned.
async fn insert_or_replay(store: &dyn CrmStore, order: Order) -> CrmResult<Order> {
    let Err(e) = store
        .insert_order(&order, &CounterDelta::order_added(&order))
        .await
    else {
        return Ok(order);
    };
    let Some(key) = order.idempotency_key.as_ref() else {
        return Err(e);
    };
    match store.orders_of(order.customer_id).await {
        Ok(orders) => match orders
            .into_iter()
            .find(|o| o.idempotency_key.as_ref() == Some(key))
        {
            Some(stored) => {
                tracing::warn!(
                    "Order for customer {} replayed with key {:?} after a concurrent insert",
                    order.customer_id,
                    key
                );
                Ok(stored)
            }
            None => Err(e),
        },
        Err(_) => Err(e),
    }
}

pub async fn list(store: &dyn CrmStore, customer_id: CustomerId) -> CrmResult<Vec<Order>> {
    Ok(load_card(store, customer_id).await?.orders)
}

/// Remove an order and subtract its amount; the stage is kept
pub async fn delete(
    store: &dyn CrmStore,
    customer_id: CustomerId,
    order_id: OrderId,
) -> CrmResult<Order> {
    let mut card = load_card(store, customer_id).await?;
    let removed = lifecycle::remove_order(&mut card, order_id)?;
    let delta = CounterDelta::order_removed(&removed);
    store.delete_order(removed.id, &delta).await?;
    tracing::info!(
        "Order {} of {:.2} removed from customer {}",
        order_id,
        removed.amount,
        customer_id
    );
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a001_customer::service as customers;
    use crate::shared::data::memory_store::MemoryStore;
    use crate::shared::data::sqlite_store::SqliteStore;
    use contracts::domain::a001_customer::aggregate::{CustomerDto, CustomerStage};
    use contracts::system::auth::ActorRole;

    async fn customer(store: &MemoryStore) -> CustomerId {
        customers::create(
            store,
            CustomerDto {
                name: "Acme".into(),
                email: None,
                phone: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn order(amount: f64, key: Option<&str>) -> OrderDto {
        OrderDto {
            amount,
            description: "Licence".into(),
            idempotency_key: key.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn order_updates_revenue_and_stage() {
        let store = MemoryStore::new();
        let id = customer(&store).await;
        customers::edit_revenue(&store, id, 50.0, ActorRole::Admin, &Default::default())
            .await
            .unwrap();

        add(&store, id, order(100.0, None)).await.unwrap();

        let c = customers::get_active(&store, id).await.unwrap();
        assert_eq!(c.total_revenue, 150.0);
        assert_eq!(c.stage, CustomerStage::Ordered);
    }

    #[tokio::test]
    async fn negative_order_is_rejected_and_nothing_is_written() {
        let store = MemoryStore::new();
        let id = customer(&store).await;

        let err = add(&store, id, order(-20.0, None)).await.unwrap_err();
        assert!(matches!(err, CrmError::Validation(_)));

        let c = customers::get_active(&store, id).await.unwrap();
        assert_eq!(c.total_revenue, 0.0);
        assert_eq!(c.stage, CustomerStage::New);
        assert!(list(&store, id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_then_delete_restores_revenue_but_not_stage() {
        let store = MemoryStore::new();
        let id = customer(&store).await;
        let o = add(&store, id, order(75.5, None)).await.unwrap();

        let removed = delete(&store, id, o.id).await.unwrap();
        assert_eq!(removed.amount, 75.5);

        let c = customers::get_active(&store, id).await.unwrap();
        assert_eq!(c.total_revenue, 0.0);
        assert_eq!(c.stage, CustomerStage::Ordered);
        assert!(matches!(
            delete(&store, id, o.id).await,
            Err(CrmError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn insert_losing_a_key_race_returns_stored_order() {
        let store = MemoryStore::new();
        let id = customer(&store).await;
        let first = add(&store, id, order(40.0, Some("checkout-2"))).await.unwrap();

        // Built from a card read before `first` committed
        let late = Order::new_for_insert(id, order(40.0, Some("checkout-2")));
        let stored = insert_or_replay(&store, late).await.unwrap();

        assert_eq!(stored.id, first.id);
        assert_eq!(
            customers::get_active(&store, id).await.unwrap().total_revenue,
            40.0
        );
        assert_eq!(list(&store, id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_unkeyed_insert_is_not_turned_into_replay() {
        let store = MemoryStore::new();
        let id = customer(&store).await;
        store.fail_writes(true);

        let err = insert_or_replay(&store, Order::new_for_insert(id, order(9.0, None)))
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::Storage(_)));
    }

    #[tokio::test]
    async fn concurrent_submissions_on_sqlite_settle_on_one_order() {
        let store = SqliteStore::in_memory().await;
        let id = customers::create(
            &store,
            CustomerDto {
                name: "Initech".into(),
                email: None,
                phone: None,
            },
        )
        .await
        .unwrap()
        .id;

        let (a, b) = tokio::join!(
            add(&store, id, order(25.0, Some("double-click"))),
            add(&store, id, order(25.0, Some("double-click")))
        );
        assert_eq!(a.unwrap().id, b.unwrap().id);

        let c = customers::get_active(&store, id).await.unwrap();
        assert_eq!(c.total_revenue, 25.0);
        assert_eq!(c.stage, CustomerStage::Ordered);
        assert_eq!(list(&store, id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_note_keeps_ordered_stage_on_sqlite() {
        let store = SqliteStore::in_memory().await;
        let id = customers::create(
            &store,
            CustomerDto {
                name: "Hooli".into(),
                email: None,
                phone: None,
            },
        )
        .await
        .unwrap()
        .id;

        let note = contracts::domain::a002_note::aggregate::NoteDto {
            content: "Follow-up call".into(),
            sales_agent: "Bob".into(),
            ..Default::default()
        };
        let (o, n) = tokio::join!(
            add(&store, id, order(10.0, None)),
            crate::domain::a002_note::service::add(&store, id, note)
        );
        o.unwrap();
        n.unwrap();

        let c = customers::get_active(&store, id).await.unwrap();
        assert_eq!(c.stage, CustomerStage::Ordered);
        assert_eq!(c.total_revenue, 10.0);
        assert_eq!(c.touchpoints, 1);
    }

    #[tokio::test]
    async fn retried_order_is_counted_once() {
        let store = MemoryStore::new();
        let id = customer(&store).await;

        add(&store, id, order(40.0, Some("checkout-1"))).await.unwrap();
        add(&store, id, order(40.0, Some("checkout-1"))).await.unwrap();

        assert_eq!(
            customers::get_active(&store, id).await.unwrap().total_revenue,
            40.0
        );
        assert_eq!(list(&store, id).await.unwrap().len(), 1);
    }
}

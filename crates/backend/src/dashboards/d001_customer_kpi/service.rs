use contracts::domain::a001_customer::aggregate::CustomerCard;
use contracts::shared::error::CrmResult;
use contracts::shared::kpi::{compute_kpis, CustomerKpis, KpiFilter};

use crate::domain::a001_customer::service::load_card;
use crate::shared::data::store::CrmStore;

/// KPIs over all active customers, or over the single customer in the filter
pub async fn get_customer_kpis(store: &dyn CrmStore, filter: &KpiFilter) -> CrmResult<CustomerKpis> {
    let cards = match filter.customer_id {
        Some(id) => vec![load_card(store, id).await?],
        None => {
            let customers = store.list_customers().await?;
            let mut cards = Vec::with_capacity(customers.len());
            for customer in customers {
                let notes = store.notes_of(customer.id).await?;
                let orders = store.orders_of(customer.id).await?;
                cards.push(CustomerCard::with_history(customer, notes, orders));
            }
            cards
        }
    };

    let kpis = compute_kpis(&cards);
    tracing::debug!(
        "KPIs over {} customer(s): conversion {:.1}%, clv {:.2}",
        cards.len(),
        kpis.conversion_rate,
        kpis.clv
    );
    Ok(kpis)
}

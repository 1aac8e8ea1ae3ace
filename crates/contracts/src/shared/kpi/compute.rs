use std::collections::BTreeMap;

use super::CustomerKpis;
use crate::domain::a001_customer::aggregate::{CustomerCard, CustomerStage};

/// Деление, которое даёт 0 вместо NaN/Infinity при нулевом знаменателе
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Рассчитать показатели по переданным клиентам (только чтение)
pub fn compute_kpis(cards: &[CustomerCard]) -> CustomerKpis {
    let customer_count = cards.len() as f64;

    let mut ordered_count = 0u64;
    let mut ordered_revenue = 0.0;
    let mut total_revenue = 0.0;
    let mut total_touchpoints = 0i64;
    let mut activity: BTreeMap<String, u64> = BTreeMap::new();

    for card in cards {
        let customer = &card.customer;
        if customer.stage == CustomerStage::Ordered {
            ordered_count += 1;
            ordered_revenue += customer.total_revenue;
        }
        total_revenue += customer.total_revenue;
        total_touchpoints += customer.touchpoints;

        for note in &card.notes {
            *activity.entry(note.sales_agent.clone()).or_insert(0) += 1;
        }
    }

    let ordered = ordered_count as f64;
    let touchpoints = total_touchpoints as f64;

    CustomerKpis {
        clv: ratio(ordered_revenue, ordered),
        conversion_rate: ratio(100.0 * ordered, customer_count),
        average_touchpoints: ratio(touchpoints, customer_count),
        activity_per_sales_agent: activity,
        revenue_per_touchpoint: ratio(total_revenue, touchpoints),
    }
}

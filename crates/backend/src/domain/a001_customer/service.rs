use contracts::domain::a001_customer::aggregate::{
    Customer, CustomerCard, CustomerDto, CustomerId, CustomerPatch, CustomerStage,
};
use contracts::domain::a001_customer::lifecycle;
use contracts::shared::error::{CrmError, CrmResult};
use contracts::shared::field_settings::{CustomerField, FieldSettings};
use contracts::system::auth::ActorRole;

use crate::shared::data::store::CrmStore;

/// Load an active customer or fail with NotFound
pub async fn get_active(store: &dyn CrmStore, id: CustomerId) -> CrmResult<Customer> {
    match store.find_customer(id).await? {
        Some(c) if !c.metadata.is_deleted => Ok(c),
        _ => Err(CrmError::not_found::<Customer>(id)),
    }
}

/// Customer together with its notes and orders, as the lifecycle engine sees it
pub async fn load_card(store: &dyn CrmStore, id: CustomerId) -> CrmResult<CustomerCard> {
    let customer = get_active(store, id).await?;
    let notes = store.notes_of(id).await?;
    let orders = store.orders_of(id).await?;
    Ok(CustomerCard::with_history(customer, notes, orders))
}

pub async fn list_all(store: &dyn CrmStore) -> CrmResult<Vec<Customer>> {
    store.list_customers().await
}

pub async fn create(store: &dyn CrmStore, dto: CustomerDto) -> CrmResult<Customer> {
    let mut customer = Customer::new_for_insert(dto);
    customer.validate()?;
    customer.before_write();
    store.insert_customer(&customer).await?;
    tracing::info!("Created customer {} ({})", customer.id, customer.name);
    Ok(customer)
}

/// Edit card fields under the configured access rules
pub async fn update_fields(
    store: &dyn CrmStore,
    id: CustomerId,
    patch: &CustomerPatch,
    role: ActorRole,
    settings: &FieldSettings,
) -> CrmResult<Customer> {
    let mut customer = get_active(store, id).await?;
    lifecycle::edit_customer_fields(&mut customer, patch, role, settings)?;
    customer.before_write();
    store.save_customer(&customer).await?;
    tracing::info!("Updated customer {} fields as {}", id, role.as_str());
    Ok(customer)
}

/// Move the customer along the pipeline; the stage field setting applies here
/// the same way as in `update_fields`
pub async fn change_stage(
    store: &dyn CrmStore,
    id: CustomerId,
    target: CustomerStage,
    role: ActorRole,
    settings: &FieldSettings,
) -> CrmResult<Customer> {
    let mut customer = get_active(store, id).await?;
    let previous = match lifecycle::check_field_access(settings, CustomerField::Stage, role)
        .and_then(|_| lifecycle::request_stage_change(&mut customer, target, role))
    {
        Ok(previous) => previous,
        Err(e) => {
            tracing::warn!("Stage change for customer {} rejected: {}", id, e);
            return Err(e);
        }
    };
    if previous == target {
        return Ok(customer);
    }
    customer.before_write();
    store.save_customer(&customer).await?;
    tracing::info!(
        "Customer {} moved from '{}' to '{}' by {}",
        id,
        previous,
        target,
        role.as_str()
    );
    Ok(customer)
}

/// Manual override of total revenue (admin only, subject to the field setting)
pub async fn edit_revenue(
    store: &dyn CrmStore,
    id: CustomerId,
    value: f64,
    role: ActorRole,
    settings: &FieldSettings,
) -> CrmResult<Customer> {
    let mut customer = get_active(store, id).await?;
    let previous = customer.total_revenue;
    lifecycle::check_field_access(settings, CustomerField::TotalRevenue, role)?;
    lifecycle::edit_revenue_field(&mut customer, value, role)?;
    customer.before_write();
    store.save_customer(&customer).await?;
    tracing::warn!(
        "Total revenue of customer {} overridden: {} -> {}",
        id,
        previous,
        value
    );
    Ok(customer)
}

pub async fn delete(store: &dyn CrmStore, id: CustomerId) -> CrmResult<()> {
    if !store.soft_delete_customer(id).await? {
        return Err(CrmError::not_found::<Customer>(id));
    }
    tracing::info!("Customer {} marked as deleted", id);
    Ok(())
}

//! Движок жизненного цикла клиента
//!
//! Чистые функции: получают текущее персистентное состояние клиента
//! (`CustomerCard`) и событие, возвращают следующее состояние или ошибку.
//! Ошибка всегда означает, что карточка не изменилась.
//!
//! Правила:
//! - заметка: touchpoints + 1, этап new -> engaged;
//! - заказ: выручка + сумма, этап -> ordered безусловно (в том числе из closed lost);
//! - удаление заказа: выручка - сумма, этап не меняется;
//! - удаление заметки: touchpoints не уменьшается;
//! - шаг назад по воронке и прямая правка выручки - только администратор.

use super::aggregate::{Customer, CustomerCard, CustomerId, CustomerPatch, CustomerStage};
use crate::domain::a002_note::aggregate::{Note, NoteFlagsDto, NoteId};
use crate::domain::a003_order::aggregate::{Order, OrderId};
use crate::shared::error::{CrmError, CrmResult};
use crate::shared::field_settings::{CustomerField, FieldAccess, FieldSettings};
use crate::system::auth::ActorRole;

/// Результат добавления заметки/заказа
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied<Id> {
    /// Запись добавлена, счётчики обновлены
    Inserted(Id),
    /// Повтор с тем же ключом идемпотентности: возвращена существующая запись
    Replayed(Id),
}

impl<Id: Copy> Applied<Id> {
    pub fn id(&self) -> Id {
        match self {
            Applied::Inserted(id) | Applied::Replayed(id) => *id,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, Applied::Replayed(_))
    }
}

/// Влияние события на этап клиента
///
/// Хранилище применяет его к этапу, который лежит в базе на момент записи,
/// а не к снимку, прочитанному запросом.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageShift {
    /// Этап не меняется
    Keep,
    /// new -> engaged, остальные этапы не трогаем
    EngageIfNew,
    /// Этап -> ordered безусловно
    Ordered,
}

impl StageShift {
    pub fn apply(&self, current: CustomerStage) -> CustomerStage {
        match self {
            StageShift::Keep => current,
            StageShift::EngageIfNew if current == CustomerStage::New => CustomerStage::Engaged,
            StageShift::EngageIfNew => current,
            StageShift::Ordered => CustomerStage::Ordered,
        }
    }
}

/// Изменение счётчиков клиента, которое хранилище применяет инкрементом
/// в той же транзакции, что и запись заметки/заказа
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterDelta {
    pub customer_id: CustomerId,
    pub touchpoints: i64,
    pub total_revenue: f64,
    pub stage: StageShift,
}

impl CounterDelta {
    /// Заметка добавлена
    pub fn note_added(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            touchpoints: 1,
            total_revenue: 0.0,
            stage: StageShift::EngageIfNew,
        }
    }

    /// Заказ добавлен
    pub fn order_added(order: &Order) -> Self {
        Self {
            customer_id: order.customer_id,
            touchpoints: 0,
            total_revenue: order.amount,
            stage: StageShift::Ordered,
        }
    }

    /// Заказ удалён: этап остаётся
    pub fn order_removed(order: &Order) -> Self {
        Self {
            customer_id: order.customer_id,
            touchpoints: 0,
            total_revenue: -order.amount,
            stage: StageShift::Keep,
        }
    }

    /// Применить к клиенту (то же, что делает хранилище)
    pub fn apply_to(&self, customer: &mut Customer) {
        customer.touchpoints += self.touchpoints;
        customer.total_revenue += self.total_revenue;
        customer.stage = self.stage.apply(customer.stage);
    }
}

fn ensure_owner(card: &CustomerCard, owner: CustomerId) -> CrmResult<()> {
    if owner != card.customer.id {
        return Err(CrmError::validation(format!(
            "Record belongs to customer {}, not {}",
            owner, card.customer.id
        )));
    }
    Ok(())
}

fn same_key(existing: &Option<String>, incoming: &Option<String>) -> bool {
    matches!((existing, incoming), (Some(a), Some(b)) if a == b)
}

/// Добавить заметку
pub fn apply_note(card: &mut CustomerCard, note: Note) -> CrmResult<Applied<NoteId>> {
    note.validate()?;
    ensure_owner(card, note.customer_id)?;

    if note.idempotency_key.is_some() {
        if let Some(existing) = card
            .notes
            .iter()
            .find(|n| same_key(&n.idempotency_key, &note.idempotency_key))
        {
            return Ok(Applied::Replayed(existing.id));
        }
    }

    let customer = &mut card.customer;
    customer.touchpoints += 1;
    if customer.stage == CustomerStage::New {
        customer.stage = CustomerStage::Engaged;
    }

    let id = note.id;
    card.notes.push(note);
    Ok(Applied::Inserted(id))
}

/// Добавить заказ
pub fn apply_order(card: &mut CustomerCard, order: Order) -> CrmResult<Applied<OrderId>> {
    order.validate()?;
    ensure_owner(card, order.customer_id)?;

    if order.idempotency_key.is_some() {
        if let Some(existing) = card
            .orders
            .iter()
            .find(|o| same_key(&o.idempotency_key, &order.idempotency_key))
        {
            return Ok(Applied::Replayed(existing.id));
        }
    }

    let customer = &mut card.customer;
    customer.total_revenue += order.amount;
    customer.stage = CustomerStage::Ordered;

    let id = order.id;
    card.orders.push(order);
    Ok(Applied::Inserted(id))
}

/// Удалить заказ; возвращает удалённый заказ
pub fn remove_order(card: &mut CustomerCard, order_id: OrderId) -> CrmResult<Order> {
    let position = card
        .orders
        .iter()
        .position(|o| o.id == order_id)
        .ok_or_else(|| CrmError::not_found::<Order>(order_id))?;

    let order = card.orders.remove(position);
    card.customer.total_revenue -= order.amount;
    Ok(order)
}

/// Удалить заметку; touchpoints остаётся прежним
pub fn remove_note(card: &mut CustomerCard, note_id: NoteId) -> CrmResult<Note> {
    let position = card
        .notes
        .iter()
        .position(|n| n.id == note_id)
        .ok_or_else(|| CrmError::not_found::<Note>(note_id))?;

    Ok(card.notes.remove(position))
}

/// Изменить флаги заметки; возвращает заметку после изменения
pub fn set_note_flags(
    card: &mut CustomerCard,
    note_id: NoteId,
    flags: &NoteFlagsDto,
) -> CrmResult<Note> {
    let note = card
        .notes
        .iter_mut()
        .find(|n| n.id == note_id)
        .ok_or_else(|| CrmError::not_found::<Note>(note_id))?;

    note.apply_flags(flags);
    Ok(note.clone())
}

/// Запрос смены этапа
///
/// Движение вперёд (или на тот же этап) применяется сразу. Движение назад
/// разрешено только администратору; это единственная проверка, отдельного
/// подтверждения паролем нет. Возвращает предыдущий этап.
pub fn request_stage_change(
    customer: &mut Customer,
    target: CustomerStage,
    role: ActorRole,
) -> CrmResult<CustomerStage> {
    let previous = customer.stage;
    if previous.is_backward_to(target) && !role.is_admin() {
        return Err(CrmError::authorization(format!(
            "Moving a customer back from '{}' to '{}' requires admin role",
            previous, target
        )));
    }
    customer.stage = target;
    Ok(previous)
}

/// Прямая правка выручки, только администратор
pub fn edit_revenue_field(customer: &mut Customer, value: f64, role: ActorRole) -> CrmResult<()> {
    if !role.is_admin() {
        return Err(CrmError::authorization(
            "Editing total revenue requires admin role",
        ));
    }
    if !value.is_finite() {
        return Err(CrmError::validation("Total revenue must be a finite number"));
    }
    customer.total_revenue = value;
    Ok(())
}

/// Проверка настройки доступа к полю для роли
pub fn check_field_access(
    settings: &FieldSettings,
    field: CustomerField,
    role: ActorRole,
) -> CrmResult<()> {
    match settings.access(field) {
        FieldAccess::Editable => Ok(()),
        FieldAccess::AdminOnly if role.is_admin() => Ok(()),
        FieldAccess::AdminOnly => Err(CrmError::authorization(format!(
            "Field '{}' can be edited by admins only",
            field.as_str()
        ))),
        FieldAccess::Hidden | FieldAccess::ReadOnly => Err(CrmError::validation(format!(
            "Field '{}' is not editable",
            field.as_str()
        ))),
    }
}

/// Правка полей карточки клиента
///
/// Все проверки выполняются на копии: при ошибке клиент не меняется.
/// touchpoints не редактируется никогда, этап идёт через
/// `request_stage_change`, выручка через `edit_revenue_field`.
pub fn edit_customer_fields(
    customer: &mut Customer,
    patch: &CustomerPatch,
    role: ActorRole,
    settings: &FieldSettings,
) -> CrmResult<()> {
    if patch.is_empty() {
        return Err(CrmError::validation("Nothing to update"));
    }
    if patch.touchpoints.is_some() {
        return Err(CrmError::validation(
            "Touchpoints are derived from notes and cannot be edited",
        ));
    }

    let mut next = customer.clone();

    if let Some(name) = &patch.name {
        check_field_access(settings, CustomerField::Name, role)?;
        next.name = name.trim().to_string();
    }
    if let Some(email) = &patch.email {
        check_field_access(settings, CustomerField::Email, role)?;
        next.email = email.trim().to_string();
    }
    if let Some(phone) = &patch.phone {
        check_field_access(settings, CustomerField::Phone, role)?;
        next.phone = phone.trim().to_string();
    }
    if let Some(stage) = patch.stage {
        check_field_access(settings, CustomerField::Stage, role)?;
        request_stage_change(&mut next, stage, role)?;
    }
    if let Some(revenue) = patch.total_revenue {
        check_field_access(settings, CustomerField::TotalRevenue, role)?;
        edit_revenue_field(&mut next, revenue, role)?;
    }

    next.validate()?;
    *customer = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a001_customer::aggregate::CustomerDto;
    use crate::domain::a002_note::aggregate::{NoteDto, NoteType};
    use crate::domain::a003_order::aggregate::OrderDto;

    fn card() -> CustomerCard {
        CustomerCard::new(Customer::new_for_insert(CustomerDto {
            name: "Acme".into(),
            email: Some("ops@acme.test".into()),
            phone: Some("+1 555 0100".into()),
        }))
    }

    fn note_for(card: &CustomerCard, agent: &str) -> Note {
        Note::new_for_insert(
            card.customer.id,
            NoteDto {
                note_type: NoteType::Call,
                content: "Discussed renewal".into(),
                sales_agent: agent.into(),
                idempotency_key: None,
            },
        )
    }

    fn order_for(card: &CustomerCard, amount: f64) -> Order {
        Order::new_for_insert(
            card.customer.id,
            OrderDto {
                amount,
                description: "Licence".into(),
                idempotency_key: None,
            },
        )
    }

    #[test]
    fn note_counts_touchpoint_and_engages_new_customer() {
        let mut c = card();
        let note = note_for(&c, "Ann");
        let applied = apply_note(&mut c, note).unwrap();

        assert!(!applied.is_replay());
        assert_eq!(c.customer.touchpoints, 1);
        assert_eq!(c.customer.stage, CustomerStage::Engaged);
        assert_eq!(c.notes.len(), 1);
        assert_eq!(c.notes[0].id, applied.id());
    }

    #[test]
    fn n_notes_add_n_touchpoints() {
        let mut c = card();
        c.customer.touchpoints = 7;
        for _ in 0..5 {
            let note = note_for(&c, "Bob");
            apply_note(&mut c, note).unwrap();
        }
        assert_eq!(c.customer.touchpoints, 12);
    }

    #[test]
    fn note_does_not_move_later_stages() {
        let mut c = card();
        c.customer.stage = CustomerStage::ClosedLost;
        let note = note_for(&c, "Ann");
        apply_note(&mut c, note).unwrap();
        assert_eq!(c.customer.stage, CustomerStage::ClosedLost);
    }

    #[test]
    fn empty_note_is_rejected_without_side_effects() {
        let mut c = card();
        let mut note = note_for(&c, "Ann");
        note.content = "   ".into();

        let err = apply_note(&mut c, note).unwrap_err();
        assert!(matches!(err, CrmError::Validation(_)));
        assert_eq!(c.customer.touchpoints, 0);
        assert_eq!(c.customer.stage, CustomerStage::New);
        assert!(c.notes.is_empty());
    }

    #[test]
    fn note_for_another_customer_is_rejected() {
        let mut c = card();
        let other = card();
        let note = note_for(&other, "Ann");
        assert!(matches!(
            apply_note(&mut c, note),
            Err(CrmError::Validation(_))
        ));
    }

    #[test]
    fn replayed_note_key_keeps_counters() {
        let mut c = card();
        let mut first = note_for(&c, "Ann");
        first.idempotency_key = Some("req-1".into());
        let mut retry = note_for(&c, "Ann");
        retry.idempotency_key = Some("req-1".into());

        let inserted = apply_note(&mut c, first).unwrap();
        let replayed = apply_note(&mut c, retry).unwrap();

        assert!(replayed.is_replay());
        assert_eq!(replayed.id(), inserted.id());
        assert_eq!(c.customer.touchpoints, 1);
        assert_eq!(c.notes.len(), 1);
    }

    #[test]
    fn order_adds_revenue_and_sets_ordered() {
        let mut c = card();
        c.customer.total_revenue = 50.0;
        let order = order_for(&c, 100.0);
        apply_order(&mut c, order).unwrap();

        assert_eq!(c.customer.total_revenue, 150.0);
        assert_eq!(c.customer.stage, CustomerStage::Ordered);
        assert_eq!(c.orders.len(), 1);
    }

    #[test]
    fn order_reopens_closed_lost_customer() {
        let mut c = card();
        c.customer.stage = CustomerStage::ClosedLost;
        let order = order_for(&c, 10.0);
        apply_order(&mut c, order).unwrap();
        assert_eq!(c.customer.stage, CustomerStage::Ordered);
    }

    #[test]
    fn non_positive_order_is_rejected() {
        let mut c = card();
        for amount in [0.0, -20.0] {
            let order = order_for(&c, amount);
            assert!(matches!(
                apply_order(&mut c, order),
                Err(CrmError::Validation(_))
            ));
        }
        assert_eq!(c.customer.total_revenue, 0.0);
        assert_eq!(c.customer.stage, CustomerStage::New);
        assert!(c.orders.is_empty());
    }

    #[test]
    fn replayed_order_key_keeps_revenue() {
        let mut c = card();
        let mut first = order_for(&c, 40.0);
        first.idempotency_key = Some("checkout-9".into());
        let mut retry = order_for(&c, 40.0);
        retry.idempotency_key = Some("checkout-9".into());

        apply_order(&mut c, first).unwrap();
        let replayed = apply_order(&mut c, retry).unwrap();

        assert!(replayed.is_replay());
        assert_eq!(c.customer.total_revenue, 40.0);
        assert_eq!(c.orders.len(), 1);
    }

    #[test]
    fn orders_without_keys_are_independent() {
        let mut c = card();
        let a = order_for(&c, 5.0);
        let b = order_for(&c, 5.0);
        apply_order(&mut c, a).unwrap();
        apply_order(&mut c, b).unwrap();
        assert_eq!(c.customer.total_revenue, 10.0);
    }

    #[test]
    fn remove_order_round_trips_revenue() {
        let mut c = card();
        c.customer.total_revenue = 25.0;
        let order = order_for(&c, 100.0);
        let id = apply_order(&mut c, order).unwrap().id();

        let removed = remove_order(&mut c, id).unwrap();
        assert_eq!(removed.amount, 100.0);
        assert_eq!(c.customer.total_revenue, 25.0);
        assert_eq!(c.customer.stage, CustomerStage::Ordered);
        assert!(c.orders.is_empty());
    }

    #[test]
    fn remove_unknown_order_is_not_found() {
        let mut c = card();
        let err = remove_order(&mut c, OrderId::new_v4()).unwrap_err();
        assert!(matches!(err, CrmError::NotFound(_)));
    }

    #[test]
    fn remove_note_keeps_touchpoints() {
        let mut c = card();
        let note = note_for(&c, "Ann");
        let id = apply_note(&mut c, note).unwrap().id();

        remove_note(&mut c, id).unwrap();
        assert!(c.notes.is_empty());
        assert_eq!(c.customer.touchpoints, 1);
        assert!(matches!(
            remove_note(&mut c, id),
            Err(CrmError::NotFound(_))
        ));
    }

    #[test]
    fn note_flags_are_set_on_owned_note_only() {
        let mut c = card();
        let note = note_for(&c, "Ann");
        let id = apply_note(&mut c, note).unwrap().id();

        let flags = NoteFlagsDto {
            is_pinned: Some(true),
            is_highlighted: None,
        };
        let updated = set_note_flags(&mut c, id, &flags).unwrap();
        assert!(updated.is_pinned);
        assert!(c.notes[0].is_pinned);

        let foreign = NoteId::new_v4();
        assert!(matches!(
            set_note_flags(&mut c, foreign, &flags),
            Err(CrmError::NotFound(_))
        ));
    }

    #[test]
    fn forward_stage_change_is_open_to_users() {
        let mut c = card();
        let previous =
            request_stage_change(&mut c.customer, CustomerStage::ClosedLost, ActorRole::User)
                .unwrap();
        assert_eq!(previous, CustomerStage::New);
        assert_eq!(c.customer.stage, CustomerStage::ClosedLost);

        request_stage_change(&mut c.customer, CustomerStage::ClosedLost, ActorRole::User)
            .unwrap();
    }

    #[test]
    fn backward_stage_change_requires_admin() {
        let mut c = card();
        c.customer.stage = CustomerStage::Ordered;

        let err = request_stage_change(&mut c.customer, CustomerStage::Engaged, ActorRole::User)
            .unwrap_err();
        assert!(matches!(err, CrmError::Authorization(_)));
        assert_eq!(c.customer.stage, CustomerStage::Ordered);

        request_stage_change(&mut c.customer, CustomerStage::New, ActorRole::Admin).unwrap();
        assert_eq!(c.customer.stage, CustomerStage::New);
    }

    #[test]
    fn revenue_override_is_admin_only() {
        let mut c = card();
        let err = edit_revenue_field(&mut c.customer, 999.0, ActorRole::User).unwrap_err();
        assert!(matches!(err, CrmError::Authorization(_)));
        assert_eq!(c.customer.total_revenue, 0.0);

        edit_revenue_field(&mut c.customer, 999.0, ActorRole::Admin).unwrap();
        assert_eq!(c.customer.total_revenue, 999.0);

        assert!(matches!(
            edit_revenue_field(&mut c.customer, f64::NAN, ActorRole::Admin),
            Err(CrmError::Validation(_))
        ));
    }

    #[test]
    fn field_edit_respects_settings() {
        let mut c = card();
        let settings = FieldSettings::default();

        let patch = CustomerPatch {
            phone: Some(" +1 555 0199 ".into()),
            ..Default::default()
        };
        edit_customer_fields(&mut c.customer, &patch, ActorRole::User, &settings).unwrap();
        assert_eq!(c.customer.phone, "+1 555 0199");

        let revenue = CustomerPatch {
            total_revenue: Some(10.0),
            ..Default::default()
        };
        assert!(matches!(
            edit_customer_fields(&mut c.customer, &revenue, ActorRole::User, &settings),
            Err(CrmError::Authorization(_))
        ));

        let read_only = FieldSettings {
            email: FieldAccess::ReadOnly,
            ..FieldSettings::default()
        };
        let email = CustomerPatch {
            email: Some("new@acme.test".into()),
            ..Default::default()
        };
        assert!(matches!(
            edit_customer_fields(&mut c.customer, &email, ActorRole::Admin, &read_only),
            Err(CrmError::Validation(_))
        ));
    }

    #[test]
    fn failed_field_edit_changes_nothing() {
        let mut c = card();
        c.customer.stage = CustomerStage::Ordered;
        let before = c.customer.clone();

        let patch = CustomerPatch {
            name: Some("Renamed".into()),
            stage: Some(CustomerStage::New),
            ..Default::default()
        };
        let err = edit_customer_fields(
            &mut c.customer,
            &patch,
            ActorRole::User,
            &FieldSettings::default(),
        )
        .unwrap_err();

        assert!(matches!(err, CrmError::Authorization(_)));
        assert_eq!(c.customer, before);
    }

    #[test]
    fn touchpoints_and_empty_patches_are_rejected() {
        let mut c = card();
        let settings = FieldSettings::default();
        let touch = CustomerPatch {
            touchpoints: Some(3),
            ..Default::default()
        };
        assert!(matches!(
            edit_customer_fields(&mut c.customer, &touch, ActorRole::Admin, &settings),
            Err(CrmError::Validation(_))
        ));
        assert!(matches!(
            edit_customer_fields(
                &mut c.customer,
                &CustomerPatch::default(),
                ActorRole::Admin,
                &settings
            ),
            Err(CrmError::Validation(_))
        ));
    }

    #[test]
    fn blank_name_patch_is_rejected() {
        let mut c = card();
        let patch = CustomerPatch {
            name: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            edit_customer_fields(
                &mut c.customer,
                &patch,
                ActorRole::Admin,
                &FieldSettings::default()
            ),
            Err(CrmError::Validation(_))
        ));
        assert_eq!(c.customer.name, "Acme");
    }

    #[test]
    fn counter_deltas_match_engine_transitions() {
        let mut c = card();
        let mut replayed = c.customer.clone();

        let note = note_for(&c, "Ann");
        apply_note(&mut c, note).unwrap();
        CounterDelta::note_added(c.customer.id).apply_to(&mut replayed);
        assert_eq!(replayed.touchpoints, c.customer.touchpoints);
        assert_eq!(replayed.stage, c.customer.stage);

        let order = order_for(&c, 30.0);
        apply_order(&mut c, order.clone()).unwrap();
        CounterDelta::order_added(&order).apply_to(&mut replayed);
        assert_eq!(replayed.total_revenue, 30.0);
        assert_eq!(replayed.stage, CustomerStage::Ordered);

        let removed = remove_order(&mut c, order.id).unwrap();
        CounterDelta::order_removed(&removed).apply_to(&mut replayed);
        assert_eq!(replayed.total_revenue, c.customer.total_revenue);
        assert_eq!(replayed.stage, c.customer.stage);
    }

    #[test]
    fn stage_shift_never_moves_a_committed_order_back() {
        // Заметка, посчитанная по снимку "new", не должна перетереть "ordered"
        assert_eq!(
            StageShift::EngageIfNew.apply(CustomerStage::Ordered),
            CustomerStage::Ordered
        );
        assert_eq!(
            StageShift::EngageIfNew.apply(CustomerStage::ClosedLost),
            CustomerStage::ClosedLost
        );
        assert_eq!(
            StageShift::EngageIfNew.apply(CustomerStage::New),
            CustomerStage::Engaged
        );
        assert_eq!(
            StageShift::Ordered.apply(CustomerStage::ClosedLost),
            CustomerStage::Ordered
        );
        assert_eq!(StageShift::Keep.apply(CustomerStage::Engaged), CustomerStage::Engaged);
    }
}

use contracts::domain::a001_customer::aggregate::CustomerId;
use contracts::domain::a001_customer::lifecycle::{self, CounterDelta};
use contracts::domain::a002_note::aggregate::{Note, NoteDto, NoteFlagsDto, NoteId};
use contracts::shared::error::{CrmError, CrmResult};

use crate::domain::a001_customer::service::load_card;
use crate::shared::data::store::CrmStore;

/// Record a contact with the customer
///
/// Counts one touchpoint and moves a "new" customer to "engaged". A retry with
/// an already used idempotency key returns the stored note and writes nothing.
pub async fn add(store: &dyn CrmStore, customer_id: CustomerId, dto: NoteDto) -> CrmResult<Note> {
    let mut card = load_card(store, customer_id).await?;

    let applied = lifecycle::apply_note(&mut card, Note::new_for_insert(customer_id, dto))?;
    let note = card
        .notes
        .iter()
        .find(|n| n.id == applied.id())
        .cloned()
        .ok_or_else(|| CrmError::not_found::<Note>(applied.id()))?;

    if applied.is_replay() {
        tracing::warn!(
            "Note for customer {} replayed with key {:?}",
            customer_id,
            note.idempotency_key
        );
        return Ok(note);
    }

    let stored = insert_or_replay(store, note.clone()).await?;
    if stored.id != note.id {
        return Ok(stored);
    }
    tracing::info!(
        "Note {} added to customer {} by '{}' (touchpoints {})",
        note.id,
        customer_id,
        note.sales_agent,
        card.customer.touchpoints
    );
    Ok(note)
}

/// Insert a new note. When a concurrent request with the same idempotency key
/// committed first, the insert is rolled back and the stored note is returned.
async fn insert_or_replay(store: &dyn CrmStore, note: Note) -> CrmResult<Note> {
    let Err(e) = store
        .insert_note(&note, &CounterDelta::note_added(note.customer_id))
        .await
    else {
        return Ok(note);
    };
    let Some(key) = note.idempotency_key.as_ref() else {
        return Err(e);
    };
    match store.notes_of(note.customer_id).await {
        Ok(notes) => match notes
            .into_iter()
            .find(|n| n.idempotency_key.as_ref() == Some(key))
        {
            Some(stored) => {
                tracing::warn!(
                    "Note for customer {} replayed with key {:?} after a concurrent insert",
                    note.customer_id,
                    key
                );
                Ok(stored)
            }
            None => Err(e),
        },
        Err(_) => Err(e),
    }
}

pub async fn list(store: &dyn CrmStore, customer_id: CustomerId) -> CrmResult<Vec<Note>> {
    Ok(load_card(store, customer_id).await?.notes)
}

/// Pin or highlight a note; counters are untouched
pub async fn set_flags(
    store: &dyn CrmStore,
    customer_id: CustomerId,
    note_id: NoteId,
    flags: &NoteFlagsDto,
) -> CrmResult<Note> {
    let mut card = load_card(store, customer_id).await?;
    let note = lifecycle::set_note_flags(&mut card, note_id, flags)?;
    store.update_note_flags(&note).await?;
    Ok(note)
}

/// Remove a note. The touchpoint it produced stays counted.
pub async fn delete(store: &dyn CrmStore, customer_id: CustomerId, note_id: NoteId) -> CrmResult<()> {
    let mut card = load_card(store, customer_id).await?;
    let removed = lifecycle::remove_note(&mut card, note_id)?;
    store.delete_note(removed.id).await?;
    tracing::info!("Note {} removed from customer {}", note_id, customer_id);
    Ok(())
}

//! Item-level appliers: sub-status, removal, quantity

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, ItemRemoval, OrderEvent, OrderSnapshot};

/// ItemStatusChanged applier
pub struct ItemStatusChangedApplier;

impl EventApplier for ItemStatusChangedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::ItemStatusChanged { item_id, to, .. } = &event.payload {
            if let Some(item) = snapshot.find_item_mut(*item_id) {
                item.status = *to;
            }
            super::touch(snapshot, event);
        }
    }
}

/// ItemRemoved applier
///
/// Marks the line removed; the row and its quantity stay for audit.
pub struct ItemRemovedApplier;

impl EventApplier for ItemRemovedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::ItemRemoved { item_id, reason, .. } = &event.payload {
            if let Some(item) = snapshot.find_item_mut(*item_id) {
                item.removal = Some(ItemRemoval {
                    removed_by: event.actor.label(),
                    removed_at: event.timestamp,
                    reason: reason.clone(),
                });
            }
            snapshot.recalculate_total();
            super::touch(snapshot, event);
        }
    }
}

/// ItemQuantityAdjusted applier
pub struct ItemQuantityAdjustedApplier;

impl EventApplier for ItemQuantityAdjustedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::ItemQuantityAdjusted { item_id, to, .. } = &event.payload {
            if let Some(item) = snapshot.find_item_mut(*item_id)
                && !item.is_removed()
            {
                item.quantity = *to;
            }
            snapshot.recalculate_total();
            super::touch(snapshot, event);
        }
    }
}

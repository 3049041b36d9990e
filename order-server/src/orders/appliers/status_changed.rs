//! Order status appliers

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderStatus};

/// StatusChanged applier
pub struct StatusChangedApplier;

impl EventApplier for StatusChangedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::StatusChanged { to, .. } = &event.payload {
            snapshot.status = *to;
            super::touch(snapshot, event);
        }
    }
}

/// OrderCancelled applier
pub struct OrderCancelledApplier;

impl EventApplier for OrderCancelledApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::OrderCancelled { reason, .. } = &event.payload {
            snapshot.status = OrderStatus::Cancelled;
            snapshot.cancel_reason = reason.clone();
            super::touch(snapshot, event);
        }
    }
}

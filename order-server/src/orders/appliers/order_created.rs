//! OrderCreated event applier
//!
//! Initializes a snapshot from the first submission at a table.

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderStatus};

/// OrderCreated applier
pub struct OrderCreatedApplier;

impl EventApplier for OrderCreatedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::OrderCreated {
            table_id,
            session_token,
            items,
            notes,
        } = &event.payload
        {
            // Identity comes from the event (replay scenarios)
            snapshot.order_id = event.order_id;
            snapshot.tenant_id = event.tenant_id.clone();
            snapshot.table_id = *table_id;
            snapshot.session_token = session_token.clone();
            snapshot.status = OrderStatus::Pending;
            snapshot.items = items.clone();
            snapshot.notes = notes.clone();
            snapshot.created_at = event.timestamp;
            snapshot.recalculate_total();
            super::touch(snapshot, event);
        }
    }
}

//! Event applier implementations
//!
//! Each applier implements the `EventApplier` trait and handles
//! one specific event type. Appliers are PURE functions.

use enum_dispatch::enum_dispatch;

use super::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

mod item_changes;
mod items_merged;
mod order_created;
mod payment;
mod status_changed;

pub use item_changes::{ItemQuantityAdjustedApplier, ItemRemovedApplier, ItemStatusChangedApplier};
pub use items_merged::ItemsMergedApplier;
pub use order_created::OrderCreatedApplier;
pub use payment::{OrderPaidApplier, PaymentAbandonedApplier, PaymentStartedApplier};
pub use status_changed::{OrderCancelledApplier, StatusChangedApplier};

/// EventAction enum - dispatches to concrete applier implementations
#[enum_dispatch(EventApplier)]
pub enum EventAction {
    OrderCreated(OrderCreatedApplier),
    ItemsMerged(ItemsMergedApplier),
    StatusChanged(StatusChangedApplier),
    OrderCancelled(OrderCancelledApplier),
    ItemStatusChanged(ItemStatusChangedApplier),
    ItemRemoved(ItemRemovedApplier),
    ItemQuantityAdjusted(ItemQuantityAdjustedApplier),
    PaymentStarted(PaymentStartedApplier),
    PaymentAbandoned(PaymentAbandonedApplier),
    OrderPaid(OrderPaidApplier),
}

/// Convert OrderEvent reference to EventAction
///
/// This is the ONLY place with a match on EventPayload for applying.
impl From<&OrderEvent> for EventAction {
    fn from(event: &OrderEvent) -> Self {
        match &event.payload {
            EventPayload::OrderCreated { .. } => EventAction::OrderCreated(OrderCreatedApplier),
            EventPayload::ItemsMerged { .. } => EventAction::ItemsMerged(ItemsMergedApplier),
            EventPayload::StatusChanged { .. } => EventAction::StatusChanged(StatusChangedApplier),
            EventPayload::OrderCancelled { .. } => {
                EventAction::OrderCancelled(OrderCancelledApplier)
            }
            EventPayload::ItemStatusChanged { .. } => {
                EventAction::ItemStatusChanged(ItemStatusChangedApplier)
            }
            EventPayload::ItemRemoved { .. } => EventAction::ItemRemoved(ItemRemovedApplier),
            EventPayload::ItemQuantityAdjusted { .. } => {
                EventAction::ItemQuantityAdjusted(ItemQuantityAdjustedApplier)
            }
            EventPayload::PaymentStarted { .. } => {
                EventAction::PaymentStarted(PaymentStartedApplier)
            }
            EventPayload::PaymentAbandoned { .. } => {
                EventAction::PaymentAbandoned(PaymentAbandonedApplier)
            }
            EventPayload::OrderPaid { .. } => EventAction::OrderPaid(OrderPaidApplier),
        }
    }
}

/// Common bookkeeping after an event changed the snapshot
pub(crate) fn touch(snapshot: &mut OrderSnapshot, event: &OrderEvent) {
    snapshot.last_sequence = event.sequence;
    snapshot.updated_at = event.timestamp;
}

/// Rebuild a snapshot by replaying an event stream from scratch
pub fn replay(events: &[OrderEvent]) -> Option<OrderSnapshot> {
    let first = events.first()?;
    let EventPayload::OrderCreated { table_id, session_token, .. } = &first.payload else {
        return None;
    };
    let mut snapshot = OrderSnapshot::new(
        first.order_id,
        first.tenant_id.clone(),
        *table_id,
        session_token.clone(),
    );
    for event in events {
        let applier: EventAction = event.into();
        applier.apply(&mut snapshot, event);
    }
    Some(snapshot)
}

#[cfg(test)]
pub(crate) mod test_support {
    use shared::order::{Actor, EventPayload, ItemStatus, OrderEvent, OrderItem};

    pub fn event(seq: u64, order_id: i64, payload: EventPayload) -> OrderEvent {
        OrderEvent::new(
            seq,
            order_id,
            "tenant-1".to_string(),
            Actor::Staff {
                user_id: "u1".to_string(),
            },
            format!("cmd-{}", seq),
            Some(1234567890),
            payload,
        )
    }

    pub fn item(id: i64, product_id: i64, price: i64, qty: i32) -> OrderItem {
        OrderItem {
            id,
            product_id,
            name: format!("Product {}", product_id),
            unit_price: price,
            quantity: qty,
            status: ItemStatus::Pending,
            note: None,
            removal: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{event, item};
    use super::*;
    use shared::order::{OrderStatus, ItemIncrement};

    #[test]
    fn test_replay_matches_incremental_state() {
        let events = vec![
            event(
                1,
                5,
                EventPayload::OrderCreated {
                    table_id: 2,
                    session_token: "s".to_string(),
                    items: vec![item(1, 10, 1000, 1)],
                    notes: None,
                },
            ),
            event(
                2,
                5,
                EventPayload::StatusChanged {
                    from: OrderStatus::Pending,
                    to: OrderStatus::Preparing,
                },
            ),
            event(
                3,
                5,
                EventPayload::ItemsMerged {
                    increments: vec![ItemIncrement { item_id: 1, added: 1 }],
                    added: vec![item(2, 11, 300, 1)],
                    notes: None,
                },
            ),
        ];

        let snapshot = replay(&events).unwrap();
        assert_eq!(snapshot.order_id, 5);
        assert_eq!(snapshot.status, OrderStatus::Preparing);
        assert_eq!(snapshot.total, 2300);
        assert_eq!(snapshot.last_sequence, 3);
    }

    #[test]
    fn test_replay_requires_creation_event() {
        let events = vec![event(
            1,
            5,
            EventPayload::PaymentAbandoned {
                intent_id: "pi".to_string(),
            },
        )];
        assert!(replay(&events).is_none());
    }
}

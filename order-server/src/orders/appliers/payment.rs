//! Payment appliers

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, PaymentInfo, PendingPayment};

/// PaymentStarted applier - records the unresolved intent
pub struct PaymentStartedApplier;

impl EventApplier for PaymentStartedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::PaymentStarted { intent_id, amount } = &event.payload {
            snapshot.pending_payment = Some(PendingPayment {
                intent_id: intent_id.clone(),
                amount: *amount,
                started_at: event.timestamp,
            });
            super::touch(snapshot, event);
        }
    }
}

/// PaymentAbandoned applier
pub struct PaymentAbandonedApplier;

impl EventApplier for PaymentAbandonedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::PaymentAbandoned { intent_id } = &event.payload {
            if snapshot
                .pending_payment
                .as_ref()
                .is_some_and(|p| &p.intent_id == intent_id)
            {
                snapshot.pending_payment = None;
            }
            super::touch(snapshot, event);
        }
    }
}

/// OrderPaid applier - sets the paid marker, leaves preparation status alone
pub struct OrderPaidApplier;

impl EventApplier for OrderPaidApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::OrderPaid {
            method,
            amount,
            intent_id,
        } = &event.payload
        {
            snapshot.payment = Some(PaymentInfo {
                method: method.clone(),
                paid_at: event.timestamp,
                amount: *amount,
                intent_id: intent_id.clone(),
            });
            snapshot.pending_payment = None;
            super::touch(snapshot, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::appliers::test_support::event;
    use shared::order::OrderStatus;

    #[test]
    fn test_paid_keeps_preparation_status() {
        let mut snapshot = OrderSnapshot::new(1, "tenant-1".to_string(), 1, "s".to_string());
        snapshot.status = OrderStatus::Preparing;

        PaymentStartedApplier.apply(
            &mut snapshot,
            &event(
                2,
                1,
                EventPayload::PaymentStarted {
                    intent_id: "pi_1".to_string(),
                    amount: 2300,
                },
            ),
        );
        assert_eq!(snapshot.pending_payment.as_ref().unwrap().amount, 2300);

        let paid = event(
            3,
            1,
            EventPayload::OrderPaid {
                method: "card".to_string(),
                amount: 2300,
                intent_id: Some("pi_1".to_string()),
            },
        );
        OrderPaidApplier.apply(&mut snapshot, &paid);

        assert_eq!(snapshot.status, OrderStatus::Preparing);
        assert!(snapshot.pending_payment.is_none());
        let payment = snapshot.payment.as_ref().unwrap();
        assert_eq!(payment.paid_at, paid.timestamp);
        assert_eq!(payment.intent_id.as_deref(), Some("pi_1"));
    }

    #[test]
    fn test_abandon_ignores_other_intent() {
        let mut snapshot = OrderSnapshot::new(1, "tenant-1".to_string(), 1, "s".to_string());
        snapshot.pending_payment = Some(PendingPayment {
            intent_id: "pi_new".to_string(),
            amount: 100,
            started_at: 0,
        });
        PaymentAbandonedApplier.apply(
            &mut snapshot,
            &event(
                2,
                1,
                EventPayload::PaymentAbandoned {
                    intent_id: "pi_old".to_string(),
                },
            ),
        );
        assert!(snapshot.pending_payment.is_some());
    }
}

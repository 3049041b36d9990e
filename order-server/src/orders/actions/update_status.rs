//! UpdateStatus command handler
//!
//! Staff-driven move along the preparation path, or cancellation.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, OrderEvent, OrderStatus, TenantPolicy};

/// UpdateStatus action
#[derive(Debug, Clone)]
pub struct UpdateStatusAction {
    pub order_id: i64,
    pub status: OrderStatus,
    pub policy: TenantPolicy,
}

#[async_trait]
impl CommandHandler for UpdateStatusAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        super::require_staff(metadata)?;
        let snapshot = super::load_owned(ctx, metadata, self.order_id)?;
        let from = snapshot.status;

        if !from.can_transition_to(self.status) {
            return Err(OrderError::InvalidTransition(format!(
                "{} -> {}",
                from, self.status
            )));
        }

        let payload = match self.status {
            OrderStatus::Cancelled => {
                if snapshot.is_paid() {
                    return Err(OrderError::AlreadyPaid(self.order_id));
                }
                if snapshot.pending_payment.is_some() {
                    return Err(OrderError::PaymentInProgress(self.order_id));
                }
                EventPayload::OrderCancelled { from, reason: None }
            }
            OrderStatus::Completed => {
                if snapshot.pending_payment.is_some() {
                    return Err(OrderError::PaymentInProgress(self.order_id));
                }
                if !self.policy.may_complete(&snapshot) {
                    return Err(OrderError::InvalidTransition(format!(
                        "order {} must be paid before completion",
                        self.order_id
                    )));
                }
                EventPayload::StatusChanged {
                    from,
                    to: self.status,
                }
            }
            to => EventPayload::StatusChanged { from, to },
        };

        Ok(vec![super::new_event(ctx, metadata, self.order_id, payload)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::actions::test_support::*;
    use shared::order::{PaymentInfo, PendingPayment};

    fn action(status: OrderStatus) -> UpdateStatusAction {
        UpdateStatusAction {
            order_id: 1,
            status,
            policy: TenantPolicy::default(),
        }
    }

    #[tokio::test]
    async fn test_forward_transition_and_skip() {
        let storage = storage_with(&seeded_snapshot());
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 5);

        let events = action(OrderStatus::Ready)
            .execute(&mut ctx, &staff_metadata())
            .await
            .unwrap();
        assert_eq!(events[0].sequence, 6);
        assert_eq!(
            events[0].payload,
            EventPayload::StatusChanged {
                from: OrderStatus::Pending,
                to: OrderStatus::Ready,
            }
        );
    }

    #[tokio::test]
    async fn test_backward_and_terminal_rejected() {
        let mut snapshot = seeded_snapshot();
        snapshot.status = OrderStatus::Ready;
        let storage = storage_with(&snapshot);
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let back = action(OrderStatus::Preparing)
            .execute(&mut ctx, &staff_metadata())
            .await;
        assert!(matches!(back, Err(OrderError::InvalidTransition(_))));

        let same = action(OrderStatus::Ready)
            .execute(&mut ctx, &staff_metadata())
            .await;
        assert!(matches!(same, Err(OrderError::InvalidTransition(_))));

        snapshot.status = OrderStatus::Completed;
        ctx.save_snapshot(snapshot);
        let cancel = action(OrderStatus::Cancelled)
            .execute(&mut ctx, &staff_metadata())
            .await;
        assert!(matches!(cancel, Err(OrderError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_customer_cannot_change_status() {
        let storage = storage_with(&seeded_snapshot());
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let result = action(OrderStatus::Preparing)
            .execute(&mut ctx, &customer_metadata(SESSION))
            .await;
        assert!(matches!(result, Err(OrderError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_completion_policy() {
        let mut snapshot = seeded_snapshot();
        snapshot.status = OrderStatus::Ready;
        let storage = storage_with(&snapshot);
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let strict = UpdateStatusAction {
            policy: TenantPolicy {
                require_paid_before_complete: true,
                ..Default::default()
            },
            ..action(OrderStatus::Completed)
        };
        let unpaid = strict.execute(&mut ctx, &staff_metadata()).await;
        assert!(matches!(unpaid, Err(OrderError::InvalidTransition(_))));

        snapshot.payment = Some(PaymentInfo {
            method: "cash".to_string(),
            paid_at: 1,
            amount: snapshot.total,
            intent_id: None,
        });
        ctx.save_snapshot(snapshot.clone());
        assert!(strict.execute(&mut ctx, &staff_metadata()).await.is_ok());

        snapshot.payment = None;
        snapshot.pending_payment = Some(PendingPayment {
            intent_id: "pi_1".to_string(),
            amount: 1300,
            started_at: 0,
        });
        ctx.save_snapshot(snapshot);
        let paying = action(OrderStatus::Completed)
            .execute(&mut ctx, &staff_metadata())
            .await;
        assert!(matches!(paying, Err(OrderError::PaymentInProgress(1))));
    }

    #[tokio::test]
    async fn test_other_tenant_sees_not_found() {
        let storage = storage_with(&seeded_snapshot());
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let mut metadata = staff_metadata();
        metadata.tenant_id = "tenant-2".to_string();

        let result = action(OrderStatus::Preparing)
            .execute(&mut ctx, &metadata)
            .await;
        assert!(matches!(result, Err(OrderError::OrderNotFound(1))));
    }
}

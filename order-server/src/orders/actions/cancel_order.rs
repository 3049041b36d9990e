//! CancelOrder command handler
//!
//! Customer-initiated cancellation. How far preparation may have progressed
//! is decided by the tenant's [`TenantPolicy`].

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{Actor, EventPayload, OrderEvent, TenantPolicy};

/// CancelOrder action
#[derive(Debug, Clone)]
pub struct CancelOrderAction {
    pub order_id: i64,
    pub reason: Option<String>,
    pub policy: TenantPolicy,
}

#[async_trait]
impl CommandHandler for CancelOrderAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if !matches!(metadata.actor, Actor::Customer { .. }) {
            return Err(OrderError::Unauthorized(
                "staff cancel through a status update".to_string(),
            ));
        }
        let snapshot = super::load_owned(ctx, metadata, self.order_id)?;

        if snapshot.is_paid() {
            return Err(OrderError::AlreadyPaid(self.order_id));
        }
        if snapshot.pending_payment.is_some() {
            return Err(OrderError::PaymentInProgress(self.order_id));
        }
        if !self.policy.customer_may_cancel(&snapshot) {
            return Err(OrderError::InvalidTransition(format!(
                "order {} can no longer be cancelled ({})",
                self.order_id, snapshot.status
            )));
        }

        let payload = EventPayload::OrderCancelled {
            from: snapshot.status,
            reason: self.reason.clone(),
        };
        Ok(vec![super::new_event(ctx, metadata, self.order_id, payload)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::actions::test_support::*;
    use shared::order::{CancelBoundary, OrderStatus};

    fn action(policy: TenantPolicy) -> CancelOrderAction {
        CancelOrderAction {
            order_id: 1,
            reason: None,
            policy,
        }
    }

    #[tokio::test]
    async fn test_cancel_while_pending() {
        let storage = storage_with(&seeded_snapshot());
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = action(TenantPolicy::default())
            .execute(&mut ctx, &customer_metadata(SESSION))
            .await
            .unwrap();
        assert!(matches!(
            events[0].payload,
            EventPayload::OrderCancelled {
                from: OrderStatus::Pending,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_boundary_follows_policy() {
        let mut snapshot = seeded_snapshot();
        snapshot.status = OrderStatus::Preparing;
        let storage = storage_with(&snapshot);
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let metadata = customer_metadata(SESSION);

        let strict = action(TenantPolicy::default())
            .execute(&mut ctx, &metadata)
            .await;
        assert!(matches!(strict, Err(OrderError::InvalidTransition(_))));

        let lenient = action(TenantPolicy {
            customer_cancel_until: CancelBoundary::Preparing,
            ..Default::default()
        })
        .execute(&mut ctx, &metadata)
        .await;
        assert!(lenient.is_ok());
    }

    #[tokio::test]
    async fn test_staff_and_foreign_sessions_rejected() {
        let storage = storage_with(&seeded_snapshot());
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let staff = action(TenantPolicy::default())
            .execute(&mut ctx, &staff_metadata())
            .await;
        assert!(matches!(staff, Err(OrderError::Unauthorized(_))));

        let foreign = action(TenantPolicy::default())
            .execute(&mut ctx, &customer_metadata("other"))
            .await;
        assert!(matches!(foreign, Err(OrderError::Unauthorized(_))));
    }
}

//! Payment command handlers
//!
//! Issued by the payment flow controller (and by staff for manual
//! settlement). Payment never touches the preparation status.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{Actor, EventPayload, OrderEvent, OrderSnapshot, OrderStatus};

fn require_payable(snapshot: &OrderSnapshot) -> Result<(), OrderError> {
    if snapshot.is_paid() {
        return Err(OrderError::AlreadyPaid(snapshot.order_id));
    }
    if snapshot.status == OrderStatus::Cancelled {
        return Err(OrderError::InvalidTransition(format!(
            "order {} is cancelled",
            snapshot.order_id
        )));
    }
    Ok(())
}

/// BeginPayment action - records a provider intent against the order
///
/// Completed orders stay payable; diners often settle after being served.
#[derive(Debug, Clone)]
pub struct BeginPaymentAction {
    pub order_id: i64,
    pub intent_id: String,
    pub amount: i64,
}

#[async_trait]
impl CommandHandler for BeginPaymentAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if metadata.actor != Actor::Payment {
            return Err(OrderError::Unauthorized(
                "only the payment flow may start payments".to_string(),
            ));
        }
        let snapshot = super::load_owned(ctx, metadata, self.order_id)?;
        require_payable(&snapshot)?;
        if self.amount != snapshot.total || self.amount <= 0 {
            return Err(OrderError::Validation(format!(
                "intent amount {} does not match order total {}",
                self.amount, snapshot.total
            )));
        }

        let mut events = Vec::new();
        // A newer intent supersedes the previous attempt
        if let Some(previous) = &snapshot.pending_payment
            && previous.intent_id != self.intent_id
        {
            events.push(super::new_event(
                ctx,
                metadata,
                self.order_id,
                EventPayload::PaymentAbandoned {
                    intent_id: previous.intent_id.clone(),
                },
            ));
        }
        events.push(super::new_event(
            ctx,
            metadata,
            self.order_id,
            EventPayload::PaymentStarted {
                intent_id: self.intent_id.clone(),
                amount: self.amount,
            },
        ));
        Ok(events)
    }
}

/// AbandonPayment action - clears a pending intent the provider gave up on
#[derive(Debug, Clone)]
pub struct AbandonPaymentAction {
    pub order_id: i64,
    pub intent_id: String,
}

#[async_trait]
impl CommandHandler for AbandonPaymentAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if metadata.actor != Actor::Payment {
            return Err(OrderError::Unauthorized(
                "only the payment flow may abandon payments".to_string(),
            ));
        }
        let snapshot = super::load_owned(ctx, metadata, self.order_id)?;
        let matches_pending = snapshot
            .pending_payment
            .as_ref()
            .is_some_and(|p| p.intent_id == self.intent_id);
        if !matches_pending {
            return Ok(vec![]);
        }
        Ok(vec![super::new_event(
            ctx,
            metadata,
            self.order_id,
            EventPayload::PaymentAbandoned {
                intent_id: self.intent_id.clone(),
            },
        )])
    }
}

/// MarkPaid action
///
/// With an intent id the payment flow settles a provider charge; without
/// one, staff record a manual (cash/terminal) settlement. A manual
/// settlement supersedes any pending intent, which the payment controller
/// has already released with the provider.
#[derive(Debug, Clone)]
pub struct MarkPaidAction {
    pub order_id: i64,
    pub method: String,
    pub intent_id: Option<String>,
}

#[async_trait]
impl CommandHandler for MarkPaidAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        match (&metadata.actor, &self.intent_id) {
            (Actor::Payment, Some(_)) | (Actor::Staff { .. }, None) => {}
            _ => {
                return Err(OrderError::Unauthorized(
                    "not allowed to mark this order paid".to_string(),
                ));
            }
        }
        let snapshot = super::load_owned(ctx, metadata, self.order_id)?;
        require_payable(&snapshot)?;

        let mut events = Vec::new();
        if self.intent_id.is_none()
            && let Some(pending) = &snapshot.pending_payment
        {
            events.push(super::new_event(
                ctx,
                metadata,
                self.order_id,
                EventPayload::PaymentAbandoned {
                    intent_id: pending.intent_id.clone(),
                },
            ));
        }

        let payload = EventPayload::OrderPaid {
            method: self.method.clone(),
            amount: snapshot.total,
            intent_id: self.intent_id.clone(),
        };
        events.push(super::new_event(ctx, metadata, self.order_id, payload));
        Ok(events)
    }
}

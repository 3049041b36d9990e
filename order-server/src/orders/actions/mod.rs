//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific command type.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{
    Actor, EventPayload, OrderCommand, OrderCommandPayload, OrderEvent, OrderSnapshot, TenantPolicy,
};

mod adjust_quantity;
mod cancel_order;
mod payment;
mod remove_item;
mod submit_items;
mod update_item_status;
mod update_status;

pub use adjust_quantity::AdjustQuantityAction;
pub use cancel_order::CancelOrderAction;
pub use payment::{AbandonPaymentAction, BeginPaymentAction, MarkPaidAction};
pub use remove_item::RemoveItemAction;
pub use submit_items::SubmitItemsAction;
pub use update_item_status::UpdateItemStatusAction;
pub use update_status::UpdateStatusAction;

/// CommandAction enum - dispatches to concrete action implementations
pub enum CommandAction {
    SubmitItems(SubmitItemsAction),
    UpdateStatus(UpdateStatusAction),
    UpdateItemStatus(UpdateItemStatusAction),
    RemoveItem(RemoveItemAction),
    AdjustQuantity(AdjustQuantityAction),
    CancelOrder(CancelOrderAction),
    BeginPayment(BeginPaymentAction),
    AbandonPayment(AbandonPaymentAction),
    MarkPaid(MarkPaidAction),
}

/// Manual implementation of CommandHandler for CommandAction
#[async_trait]
impl CommandHandler for CommandAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        match self {
            CommandAction::SubmitItems(action) => action.execute(ctx, metadata).await,
            CommandAction::UpdateStatus(action) => action.execute(ctx, metadata).await,
            CommandAction::UpdateItemStatus(action) => action.execute(ctx, metadata).await,
            CommandAction::RemoveItem(action) => action.execute(ctx, metadata).await,
            CommandAction::AdjustQuantity(action) => action.execute(ctx, metadata).await,
            CommandAction::CancelOrder(action) => action.execute(ctx, metadata).await,
            CommandAction::BeginPayment(action) => action.execute(ctx, metadata).await,
            CommandAction::AbandonPayment(action) => action.execute(ctx, metadata).await,
            CommandAction::MarkPaid(action) => action.execute(ctx, metadata).await,
        }
    }
}

/// Convert OrderCommand to CommandAction
///
/// This is the ONLY place with a match on OrderCommandPayload.
/// Catalog lookups and tenant policy are injected afterwards by OrdersManager.
impl From<&OrderCommand> for CommandAction {
    fn from(cmd: &OrderCommand) -> Self {
        match &cmd.payload {
            OrderCommandPayload::SubmitItems {
                table_id,
                items,
                notes,
            } => CommandAction::SubmitItems(SubmitItemsAction {
                table_id: *table_id,
                items: items.clone(),
                notes: notes.clone(),
                products: std::collections::HashMap::new(),
            }),
            OrderCommandPayload::UpdateStatus { order_id, status } => {
                CommandAction::UpdateStatus(UpdateStatusAction {
                    order_id: *order_id,
                    status: *status,
                    policy: TenantPolicy::default(),
                })
            }
            OrderCommandPayload::UpdateItemStatus {
                order_id,
                item_id,
                status,
            } => CommandAction::UpdateItemStatus(UpdateItemStatusAction {
                order_id: *order_id,
                item_id: *item_id,
                status: *status,
            }),
            OrderCommandPayload::RemoveItem {
                order_id,
                item_id,
                reason,
            } => CommandAction::RemoveItem(RemoveItemAction {
                order_id: *order_id,
                item_id: *item_id,
                reason: reason.clone(),
            }),
            OrderCommandPayload::AdjustQuantity {
                order_id,
                item_id,
                quantity,
            } => CommandAction::AdjustQuantity(AdjustQuantityAction {
                order_id: *order_id,
                item_id: *item_id,
                quantity: *quantity,
            }),
            OrderCommandPayload::CancelOrder { order_id, reason } => {
                CommandAction::CancelOrder(CancelOrderAction {
                    order_id: *order_id,
                    reason: reason.clone(),
                    policy: TenantPolicy::default(),
                })
            }
            OrderCommandPayload::BeginPayment {
                order_id,
                intent_id,
                amount,
            } => CommandAction::BeginPayment(BeginPaymentAction {
                order_id: *order_id,
                intent_id: intent_id.clone(),
                amount: *amount,
            }),
            OrderCommandPayload::AbandonPayment {
                order_id,
                intent_id,
            } => CommandAction::AbandonPayment(AbandonPaymentAction {
                order_id: *order_id,
                intent_id: intent_id.clone(),
            }),
            OrderCommandPayload::MarkPaid {
                order_id,
                method,
                intent_id,
            } => CommandAction::MarkPaid(MarkPaidAction {
                order_id: *order_id,
                method: method.clone(),
                intent_id: intent_id.clone(),
            }),
        }
    }
}

impl CommandAction {
    /// Inject the tenant policy into actions that consult it
    pub fn set_policy(&mut self, tenant_policy: TenantPolicy) {
        match self {
            CommandAction::UpdateStatus(action) => action.policy = tenant_policy,
            CommandAction::CancelOrder(action) => action.policy = tenant_policy,
            _ => {}
        }
    }
}

/// Load a snapshot visible to the command's tenant and actor.
///
/// Orders of another tenant are reported as not found; customers may only
/// touch orders created by their own session.
pub(crate) fn load_owned(
    ctx: &CommandContext<'_>,
    metadata: &CommandMetadata,
    order_id: i64,
) -> Result<OrderSnapshot, OrderError> {
    let snapshot = ctx.load_snapshot(order_id)?;
    if snapshot.tenant_id != metadata.tenant_id {
        return Err(OrderError::OrderNotFound(order_id));
    }
    if let Actor::Customer { session_token } = &metadata.actor
        && &snapshot.session_token != session_token
    {
        return Err(OrderError::Unauthorized(format!(
            "order {} belongs to another session",
            order_id
        )));
    }
    Ok(snapshot)
}

pub(crate) fn require_staff(metadata: &CommandMetadata) -> Result<(), OrderError> {
    if metadata.actor.is_staff() {
        Ok(())
    } else {
        Err(OrderError::Unauthorized(
            "staff permission required".to_string(),
        ))
    }
}

/// Items may be edited only while the order is unpaid, non-terminal and
/// has no payment attempt in flight.
pub(crate) fn require_editable(snapshot: &OrderSnapshot) -> Result<(), OrderError> {
    if snapshot.is_paid() {
        return Err(OrderError::AlreadyPaid(snapshot.order_id));
    }
    if snapshot.is_terminal() {
        return Err(OrderError::InvalidTransition(format!(
            "order {} is {}",
            snapshot.order_id, snapshot.status
        )));
    }
    if snapshot.pending_payment.is_some() {
        return Err(OrderError::PaymentInProgress(snapshot.order_id));
    }
    Ok(())
}

/// Build an event for this command with the next sequence number
pub(crate) fn new_event(
    ctx: &mut CommandContext<'_>,
    metadata: &CommandMetadata,
    order_id: i64,
    payload: EventPayload,
) -> OrderEvent {
    let seq = ctx.next_sequence();
    OrderEvent::new(
        seq,
        order_id,
        metadata.tenant_id.clone(),
        metadata.actor.clone(),
        metadata.command_id.clone(),
        Some(metadata.timestamp),
        payload,
    )
}

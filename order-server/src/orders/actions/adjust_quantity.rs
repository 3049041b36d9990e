//! AdjustQuantity command handler

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, ItemStatus, MAX_LINE_QUANTITY, OrderEvent};

/// AdjustQuantity action - sets an absolute quantity on a live line
#[derive(Debug, Clone)]
pub struct AdjustQuantityAction {
    pub order_id: i64,
    pub item_id: i64,
    pub quantity: i32,
}

#[async_trait]
impl CommandHandler for AdjustQuantityAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.quantity < 1 {
            return Err(OrderError::Validation(
                "quantity must be at least 1, remove the item instead".to_string(),
            ));
        }
        if self.quantity > MAX_LINE_QUANTITY {
            return Err(OrderError::Validation(format!(
                "quantity exceeds {}",
                MAX_LINE_QUANTITY
            )));
        }

        let snapshot = super::load_owned(ctx, metadata, self.order_id)?;
        super::require_editable(&snapshot)?;

        let item = snapshot
            .find_item(self.item_id)
            .ok_or(OrderError::ItemNotFound(self.item_id))?;
        if item.is_removed() {
            return Err(OrderError::InvalidTransition(format!(
                "item {} was removed",
                self.item_id
            )));
        }
        if !metadata.actor.is_staff() && item.status != ItemStatus::Pending {
            return Err(OrderError::InvalidTransition(format!(
                "item {} is already {}",
                self.item_id, item.status
            )));
        }
        if item.quantity == self.quantity {
            return Ok(vec![]);
        }

        let payload = EventPayload::ItemQuantityAdjusted {
            item_id: self.item_id,
            from: item.quantity,
            to: self.quantity,
        };
        Ok(vec![super::new_event(ctx, metadata, self.order_id, payload)])
    }
}

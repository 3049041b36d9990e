//! RemoveItem command handler
//!
//! Removal is a soft mark: the row stays with its last quantity, the
//! total drops its line.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, ItemStatus, OrderEvent};

/// RemoveItem action
#[derive(Debug, Clone)]
pub struct RemoveItemAction {
    pub order_id: i64,
    pub item_id: i64,
    pub reason: Option<String>,
}

#[async_trait]
impl CommandHandler for RemoveItemAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let snapshot = super::load_owned(ctx, metadata, self.order_id)?;
        super::require_editable(&snapshot)?;

        let item = snapshot
            .find_item(self.item_id)
            .ok_or(OrderError::ItemNotFound(self.item_id))?;
        if item.is_removed() {
            return Err(OrderError::InvalidTransition(format!(
                "item {} already removed",
                self.item_id
            )));
        }
        // Customers can only withdraw lines the kitchen has not started
        if !metadata.actor.is_staff() && item.status != ItemStatus::Pending {
            return Err(OrderError::InvalidTransition(format!(
                "item {} is already {}",
                self.item_id, item.status
            )));
        }

        let payload = EventPayload::ItemRemoved {
            item_id: self.item_id,
            item_name: item.name.clone(),
            reason: self.reason.clone(),
        };
        Ok(vec![super::new_event(ctx, metadata, self.order_id, payload)])
    }
}

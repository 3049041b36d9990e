//! UpdateItemStatus command handler

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, ItemStatus, OrderEvent};

/// UpdateItemStatus action
#[derive(Debug, Clone)]
pub struct UpdateItemStatusAction {
    pub order_id: i64,
    pub item_id: i64,
    pub status: ItemStatus,
}

#[async_trait]
impl CommandHandler for UpdateItemStatusAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        super::require_staff(metadata)?;
        let snapshot = super::load_owned(ctx, metadata, self.order_id)?;

        if snapshot.is_terminal() {
            return Err(OrderError::InvalidTransition(format!(
                "order {} is {}",
                self.order_id, snapshot.status
            )));
        }

        let item = snapshot
            .find_item(self.item_id)
            .ok_or(OrderError::ItemNotFound(self.item_id))?;
        if item.is_removed() {
            return Err(OrderError::InvalidTransition(format!(
                "item {} was removed",
                self.item_id
            )));
        }
        if !item.status.can_transition_to(self.status) {
            return Err(OrderError::InvalidTransition(format!(
                "item {}: {} -> {}",
                self.item_id, item.status, self.status
            )));
        }

        let payload = EventPayload::ItemStatusChanged {
            item_id: self.item_id,
            from: item.status,
            to: self.status,
        };
        Ok(vec![super::new_event(ctx, metadata, self.order_id, payload)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::actions::test_support::*;

    #[tokio::test]
    async fn test_item_forward_only() {
        let mut snapshot = seeded_snapshot();
        snapshot.items[0].status = ItemStatus::Ready;
        let storage = storage_with(&snapshot);
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let ok = UpdateItemStatusAction {
            order_id: 1,
            item_id: 1,
            status: ItemStatus::Delivered,
        }
        .execute(&mut ctx, &staff_metadata())
        .await
        .unwrap();
        assert_eq!(ok.len(), 1);

        let back = UpdateItemStatusAction {
            order_id: 1,
            item_id: 1,
            status: ItemStatus::Preparing,
        }
        .execute(&mut ctx, &staff_metadata())
        .await;
        assert!(matches!(back, Err(OrderError::InvalidTransition(_))));

        let missing = UpdateItemStatusAction {
            order_id: 1,
            item_id: 77,
            status: ItemStatus::Ready,
        }
        .execute(&mut ctx, &staff_metadata())
        .await;
        assert!(matches!(missing, Err(OrderError::ItemNotFound(77))));
    }
}

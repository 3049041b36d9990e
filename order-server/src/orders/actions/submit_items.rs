//! SubmitItems command handler
//!
//! Creates the session's order at a table, or merges the submitted cart
//! into the session's open order there.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{
    Actor, CartItemInput, EventPayload, ItemIncrement, ItemStatus, MAX_LINE_QUANTITY, OrderEvent,
    OrderItem, ProductRef,
};

/// SubmitItems action
#[derive(Debug, Clone)]
pub struct SubmitItemsAction {
    pub table_id: i64,
    pub items: Vec<CartItemInput>,
    pub notes: Option<String>,
    /// Resolved catalog entries, injected by OrdersManager
    pub products: HashMap<i64, ProductRef>,
}

/// One product's aggregated quantity within a single submission
struct Line<'a> {
    product: &'a ProductRef,
    quantity: i32,
    note: Option<String>,
}

/// Sum two line quantities, refusing anything above the per-line cap
fn add_quantity(product_id: i64, current: i32, added: i32) -> Result<i32, OrderError> {
    current
        .checked_add(added)
        .filter(|q| *q <= MAX_LINE_QUANTITY)
        .ok_or_else(|| {
            OrderError::Validation(format!(
                "quantity for product {} exceeds {}",
                product_id, MAX_LINE_QUANTITY
            ))
        })
}

impl SubmitItemsAction {
    /// Validate the cart and fold duplicate product lines, keeping first-seen order
    fn aggregate(&self) -> Result<Vec<Line<'_>>, OrderError> {
        if self.items.is_empty() {
            return Err(OrderError::Validation("cart is empty".to_string()));
        }
        let mut lines: Vec<Line<'_>> = Vec::with_capacity(self.items.len());
        for input in &self.items {
            if input.quantity < 1 {
                return Err(OrderError::Validation(format!(
                    "quantity must be at least 1 for product {}",
                    input.product_id
                )));
            }
            if input.quantity > MAX_LINE_QUANTITY {
                return Err(OrderError::Validation(format!(
                    "quantity for product {} exceeds {}",
                    input.product_id, MAX_LINE_QUANTITY
                )));
            }
            let product = self
                .products
                .get(&input.product_id)
                .ok_or(OrderError::ProductNotFound(input.product_id))?;
            match lines
                .iter_mut()
                .find(|l| l.product.product_id == input.product_id)
            {
                Some(line) => {
                    line.quantity = add_quantity(input.product_id, line.quantity, input.quantity)?;
                }
                None => lines.push(Line {
                    product,
                    quantity: input.quantity,
                    note: input.note.clone(),
                }),
            }
        }
        Ok(lines)
    }

    fn new_row(ctx: &mut CommandContext<'_>, line: &Line<'_>) -> Result<OrderItem, OrderError> {
        Ok(OrderItem {
            id: ctx.next_item_id()?,
            product_id: line.product.product_id,
            name: line.product.name.clone(),
            unit_price: line.product.unit_price,
            quantity: line.quantity,
            status: ItemStatus::Pending,
            note: line.note.clone(),
            removal: None,
        })
    }
}

#[async_trait]
impl CommandHandler for SubmitItemsAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Only a customer session can own a table order
        let Actor::Customer { session_token } = &metadata.actor else {
            return Err(OrderError::Unauthorized(
                "submissions require a customer session".to_string(),
            ));
        };

        // 2. Validate and aggregate cart lines
        let lines = self.aggregate()?;

        // 3. Merge into the open order, if any
        let open = ctx.find_open_order(&metadata.tenant_id, self.table_id, session_token)?;
        if let Some(order_id) = open {
            let snapshot = ctx.load_snapshot(order_id)?;
            let mut events = Vec::new();

            // The total is about to change; a pending intent no longer matches it
            if let Some(pending) = &snapshot.pending_payment {
                events.push(super::new_event(
                    ctx,
                    metadata,
                    order_id,
                    EventPayload::PaymentAbandoned {
                        intent_id: pending.intent_id.clone(),
                    },
                ));
            }

            let mut increments = Vec::new();
            let mut added = Vec::new();
            for line in &lines {
                // Removed rows are never reactivated
                let existing = snapshot
                    .active_items()
                    .find(|i| i.product_id == line.product.product_id);
                match existing {
                    Some(item) => {
                        add_quantity(item.product_id, item.quantity, line.quantity)?;
                        increments.push(ItemIncrement {
                            item_id: item.id,
                            added: line.quantity,
                        });
                    }
                    None => added.push(Self::new_row(ctx, line)?),
                }
            }

            events.push(super::new_event(
                ctx,
                metadata,
                order_id,
                EventPayload::ItemsMerged {
                    increments,
                    added,
                    notes: self.notes.clone(),
                },
            ));
            return Ok(events);
        }

        // 4. No open order: create one
        let order_id = ctx.next_order_id()?;
        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            items.push(Self::new_row(ctx, line)?);
        }

        let event = super::new_event(
            ctx,
            metadata,
            order_id,
            EventPayload::OrderCreated {
                table_id: self.table_id,
                session_token: session_token.clone(),
                items,
                notes: self.notes.clone(),
            },
        );
        Ok(vec![event])
    }
}

//! Order commands - requests to modify orders

use super::types::{CartItemInput, ItemStatus, OrderStatus};
use serde::{Deserialize, Serialize};

/// Identity behind a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Actor {
    /// Authenticated staff member of the tenant
    Staff { user_id: String },
    /// Anonymous diner bound to a table visit
    Customer { session_token: String },
    /// Payment flow controller acting on provider results
    Payment,
}

impl Actor {
    pub fn is_staff(&self) -> bool {
        matches!(self, Actor::Staff { .. })
    }

    pub fn session_token(&self) -> Option<&str> {
        match self {
            Actor::Customer { session_token } => Some(session_token),
            _ => None,
        }
    }

    /// Short audit label, e.g. `staff:42`
    pub fn label(&self) -> String {
        match self {
            Actor::Staff { user_id } => format!("staff:{}", user_id),
            Actor::Customer { session_token } => format!("session:{}", session_token),
            Actor::Payment => "payment".to_string(),
        }
    }
}

/// Order command envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCommand {
    /// Idempotency key
    pub command_id: String,
    pub tenant_id: String,
    pub actor: Actor,
    /// Client timestamp (Unix milliseconds)
    pub timestamp: i64,
    pub payload: OrderCommandPayload,
}

impl OrderCommand {
    pub fn new(tenant_id: impl Into<String>, actor: Actor, payload: OrderCommandPayload) -> Self {
        Self {
            command_id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            actor,
            timestamp: crate::util::now_millis(),
            payload,
        }
    }

    /// Reuse a client-provided idempotency key
    pub fn with_command_id(mut self, command_id: impl Into<String>) -> Self {
        self.command_id = command_id.into();
        self
    }
}

/// Command payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderCommandPayload {
    /// Create or merge into the session's open order at a table
    SubmitItems {
        table_id: i64,
        items: Vec<CartItemInput>,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },

    /// Staff status change (forward only, or cancel)
    UpdateStatus { order_id: i64, status: OrderStatus },

    UpdateItemStatus {
        order_id: i64,
        item_id: i64,
        status: ItemStatus,
    },

    RemoveItem {
        order_id: i64,
        item_id: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    AdjustQuantity {
        order_id: i64,
        item_id: i64,
        quantity: i32,
    },

    /// Customer-initiated cancellation, bounded by tenant policy
    CancelOrder {
        order_id: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    BeginPayment {
        order_id: i64,
        intent_id: String,
        amount: i64,
    },

    AbandonPayment { order_id: i64, intent_id: String },

    MarkPaid {
        order_id: i64,
        method: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        intent_id: Option<String>,
    },
}

impl OrderCommandPayload {
    /// Target order, `None` for submissions
    pub fn order_id(&self) -> Option<i64> {
        match self {
            OrderCommandPayload::SubmitItems { .. } => None,
            OrderCommandPayload::UpdateStatus { order_id, .. }
            | OrderCommandPayload::UpdateItemStatus { order_id, .. }
            | OrderCommandPayload::RemoveItem { order_id, .. }
            | OrderCommandPayload::AdjustQuantity { order_id, .. }
            | OrderCommandPayload::CancelOrder { order_id, .. }
            | OrderCommandPayload::BeginPayment { order_id, .. }
            | OrderCommandPayload::AbandonPayment { order_id, .. }
            | OrderCommandPayload::MarkPaid { order_id, .. } => Some(*order_id),
        }
    }
}

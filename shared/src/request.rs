//! Request bodies for the order HTTP API

use crate::order::{CartItemInput, ItemStatus, OrderStatus};
use serde::{Deserialize, Serialize};

/// Customer cart submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOrderRequest {
    pub session_token: String,
    pub items: Vec<CartItemInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Client idempotency key, reused on retry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
}

/// Query string carrying the customer session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionQuery {
    pub session: String,
}

/// Body carrying only the customer session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub session_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveItemRequest {
    /// Required on customer routes, ignored on staff routes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustQuantityRequest {
    pub session_token: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    pub session_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub session_token: String,
    pub intent_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateItemStatusRequest {
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkPaidRequest {
    /// `cash`, `card_terminal`, ...
    pub method: String,
}

/// Staff order listing filter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub include_closed: bool,
}

//! Order-related shared types

use crate::error::ErrorCode;
use serde::{Deserialize, Serialize};

// ============================================================================
// Status machine
// ============================================================================

/// Order preparation status
///
/// `pending -> preparing -> ready -> completed`, plus `cancelled` from any
/// non-terminal state. Payment is tracked separately on the snapshot and
/// never changes this dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Position along the forward path. `None` for `Cancelled`.
    pub const fn rank(self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Preparing => Some(1),
            OrderStatus::Ready => Some(2),
            OrderStatus::Completed => Some(3),
            OrderStatus::Cancelled => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Staff-facing successor check: strictly forward along the path, or
    /// cancellation from a non-terminal state.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(cur), Some(nxt)) => nxt > cur,
            (None, Some(_)) => false,
        }
    }

    /// All statuses reachable from this one in a single staff transition
    pub fn successors(self) -> Vec<OrderStatus> {
        OrderStatus::ALL
            .into_iter()
            .filter(|s| self.can_transition_to(*s))
            .collect()
    }

    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("unknown order status: {}", s))
    }
}

/// Per-item preparation status, independent of the order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl ItemStatus {
    pub const fn rank(self) -> Option<u8> {
        match self {
            ItemStatus::Pending => Some(0),
            ItemStatus::Preparing => Some(1),
            ItemStatus::Ready => Some(2),
            ItemStatus::Delivered => Some(3),
            ItemStatus::Cancelled => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Delivered | ItemStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: ItemStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(cur), Some(nxt)) => nxt > cur,
            (None, Some(_)) => false,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Preparing => "preparing",
            ItemStatus::Ready => "ready",
            ItemStatus::Delivered => "delivered",
            ItemStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Items
// ============================================================================

/// Upper bound on one order line's quantity, merges included
pub const MAX_LINE_QUANTITY: i32 = 999;

/// Cart line submitted by a customer session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemInput {
    pub product_id: i64,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Product reference resolved from the catalog at order time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub product_id: i64,
    pub name: String,
    /// Unit price in minor currency units
    pub unit_price: i64,
}

/// Who removed an item, when and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRemoval {
    pub removed_by: String,
    pub removed_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Order line with name/price snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub product_id: i64,
    /// Name snapshot
    pub name: String,
    /// Unit price snapshot (minor units)
    pub unit_price: i64,
    /// Frozen once `removal` is set
    pub quantity: i32,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removal: Option<ItemRemoval>,
}

impl OrderItem {
    pub fn is_removed(&self) -> bool {
        self.removal.is_some()
    }

    /// Contribution to the order total (0 once removed)
    pub fn line_total(&self) -> i64 {
        if self.is_removed() {
            0
        } else {
            self.unit_price * i64::from(self.quantity)
        }
    }
}

/// Quantity added to an existing line during a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemIncrement {
    pub item_id: i64,
    pub added: i32,
}

// ============================================================================
// Payment
// ============================================================================

/// Payment record once the order is marked paid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfo {
    /// `card`, `cash`, ...
    pub method: String,
    pub paid_at: i64,
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<String>,
}

/// Provider intent created but not yet resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPayment {
    pub intent_id: String,
    pub amount: i64,
    pub started_at: i64,
}

// ============================================================================
// Command response
// ============================================================================

/// Whether a submission created a new order or merged into an open one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    Created,
    Merged,
}

/// Command error carried on a failed [`CommandResponse`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandError {
    pub code: ErrorCode,
    pub message: String,
}

impl CommandError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<CommandError> for crate::error::AppError {
    fn from(err: CommandError) -> Self {
        crate::error::AppError::with_message(err.code, err.message)
    }
}

/// Result of executing an order command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub command_id: String,
    pub success: bool,
    /// Snapshot after the command (absent for duplicates and failures)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<super::OrderSnapshot>,
    /// Set for item submissions only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<SubmitOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn success(command_id: String, order: Option<super::OrderSnapshot>) -> Self {
        Self {
            command_id,
            success: true,
            order,
            outcome: None,
            error: None,
        }
    }

    pub fn with_outcome(mut self, outcome: Option<SubmitOutcome>) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn error(command_id: String, error: CommandError) -> Self {
        Self {
            command_id,
            success: false,
            order: None,
            outcome: None,
            error: Some(error),
        }
    }

    /// Command was already processed; no events were produced
    pub fn duplicate(command_id: String) -> Self {
        Self {
            command_id,
            success: true,
            order: None,
            outcome: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_only() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Preparing));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Ready));
        assert!(OrderStatus::Ready.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Preparing.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Ready.can_transition_to(OrderStatus::Ready));
    }

    #[test]
    fn test_cancel_from_non_terminal_only() {
        for status in [OrderStatus::Pending, OrderStatus::Preparing, OrderStatus::Ready] {
            assert!(status.can_transition_to(OrderStatus::Cancelled));
        }
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_terminal_has_no_successors() {
        assert!(OrderStatus::Completed.successors().is_empty());
        assert!(OrderStatus::Cancelled.successors().is_empty());
        assert_eq!(
            OrderStatus::Ready.successors(),
            vec![OrderStatus::Completed, OrderStatus::Cancelled]
        );
    }

    #[test]
    fn test_item_status_forward() {
        assert!(ItemStatus::Pending.can_transition_to(ItemStatus::Ready));
        assert!(ItemStatus::Ready.can_transition_to(ItemStatus::Delivered));
        assert!(!ItemStatus::Delivered.can_transition_to(ItemStatus::Cancelled));
        assert!(!ItemStatus::Ready.can_transition_to(ItemStatus::Preparing));
    }

    #[test]
    fn test_status_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Preparing).unwrap(),
            "\"preparing\""
        );
        let parsed: OrderStatus = "cancelled".parse().unwrap();
        assert_eq!(parsed, OrderStatus::Cancelled);
        assert!("paid".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_removed_item_excluded_from_total() {
        let mut item = OrderItem {
            id: 1,
            product_id: 10,
            name: "Burger".to_string(),
            unit_price: 1000,
            quantity: 2,
            status: ItemStatus::Pending,
            note: None,
            removal: None,
        };
        assert_eq!(item.line_total(), 2000);
        item.removal = Some(ItemRemoval {
            removed_by: "staff:1".to_string(),
            removed_at: 0,
            reason: None,
        });
        assert_eq!(item.line_total(), 0);
        assert_eq!(item.quantity, 2);
    }
}

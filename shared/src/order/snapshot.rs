//! Order snapshot - computed state from event stream

use super::types::{OrderItem, OrderStatus, PaymentInfo, PendingPayment};
use serde::{Deserialize, Serialize};

/// Order snapshot - computed from event stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSnapshot {
    /// Order ID (assigned by server)
    pub order_id: i64,
    /// Owning tenant
    pub tenant_id: String,
    /// Table the order was placed from
    pub table_id: i64,
    /// Anonymous session that created the order
    pub session_token: String,
    /// Preparation status
    pub status: OrderStatus,
    /// Items in submission order, removed items included
    pub items: Vec<OrderItem>,
    /// Sum of non-removed lines (minor units)
    pub total: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Set once the order is paid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentInfo>,
    /// Unresolved provider intent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_payment: Option<PendingPayment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    /// Created at (Unix milliseconds)
    pub created_at: i64,
    /// Last update (Unix milliseconds)
    pub updated_at: i64,
    /// Sequence of the last applied event
    pub last_sequence: u64,
}

impl OrderSnapshot {
    /// Create an empty pending order
    pub fn new(order_id: i64, tenant_id: String, table_id: i64, session_token: String) -> Self {
        let now = crate::util::now_millis();
        Self {
            order_id,
            tenant_id,
            table_id,
            session_token,
            status: OrderStatus::Pending,
            items: Vec::new(),
            total: 0,
            notes: None,
            payment: None,
            pending_payment: None,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
            last_sequence: 0,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.payment.is_some()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Accepts new submissions: not terminal and not yet paid
    pub fn is_open(&self) -> bool {
        !self.is_terminal() && !self.is_paid()
    }

    pub fn active_items(&self) -> impl Iterator<Item = &OrderItem> {
        self.items.iter().filter(|i| !i.is_removed())
    }

    pub fn find_item(&self, item_id: i64) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn find_item_mut(&mut self, item_id: i64) -> Option<&mut OrderItem> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }

    /// Recompute `total` from non-removed lines
    pub fn recalculate_total(&mut self) {
        self.total = self.items.iter().map(OrderItem::line_total).sum();
    }
}

//! Tenant-level order policy

use super::snapshot::OrderSnapshot;
use super::types::{ItemStatus, OrderStatus};
use serde::{Deserialize, Serialize};

/// Furthest preparation stage at which a customer may still cancel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CancelBoundary {
    #[default]
    Pending,
    Preparing,
}

impl CancelBoundary {
    fn rank(self) -> u8 {
        match self {
            CancelBoundary::Pending => 0,
            CancelBoundary::Preparing => 1,
        }
    }
}

impl std::str::FromStr for CancelBoundary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(CancelBoundary::Pending),
            "preparing" => Ok(CancelBoundary::Preparing),
            other => Err(format!("invalid cancel boundary: {}", other)),
        }
    }
}

/// Per-tenant rules layered on the status machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TenantPolicy {
    pub customer_cancel_until: CancelBoundary,
    /// Staff may only complete an order once it is paid
    pub require_paid_before_complete: bool,
}

impl TenantPolicy {
    /// Whether a customer may cancel the order in its current state.
    ///
    /// Neither the order nor any live item may have progressed past the
    /// configured boundary, and the order must be unpaid and non-terminal.
    pub fn customer_may_cancel(&self, snapshot: &OrderSnapshot) -> bool {
        if !snapshot.is_open() || snapshot.pending_payment.is_some() {
            return false;
        }
        let limit = self.customer_cancel_until.rank();
        let order_ok = snapshot.status.rank().is_some_and(|r| r <= limit);
        let items_ok = snapshot.active_items().all(|item| match item.status {
            ItemStatus::Cancelled => true,
            other => other.rank().is_some_and(|r| r <= limit),
        });
        order_ok && items_ok
    }

    /// Whether staff may move the order to `completed`
    pub fn may_complete(&self, snapshot: &OrderSnapshot) -> bool {
        snapshot.status.can_transition_to(OrderStatus::Completed)
            && snapshot.pending_payment.is_none()
            && (!self.require_paid_before_complete || snapshot.is_paid())
    }
}

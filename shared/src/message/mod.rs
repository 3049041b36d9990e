//! 实时推送通道消息类型
//!
//! Shared by the order-server broadcast hub and the menu-client
//! subscriber. One JSON text frame carries one [`ChannelMessage`].

use crate::order::{ItemStatus, OrderStatus};
use serde::{Deserialize, Serialize};

/// Close code for an orderly shutdown
pub const CLOSE_NORMAL: u16 = 1000;
/// Close code for rejected credentials (policy violation)
pub const CLOSE_AUTH_REJECTED: u16 = 1008;

/// Whether a close code should be followed by an automatic reconnect
pub fn should_reconnect(close_code: Option<u16>) -> bool {
    !matches!(close_code, Some(CLOSE_NORMAL) | Some(CLOSE_AUTH_REJECTED))
}

/// Channel event kinds
///
/// Unknown kinds deserialize to [`ChannelEventKind::Unknown`] so newer
/// servers can add events without breaking older subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelEventKind {
    NewOrder,
    ItemsAdded,
    StatusUpdate,
    ItemStatusUpdate,
    ItemRemoved,
    ItemUpdated,
    OrderPaid,
    /// Subscriber fell behind; re-fetch authoritative state
    Resync,
    #[serde(other)]
    Unknown,
}

/// One pushed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    #[serde(rename = "type")]
    pub kind: ChannelEventKind,
    #[serde(default)]
    pub order_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<i64>,
    /// Order status after the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_status: Option<ItemStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid: Option<bool>,
    /// Order total after the change (minor units)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(default)]
    pub timestamp: i64,
}

impl ChannelMessage {
    pub fn new(kind: ChannelEventKind, order_id: i64, timestamp: i64) -> Self {
        Self {
            kind,
            order_id,
            table_id: None,
            status: None,
            item_id: None,
            item_status: None,
            paid: None,
            total: None,
            timestamp,
        }
    }

    pub fn resync() -> Self {
        Self::new(ChannelEventKind::Resync, 0, crate::util::now_millis())
    }

    pub fn is_known(&self) -> bool {
        self.kind != ChannelEventKind::Unknown
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

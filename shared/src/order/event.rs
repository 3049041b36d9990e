//! Order events - immutable facts recorded after command processing

use super::command::Actor;
use super::types::{ItemIncrement, ItemStatus, OrderItem, OrderStatus};
use serde::{Deserialize, Serialize};

/// Order event - immutable audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Event unique ID
    pub event_id: String,
    /// Global sequence number, authoritative ordering
    pub sequence: u64,
    /// Order this event belongs to
    pub order_id: i64,
    /// Tenant that owns the order (routing key for the broadcast hub)
    pub tenant_id: String,
    /// Server timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Client timestamp, preserved from the command for audit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<i64>,
    /// Who triggered this event
    pub actor: Actor,
    /// Command that triggered this event
    pub command_id: String,
    pub event_type: OrderEventType,
    pub payload: EventPayload,
}

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventType {
    // Lifecycle
    OrderCreated,
    StatusChanged,
    OrderCancelled,

    // Items
    ItemsMerged,
    ItemStatusChanged,
    ItemRemoved,
    ItemQuantityAdjusted,

    // Payments
    PaymentStarted,
    PaymentAbandoned,
    OrderPaid,
}

impl std::fmt::Display for OrderEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderEventType::OrderCreated => write!(f, "ORDER_CREATED"),
            OrderEventType::StatusChanged => write!(f, "STATUS_CHANGED"),
            OrderEventType::OrderCancelled => write!(f, "ORDER_CANCELLED"),
            OrderEventType::ItemsMerged => write!(f, "ITEMS_MERGED"),
            OrderEventType::ItemStatusChanged => write!(f, "ITEM_STATUS_CHANGED"),
            OrderEventType::ItemRemoved => write!(f, "ITEM_REMOVED"),
            OrderEventType::ItemQuantityAdjusted => write!(f, "ITEM_QUANTITY_ADJUSTED"),
            OrderEventType::PaymentStarted => write!(f, "PAYMENT_STARTED"),
            OrderEventType::PaymentAbandoned => write!(f, "PAYMENT_ABANDONED"),
            OrderEventType::OrderPaid => write!(f, "ORDER_PAID"),
        }
    }
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    // ========== Lifecycle ==========
    OrderCreated {
        table_id: i64,
        session_token: String,
        items: Vec<OrderItem>,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },

    StatusChanged {
        from: OrderStatus,
        to: OrderStatus,
    },

    OrderCancelled {
        from: OrderStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    // ========== Items ==========
    /// A submission merged into an open order
    ItemsMerged {
        /// Lines summed into existing rows
        increments: Vec<ItemIncrement>,
        /// Lines appended as new rows
        added: Vec<OrderItem>,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },

    ItemStatusChanged {
        item_id: i64,
        from: ItemStatus,
        to: ItemStatus,
    },

    ItemRemoved {
        item_id: i64,
        item_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    ItemQuantityAdjusted {
        item_id: i64,
        from: i32,
        to: i32,
    },

    // ========== Payments ==========
    PaymentStarted {
        intent_id: String,
        amount: i64,
    },

    PaymentAbandoned {
        intent_id: String,
    },

    OrderPaid {
        method: String,
        amount: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        intent_id: Option<String>,
    },
}

impl EventPayload {
    pub fn event_type(&self) -> OrderEventType {
        match self {
            EventPayload::OrderCreated { .. } => OrderEventType::OrderCreated,
            EventPayload::StatusChanged { .. } => OrderEventType::StatusChanged,
            EventPayload::OrderCancelled { .. } => OrderEventType::OrderCancelled,
            EventPayload::ItemsMerged { .. } => OrderEventType::ItemsMerged,
            EventPayload::ItemStatusChanged { .. } => OrderEventType::ItemStatusChanged,
            EventPayload::ItemRemoved { .. } => OrderEventType::ItemRemoved,
            EventPayload::ItemQuantityAdjusted { .. } => OrderEventType::ItemQuantityAdjusted,
            EventPayload::PaymentStarted { .. } => OrderEventType::PaymentStarted,
            EventPayload::PaymentAbandoned { .. } => OrderEventType::PaymentAbandoned,
            EventPayload::OrderPaid { .. } => OrderEventType::OrderPaid,
        }
    }
}

impl OrderEvent {
    /// Create a new event
    ///
    /// # Arguments
    /// * `sequence` - Global sequence number (authoritative ordering)
    /// * `order_id` - Order this event belongs to
    /// * `tenant_id` - Owning tenant
    /// * `actor` - Who triggered this event
    /// * `command_id` - Command that triggered this event
    /// * `client_timestamp` - Client-provided timestamp (audit only)
    /// * `payload` - Event payload, which also determines the event type
    pub fn new(
        sequence: u64,
        order_id: i64,
        tenant_id: String,
        actor: Actor,
        command_id: String,
        client_timestamp: Option<i64>,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            order_id,
            tenant_id,
            // Server timestamp is always set by the server
            timestamp: crate::util::now_millis(),
            client_timestamp,
            actor,
            command_id,
            event_type: payload.event_type(),
            payload,
        }
    }
}

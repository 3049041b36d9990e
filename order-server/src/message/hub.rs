//! TenantHub: 按 tenant 隔离的订单事件分发
//!
//! ```text
//! OrdersManager (after commit)
//!       │ OrderEvent + OrderSnapshot
//!       ▼
//! TenantHub
//!   └── tenants: tenant_id → broadcast::Sender<HubEvent>
//!         │
//!         ├── staff WS  (all tables of the tenant)
//!         └── table WS  (filtered by table / session)
//! ```

use dashmap::DashMap;
use shared::message::{ChannelEventKind, ChannelMessage};
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Broadcast channel 容量: 足以缓冲连接时突发
const BROADCAST_CAPACITY: usize = 256;

/// Message plus the routing keys subscribers filter on
#[derive(Debug, Clone)]
pub struct HubEvent {
    pub table_id: i64,
    pub session_token: String,
    pub message: ChannelMessage,
}

impl HubEvent {
    /// Whether a table channel (optionally narrowed to one session) wants this
    pub fn visible_to_table(&self, table_id: i64, session: Option<&str>) -> bool {
        self.table_id == table_id && session.is_none_or(|s| s == self.session_token)
    }
}

/// 单个 tenant 的广播通道
struct TenantChannel {
    tx: broadcast::Sender<HubEvent>,
}

impl TenantChannel {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx }
    }
}

/// 全局推送 hub: 按 tenant 严格隔离
#[derive(Clone, Default)]
pub struct TenantHub {
    tenants: Arc<DashMap<String, TenantChannel>>,
}

impl std::fmt::Debug for TenantHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantHub")
            .field("tenants", &self.tenants.len())
            .finish()
    }
}

impl TenantHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅 tenant 的 broadcast channel
    pub fn subscribe(&self, tenant_id: &str) -> broadcast::Receiver<HubEvent> {
        self.tenants
            .entry(tenant_id.to_string())
            .or_insert_with(TenantChannel::new)
            .tx
            .subscribe()
    }

    /// Publish a committed event. Events without a channel representation
    /// are dropped; so are events for tenants nobody is listening to.
    pub fn publish(&self, event: &OrderEvent, snapshot: &OrderSnapshot) {
        let Some(message) = channel_message(event, snapshot) else {
            return;
        };
        let Some(tenant) = self.tenants.get(&event.tenant_id) else {
            return;
        };
        // 无订阅者时 send 返回 Err，安全忽略
        let _ = tenant.tx.send(HubEvent {
            table_id: snapshot.table_id,
            session_token: snapshot.session_token.clone(),
            message,
        });
    }

    /// Number of live subscribers for a tenant
    pub fn subscriber_count(&self, tenant_id: &str) -> usize {
        self.tenants
            .get(tenant_id)
            .map(|t| t.tx.receiver_count())
            .unwrap_or(0)
    }

    /// Drop the tenant entry once its last subscriber is gone
    pub fn release(&self, tenant_id: &str) {
        self.tenants
            .remove_if(tenant_id, |_, t| t.tx.receiver_count() == 0);
    }
}

/// Translate an order event into its channel message
pub fn channel_message(event: &OrderEvent, snapshot: &OrderSnapshot) -> Option<ChannelMessage> {
    let kind = match &event.payload {
        EventPayload::OrderCreated { .. } => ChannelEventKind::NewOrder,
        EventPayload::ItemsMerged { .. } => ChannelEventKind::ItemsAdded,
        EventPayload::StatusChanged { .. } | EventPayload::OrderCancelled { .. } => {
            ChannelEventKind::StatusUpdate
        }
        EventPayload::ItemStatusChanged { .. } => ChannelEventKind::ItemStatusUpdate,
        EventPayload::ItemRemoved { .. } => ChannelEventKind::ItemRemoved,
        EventPayload::ItemQuantityAdjusted { .. } => ChannelEventKind::ItemUpdated,
        EventPayload::OrderPaid { .. } => ChannelEventKind::OrderPaid,
        // Intent bookkeeping is internal to the payment flow
        EventPayload::PaymentStarted { .. } | EventPayload::PaymentAbandoned { .. } => {
            return None;
        }
    };

    let mut message = ChannelMessage::new(kind, event.order_id, event.timestamp);
    message.table_id = Some(snapshot.table_id);
    message.status = Some(snapshot.status);
    message.paid = Some(snapshot.is_paid());
    message.total = Some(snapshot.total);

    match &event.payload {
        EventPayload::ItemStatusChanged { item_id, to, .. } => {
            message.item_id = Some(*item_id);
            message.item_status = Some(*to);
        }
        EventPayload::ItemRemoved { item_id, .. }
        | EventPayload::ItemQuantityAdjusted { item_id, .. } => {
            message.item_id = Some(*item_id);
        }
        _ => {}
    }
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::{Actor, ItemStatus, OrderStatus};

    fn snapshot(tenant: &str, table_id: i64, session: &str) -> OrderSnapshot {
        let mut s = OrderSnapshot::new(7, tenant.to_string(), table_id, session.to_string());
        s.status = OrderStatus::Preparing;
        s.total = 2300;
        s
    }

    fn event(tenant: &str, payload: EventPayload) -> OrderEvent {
        OrderEvent::new(
            1,
            7,
            tenant.to_string(),
            Actor::Staff {
                user_id: "u1".to_string(),
            },
            "cmd".to_string(),
            None,
            payload,
        )
    }

    #[test]
    fn status_change_maps_to_status_update() {
        let e = event(
            "t1",
            EventPayload::StatusChanged {
                from: OrderStatus::Pending,
                to: OrderStatus::Preparing,
            },
        );
        let msg = channel_message(&e, &snapshot("t1", 3, "s")).unwrap();
        assert_eq!(msg.kind, ChannelEventKind::StatusUpdate);
        assert_eq!(msg.order_id, 7);
        assert_eq!(msg.status, Some(OrderStatus::Preparing));
        assert_eq!(msg.table_id, Some(3));
        assert_eq!(msg.paid, Some(false));
    }

    #[test]
    fn item_status_carries_item_fields() {
        let e = event(
            "t1",
            EventPayload::ItemStatusChanged {
                item_id: 4,
                from: ItemStatus::Pending,
                to: ItemStatus::Ready,
            },
        );
        let msg = channel_message(&e, &snapshot("t1", 3, "s")).unwrap();
        assert_eq!(msg.kind, ChannelEventKind::ItemStatusUpdate);
        assert_eq!(msg.item_id, Some(4));
        assert_eq!(msg.item_status, Some(ItemStatus::Ready));
    }

    #[test]
    fn payment_bookkeeping_is_not_broadcast() {
        let e = event(
            "t1",
            EventPayload::PaymentStarted {
                intent_id: "pi".to_string(),
                amount: 1,
            },
        );
        assert!(channel_message(&e, &snapshot("t1", 3, "s")).is_none());
    }

    #[tokio::test]
    async fn tenant_isolation() {
        let hub = TenantHub::new();
        let mut rx_a = hub.subscribe("tenant-a");
        let mut rx_b = hub.subscribe("tenant-b");

        let e = event(
            "tenant-a",
            EventPayload::OrderCancelled {
                from: OrderStatus::Pending,
                reason: None,
            },
        );
        hub.publish(&e, &snapshot("tenant-a", 1, "s"));

        let got = rx_a.recv().await.unwrap();
        assert_eq!(got.message.kind, ChannelEventKind::StatusUpdate);
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn table_visibility_filter() {
        let hub_event = HubEvent {
            table_id: 3,
            session_token: "s1".to_string(),
            message: ChannelMessage::new(ChannelEventKind::NewOrder, 1, 0),
        };
        assert!(hub_event.visible_to_table(3, None));
        assert!(hub_event.visible_to_table(3, Some("s1")));
        assert!(!hub_event.visible_to_table(3, Some("s2")));
        assert!(!hub_event.visible_to_table(4, None));
    }

    #[test]
    fn release_drops_idle_tenants() {
        let hub = TenantHub::new();
        let rx = hub.subscribe("t-temp");
        hub.release("t-temp");
        assert_eq!(hub.subscriber_count("t-temp"), 1);

        drop(rx);
        hub.release("t-temp");
        assert_eq!(hub.subscriber_count("t-temp"), 0);
        assert!(hub.tenants.get("t-temp").is_none());
    }
}

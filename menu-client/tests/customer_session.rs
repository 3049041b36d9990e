// menu-client/tests/customer_session.rs
// 顾客会话集成测试: 购物车提交、缓存、支付

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use menu_client::{
    CacheStore, ChannelEvent, ChannelEventKind, ChannelMessage, ClientError, ClientResult,
    CustomerSession, JsonFileStore, MemoryStore, OrderApi, OrderSnapshot, OrderStatus,
    PaymentConfirmer, PaymentIntentResponse, ProductRef, SubmitOrderResponse, SubmitOutcome,
};
use parking_lot::Mutex;
use shared::order::{ItemStatus, OrderItem, PaymentInfo};
use shared::request::{
    AdjustQuantityRequest, CancelOrderRequest, ConfirmPaymentRequest, RemoveItemRequest,
    SubmitOrderRequest,
};

const TABLE: &str = "tbl-7";

fn burger() -> ProductRef {
    ProductRef {
        product_id: 1,
        name: "Burger".to_string(),
        unit_price: 1000,
    }
}

fn fries() -> ProductRef {
    ProductRef {
        product_id: 2,
        name: "Fries".to_string(),
        unit_price: 300,
    }
}

/// In-memory stand-in for the order server's customer API
#[derive(Default)]
struct FakeServer {
    orders: Mutex<Vec<OrderSnapshot>>,
    seen_commands: Mutex<HashMap<String, i64>>,
    fail_submits: AtomicUsize,
    fail_confirms: AtomicUsize,
    submit_calls: AtomicUsize,
    confirm_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl FakeServer {
    fn price(product_id: i64) -> (String, i64) {
        match product_id {
            1 => ("Burger".to_string(), 1000),
            _ => ("Fries".to_string(), 300),
        }
    }

    fn set_status(&self, order_id: i64, status: OrderStatus) {
        if let Some(o) = self.orders.lock().iter_mut().find(|o| o.order_id == order_id) {
            o.status = status;
        }
    }
}

#[async_trait]
impl OrderApi for FakeServer {
    async fn submit_order(
        &self,
        _table_token: &str,
        request: &SubmitOrderRequest,
    ) -> ClientResult<SubmitOrderResponse> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_submits.load(Ordering::SeqCst) > 0 {
            self.fail_submits.fetch_sub(1, Ordering::SeqCst);
            return Err(ClientError::Internal("gateway timeout".into()));
        }

        let mut orders = self.orders.lock();
        let command_id = request.command_id.clone().unwrap_or_default();
        if let Some(order_id) = self.seen_commands.lock().get(&command_id) {
            let order = orders.iter().find(|o| o.order_id == *order_id).cloned();
            return Ok(SubmitOrderResponse {
                status: SubmitOutcome::Merged,
                order: order.ok_or_else(|| ClientError::NotFound("order".into()))?,
            });
        }

        let open = orders
            .iter()
            .position(|o| o.session_token == request.session_token && o.is_open());
        let (status, order) = match open {
            Some(idx) => {
                let order = &mut orders[idx];
                for input in &request.items {
                    match order
                        .items
                        .iter_mut()
                        .find(|i| i.product_id == input.product_id && !i.is_removed())
                    {
                        Some(item) => item.quantity += input.quantity,
                        None => {
                            let (name, unit_price) = Self::price(input.product_id);
                            let id = order.items.len() as i64 + 1;
                            order.items.push(OrderItem {
                                id,
                                product_id: input.product_id,
                                name,
                                unit_price,
                                quantity: input.quantity,
                                status: ItemStatus::Pending,
                                note: None,
                                removal: None,
                            });
                        }
                    }
                }
                order.recalculate_total();
                (SubmitOutcome::Merged, order.clone())
            }
            None => {
                let order_id = orders.len() as i64 + 1;
                let mut order = OrderSnapshot::new(
                    order_id,
                    "bistro".to_string(),
                    7,
                    request.session_token.clone(),
                );
                for (idx, input) in request.items.iter().enumerate() {
                    let (name, unit_price) = Self::price(input.product_id);
                    order.items.push(OrderItem {
                        id: idx as i64 + 1,
                        product_id: input.product_id,
                        name,
                        unit_price,
                        quantity: input.quantity,
                        status: ItemStatus::Pending,
                        note: None,
                        removal: None,
                    });
                }
                order.recalculate_total();
                orders.push(order.clone());
                (SubmitOutcome::Created, order)
            }
        };
        self.seen_commands.lock().insert(command_id, order.order_id);
        Ok(SubmitOrderResponse { status, order })
    }

    async fn session_orders(
        &self,
        _table_token: &str,
        session_token: &str,
    ) -> ClientResult<Vec<OrderSnapshot>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .orders
            .lock()
            .iter()
            .filter(|o| o.session_token == session_token)
            .cloned()
            .collect())
    }

    async fn remove_item(
        &self,
        _table_token: &str,
        _order_id: i64,
        _item_id: i64,
        _request: &RemoveItemRequest,
    ) -> ClientResult<OrderSnapshot> {
        Err(ClientError::Internal("not used".into()))
    }

    async fn adjust_quantity(
        &self,
        _table_token: &str,
        _order_id: i64,
        _item_id: i64,
        _request: &AdjustQuantityRequest,
    ) -> ClientResult<OrderSnapshot> {
        Err(ClientError::Internal("not used".into()))
    }

    async fn cancel_order(
        &self,
        _table_token: &str,
        order_id: i64,
        _request: &CancelOrderRequest,
    ) -> ClientResult<OrderSnapshot> {
        self.set_status(order_id, OrderStatus::Cancelled);
        self.orders
            .lock()
            .iter()
            .find(|o| o.order_id == order_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("order {}", order_id)))
    }

    async fn create_payment_intent(
        &self,
        _table_token: &str,
        order_id: i64,
        _session_token: &str,
    ) -> ClientResult<PaymentIntentResponse> {
        let orders = self.orders.lock();
        let order = orders
            .iter()
            .find(|o| o.order_id == order_id)
            .ok_or_else(|| ClientError::NotFound(format!("order {}", order_id)))?;
        Ok(PaymentIntentResponse {
            intent_id: format!("pi_{}", order_id),
            client_secret: format!("pi_{}_secret", order_id),
            amount: order.total,
            currency: "eur".to_string(),
        })
    }

    async fn confirm_payment(
        &self,
        _table_token: &str,
        order_id: i64,
        request: &ConfirmPaymentRequest,
    ) -> ClientResult<OrderSnapshot> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_confirms.load(Ordering::SeqCst) > 0 {
            self.fail_confirms.fetch_sub(1, Ordering::SeqCst);
            return Err(ClientError::Internal("storage unavailable".into()));
        }
        let mut orders = self.orders.lock();
        let order = orders
            .iter_mut()
            .find(|o| o.order_id == order_id)
            .ok_or_else(|| ClientError::NotFound(format!("order {}", order_id)))?;
        if order.payment.is_none() {
            order.payment = Some(PaymentInfo {
                method: "card".to_string(),
                paid_at: 1_700_000_000_000,
                amount: order.total,
                intent_id: Some(request.intent_id.clone()),
            });
        }
        Ok(order.clone())
    }
}

struct Approve {
    seen: Mutex<Vec<i64>>,
}

#[async_trait]
impl PaymentConfirmer for Approve {
    async fn confirm(&self, intent: &PaymentIntentResponse) -> ClientResult<()> {
        self.seen.lock().push(intent.amount);
        Ok(())
    }
}

struct Decline;

#[async_trait]
impl PaymentConfirmer for Decline {
    async fn confirm(&self, _intent: &PaymentIntentResponse) -> ClientResult<()> {
        Err(ClientError::Provider("Your card was declined.".into()))
    }
}

/// Cache store whose writes can be made to fail, like a full disk
#[derive(Default)]
struct FailingStore {
    inner: MemoryStore,
    fail_saves: AtomicBool,
}

impl CacheStore for FailingStore {
    fn load(&self, table_token: &str) -> ClientResult<Option<menu_client::CachedTable>> {
        self.inner.load(table_token)
    }

    fn save(&self, table_token: &str, table: &menu_client::CachedTable) -> ClientResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ClientError::Internal("no space left on device".into()));
        }
        self.inner.save(table_token, table)
    }
}

fn session(server: &Arc<FakeServer>, store: Arc<dyn CacheStore>) -> CustomerSession {
    CustomerSession::resume(TABLE, "diner-1", server.clone(), store).unwrap()
}

#[tokio::test]
async fn test_submit_then_merge_replaces_projection() {
    let server = Arc::new(FakeServer::default());
    let mut session = session(&server, Arc::new(MemoryStore::new()));

    session.cart_mut().add(burger(), 1, None).unwrap();
    let created = session.submit(None).await.unwrap();
    assert_eq!(created.status, SubmitOutcome::Created);
    assert!(session.cart().is_empty());

    session.cart_mut().add(burger(), 1, None).unwrap();
    session.cart_mut().add(fries(), 1, None).unwrap();
    let merged = session.submit(None).await.unwrap();
    assert_eq!(merged.status, SubmitOutcome::Merged);

    assert_eq!(session.orders().len(), 1);
    let cached = &session.orders()[0];
    assert_eq!(cached.total, 2300);
    assert_eq!(cached.items.len(), 2);
}

#[tokio::test]
async fn test_failed_submit_keeps_cart_and_reuses_command_id() {
    let server = Arc::new(FakeServer::default());
    server.fail_submits.store(1, Ordering::SeqCst);
    let mut session = session(&server, Arc::new(MemoryStore::new()));

    session.cart_mut().add(burger(), 2, None).unwrap();
    assert!(session.submit(None).await.is_err());
    assert_eq!(session.cart().total_quantity(), 2);
    assert!(session.orders().is_empty());

    session.submit(None).await.unwrap();
    assert!(session.cart().is_empty());
    assert_eq!(server.seen_commands.lock().len(), 1);
    assert_eq!(server.submit_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_empty_cart_is_not_submitted() {
    let server = Arc::new(FakeServer::default());
    let mut session = session(&server, Arc::new(MemoryStore::new()));

    let err = session.submit(None).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(server.submit_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_pay_charges_server_total() {
    let server = Arc::new(FakeServer::default());
    let mut session = session(&server, Arc::new(MemoryStore::new()));
    session.cart_mut().add(burger(), 1, None).unwrap();
    let order_id = session.submit(None).await.unwrap().order.order_id;

    let confirmer = Approve {
        seen: Mutex::new(Vec::new()),
    };
    let paid = session.pay(order_id, &confirmer).await.unwrap();

    assert!(paid.is_paid());
    assert_eq!(*confirmer.seen.lock(), vec![1000]);
    assert!(session.cache().paid_flag());
}

#[tokio::test]
async fn test_declined_card_never_reaches_server_confirm() {
    let server = Arc::new(FakeServer::default());
    let mut session = session(&server, Arc::new(MemoryStore::new()));
    session.cart_mut().add(burger(), 1, None).unwrap();
    let order_id = session.submit(None).await.unwrap().order.order_id;

    let err = session.pay(order_id, &Decline).await.unwrap_err();
    assert!(matches!(err, ClientError::Provider(_)));
    assert_eq!(server.confirm_calls.load(Ordering::SeqCst), 0);
    assert!(!session.cache().paid_flag());
}

#[tokio::test]
async fn test_server_confirm_failure_is_desync_and_retriable() {
    let server = Arc::new(FakeServer::default());
    server.fail_confirms.store(1, Ordering::SeqCst);
    let mut session = session(&server, Arc::new(MemoryStore::new()));
    session.cart_mut().add(burger(), 1, None).unwrap();
    let order_id = session.submit(None).await.unwrap().order.order_id;

    let confirmer = Approve {
        seen: Mutex::new(Vec::new()),
    };
    let err = session.pay(order_id, &confirmer).await.unwrap_err();
    let (desync_order, intent_id) = match err {
        ClientError::ConfirmationDesync {
            order_id: Some(order_id),
            intent_id: Some(intent_id),
            ..
        } => (order_id, intent_id),
        other => panic!("expected desync, got {other:?}"),
    };
    assert_eq!(desync_order, order_id);

    let paid = session
        .retry_server_confirm(order_id, &intent_id)
        .await
        .unwrap();
    assert!(paid.is_paid());
    // Provider was asked to charge once
    assert_eq!(confirmer.seen.lock().len(), 1);
}

#[tokio::test]
async fn test_status_update_for_own_order_is_cached() {
    let server = Arc::new(FakeServer::default());
    let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new());
    let mut session = session(&server, store.clone());
    session.cart_mut().add(burger(), 1, None).unwrap();
    let order_id = session.submit(None).await.unwrap().order.order_id;

    let mut msg = ChannelMessage::new(ChannelEventKind::StatusUpdate, order_id, 10);
    msg.status = Some(OrderStatus::Preparing);
    session
        .handle_channel_event(&ChannelEvent::Message(msg))
        .await
        .unwrap();

    let persisted = store.load(TABLE).unwrap().unwrap();
    assert_eq!(persisted.orders[0].status, OrderStatus::Preparing);
    assert_eq!(server.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_reconnect_triggers_refetch() {
    let server = Arc::new(FakeServer::default());
    let mut session = session(&server, Arc::new(MemoryStore::new()));
    session.cart_mut().add(burger(), 1, None).unwrap();
    let order_id = session.submit(None).await.unwrap().order.order_id;

    // Missed while offline
    server.set_status(order_id, OrderStatus::Ready);

    session
        .handle_channel_event(&ChannelEvent::Connected { reconnected: false })
        .await
        .unwrap();
    assert_eq!(server.list_calls.load(Ordering::SeqCst), 0);

    session
        .handle_channel_event(&ChannelEvent::Connected { reconnected: true })
        .await
        .unwrap();
    assert_eq!(server.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.orders()[0].status, OrderStatus::Ready);
}

#[tokio::test]
async fn test_next_visit_does_not_show_settled_orders() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn CacheStore> = Arc::new(JsonFileStore::new(dir.path()));
    let server = Arc::new(FakeServer::default());

    {
        let mut visit = session(&server, store.clone());
        visit.cart_mut().add(burger(), 1, None).unwrap();
        let first = visit.submit(None).await.unwrap().order.order_id;
        visit
            .pay(
                first,
                &Approve {
                    seen: Mutex::new(Vec::new()),
                },
            )
            .await
            .unwrap();

        visit.cart_mut().add(fries(), 1, None).unwrap();
        let second = visit.submit(None).await.unwrap();
        assert_eq!(second.status, SubmitOutcome::Created);
        assert_eq!(visit.orders().len(), 2);
    }

    let next = session(&server, store);
    assert_eq!(next.orders().len(), 1);
    assert_eq!(next.orders()[0].total, 300);
}

#[tokio::test]
async fn test_accepted_submit_clears_cart_when_cache_write_fails() {
    let server = Arc::new(FakeServer::default());
    let store = Arc::new(FailingStore::default());
    let mut session = session(&server, store.clone());
    store.fail_saves.store(true, Ordering::SeqCst);

    session.cart_mut().add(burger(), 2, None).unwrap();
    let response = session.submit(None).await.unwrap();
    assert_eq!(response.status, SubmitOutcome::Created);
    assert!(session.cart().is_empty());

    // Nothing left to resend
    let err = session.submit(None).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    assert_eq!(server.submit_calls.load(Ordering::SeqCst), 1);
    assert_eq!(server.seen_commands.lock().len(), 1);
    assert_eq!(server.orders.lock()[0].items[0].quantity, 2);
}

#[tokio::test]
async fn test_confirmed_payment_is_not_desync_when_cache_write_fails() {
    let server = Arc::new(FakeServer::default());
    let store = Arc::new(FailingStore::default());
    let mut session = session(&server, store.clone());
    session.cart_mut().add(burger(), 1, None).unwrap();
    let order_id = session.submit(None).await.unwrap().order.order_id;
    store.fail_saves.store(true, Ordering::SeqCst);

    let confirmer = Approve {
        seen: Mutex::new(Vec::new()),
    };
    let paid = session.pay(order_id, &confirmer).await.unwrap();
    assert!(paid.is_paid());
    assert_eq!(server.confirm_calls.load(Ordering::SeqCst), 1);
    assert_eq!(confirmer.seen.lock().len(), 1);
}

#[tokio::test]
async fn test_other_diner_on_same_device_starts_clean() {
    let server = Arc::new(FakeServer::default());
    let store: Arc<dyn CacheStore> = Arc::new(MemoryStore::new());

    let mut first = session(&server, store.clone());
    first.cart_mut().add(burger(), 1, None).unwrap();
    first.submit(None).await.unwrap();
    assert_eq!(first.orders().len(), 1);

    let second = CustomerSession::resume(TABLE, "diner-2", server.clone(), store.clone()).unwrap();
    assert!(second.orders().is_empty());
    assert!(store.load(TABLE).unwrap().unwrap().orders.is_empty());
}

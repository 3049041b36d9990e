//! End-to-end order flow: submit, merge, staff status, pay, resubmit

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use order_server::message::TenantHub;
use order_server::orders::{OrderStorage, OrdersManager};
use order_server::payment::{
    CreateIntent, IntentStatus, PaymentController, PaymentError, PaymentProvider, ProviderError,
    ProviderIntent,
};
use order_server::services::{CatalogProduct, InMemoryCatalog};
use parking_lot::Mutex;
use shared::message::ChannelEventKind;
use shared::order::{
    Actor, CartItemInput, CommandResponse, OrderCommand, OrderCommandPayload, OrderStatus,
    SubmitOutcome,
};

const TENANT: &str = "bistro";
const SESSION: &str = "diner-1";
const TABLE: i64 = 7;
const BURGER: i64 = 1;
const FRIES: i64 = 2;

/// Provider double: intents succeed once `approve` is called
#[derive(Default)]
struct FakeProvider {
    intents: Mutex<HashMap<String, ProviderIntent>>,
}

impl FakeProvider {
    fn approve(&self, intent_id: &str) {
        if let Some(intent) = self.intents.lock().get_mut(intent_id) {
            intent.status = IntentStatus::Succeeded;
        }
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn create_intent(&self, request: CreateIntent) -> Result<ProviderIntent, ProviderError> {
        let mut intents = self.intents.lock();
        let id = format!("pi_test_{}", intents.len() + 1);
        let intent = ProviderIntent {
            id: id.clone(),
            client_secret: Some(format!("{id}_secret")),
            amount: request.amount,
            currency: request.currency,
            status: IntentStatus::RequiresPaymentMethod,
            metadata: request.metadata.to_pairs().into_iter().collect(),
        };
        intents.insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<ProviderIntent, ProviderError> {
        self.intents
            .lock()
            .get(intent_id)
            .cloned()
            .ok_or_else(|| ProviderError::Api(format!("No such payment_intent: '{intent_id}'")))
    }

    async fn cancel_intent(&self, intent_id: &str) -> Result<ProviderIntent, ProviderError> {
        let mut intents = self.intents.lock();
        let intent = intents
            .get_mut(intent_id)
            .ok_or_else(|| ProviderError::Api(format!("No such payment_intent: '{intent_id}'")))?;
        if intent.status == IntentStatus::Succeeded {
            return Err(ProviderError::Api("You cannot cancel this PaymentIntent".to_string()));
        }
        intent.status = IntentStatus::Canceled;
        Ok(intent.clone())
    }
}

fn catalog() -> InMemoryCatalog {
    let catalog = InMemoryCatalog::new();
    for (product_id, name, unit_price) in [(BURGER, "Burger", 1000), (FRIES, "Fries", 300)] {
        catalog.upsert(
            TENANT,
            CatalogProduct {
                product_id,
                name: name.to_string(),
                unit_price,
                is_active: true,
            },
        );
    }
    catalog
}

fn submit(manager: &OrdersManager, items: &[(i64, i32)]) -> CommandResponse {
    manager.execute_command(OrderCommand::new(
        TENANT,
        Actor::Customer {
            session_token: SESSION.to_string(),
        },
        OrderCommandPayload::SubmitItems {
            table_id: TABLE,
            items: items
                .iter()
                .map(|(product_id, quantity)| CartItemInput {
                    product_id: *product_id,
                    quantity: *quantity,
                    note: None,
                })
                .collect(),
            notes: None,
        },
    ))
}

fn staff() -> Actor {
    Actor::Staff {
        user_id: "chef".to_string(),
    }
}

#[tokio::test]
async fn test_dinner_from_first_order_to_payment() {
    let storage = OrderStorage::open_in_memory().unwrap();
    let manager = OrdersManager::new(storage, Arc::new(catalog()), TenantHub::new());
    let provider = Arc::new(FakeProvider::default());
    let payments = PaymentController::new(manager.clone(), Some(provider.clone()), "eur");
    let mut staff_channel = manager.subscribe(TENANT);

    // Burger x1 creates the order
    let created = submit(&manager, &[(BURGER, 1)]);
    assert!(created.success);
    assert_eq!(created.outcome, Some(SubmitOutcome::Created));
    let order = created.order.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total, 1000);
    assert_eq!(
        staff_channel.recv().await.unwrap().message.kind,
        ChannelEventKind::NewOrder
    );

    // Kitchen starts preparing
    let preparing = manager.execute_command(OrderCommand::new(
        TENANT,
        staff(),
        OrderCommandPayload::UpdateStatus {
            order_id: order.order_id,
            status: OrderStatus::Preparing,
        },
    ));
    assert!(preparing.success);
    let pushed = staff_channel.recv().await.unwrap().message;
    assert_eq!(pushed.kind, ChannelEventKind::StatusUpdate);
    assert_eq!(pushed.order_id, order.order_id);
    assert_eq!(pushed.status, Some(OrderStatus::Preparing));

    // Second round merges into the same order
    let merged = submit(&manager, &[(BURGER, 1), (FRIES, 1)]);
    assert_eq!(merged.outcome, Some(SubmitOutcome::Merged));
    let order = merged.order.unwrap();
    assert_eq!(order.total, 2300);
    let burger = order.active_items().find(|i| i.product_id == BURGER).unwrap();
    assert_eq!(burger.quantity, 2);
    assert_eq!(order.active_items().count(), 2);
    assert_eq!(order.status, OrderStatus::Preparing);

    // Pay through the provider
    let intent = payments
        .create_intent(TENANT, order.order_id, SESSION)
        .await
        .unwrap();
    assert_eq!(intent.amount, 2300);
    provider.approve(&intent.intent_id);

    let paid = payments
        .confirm(TENANT, order.order_id, SESSION, &intent.intent_id)
        .await
        .unwrap();
    assert!(paid.is_paid());
    assert_eq!(paid.status, OrderStatus::Preparing);
    let paid_at = paid.payment.as_ref().unwrap().paid_at;

    let again = payments
        .confirm(TENANT, order.order_id, SESSION, &intent.intent_id)
        .await
        .unwrap();
    assert_eq!(again.payment.unwrap().paid_at, paid_at);

    // A paid order takes no more items: the next round opens a new order
    let next = submit(&manager, &[(FRIES, 1)]);
    assert_eq!(next.outcome, Some(SubmitOutcome::Created));
    assert_ne!(next.order.unwrap().order_id, order.order_id);
}

#[tokio::test]
async fn test_removed_item_is_not_reactivated() {
    let storage = OrderStorage::open_in_memory().unwrap();
    let manager = OrdersManager::new(storage, Arc::new(catalog()), TenantHub::new());

    let order = submit(&manager, &[(BURGER, 2), (FRIES, 1)]).order.unwrap();
    let burger_id = order
        .items
        .iter()
        .find(|i| i.product_id == BURGER)
        .unwrap()
        .id;

    let removed = manager.execute_command(OrderCommand::new(
        TENANT,
        Actor::Customer {
            session_token: SESSION.to_string(),
        },
        OrderCommandPayload::RemoveItem {
            order_id: order.order_id,
            item_id: burger_id,
            reason: Some("changed mind".to_string()),
        },
    ));
    let order = removed.order.unwrap();
    assert_eq!(order.total, 300);

    let order = submit(&manager, &[(BURGER, 1)]).order.unwrap();
    let burgers: Vec<_> = order
        .items
        .iter()
        .filter(|i| i.product_id == BURGER)
        .collect();
    assert_eq!(burgers.len(), 2);
    assert!(burgers[0].is_removed());
    assert_eq!(burgers[0].quantity, 2);
    assert_eq!(burgers[1].quantity, 1);
    assert_eq!(order.total, 1300);
}

#[tokio::test]
async fn test_payment_without_provider_is_refused() {
    let storage = OrderStorage::open_in_memory().unwrap();
    let manager = OrdersManager::new(storage, Arc::new(catalog()), TenantHub::new());
    let payments = PaymentController::new(manager.clone(), None, "eur");

    let order = submit(&manager, &[(BURGER, 1)]).order.unwrap();
    let err = payments
        .create_intent(TENANT, order.order_id, SESSION)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::NotConfigured));
    assert!(
        manager
            .get_order(TENANT, order.order_id)
            .unwrap()
            .pending_payment
            .is_none()
    );
}

#[test]
fn test_orders_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("orders.redb");

    let order_id = {
        let manager =
            OrdersManager::open(&db_path, Arc::new(catalog()), TenantHub::new()).unwrap();
        submit(&manager, &[(BURGER, 1)]).order.unwrap().order_id
    };

    let manager = OrdersManager::open(&db_path, Arc::new(catalog()), TenantHub::new()).unwrap();
    let open = manager
        .find_open_order(TENANT, TABLE, SESSION)
        .unwrap()
        .unwrap();
    assert_eq!(open.order_id, order_id);
    assert_eq!(manager.rebuild_snapshot(order_id).unwrap(), open);

    let merged = submit(&manager, &[(BURGER, 2)]);
    assert_eq!(merged.outcome, Some(SubmitOutcome::Merged));
    assert_eq!(merged.order.unwrap().total, 3000);
}

//! Customer session
//!
//! Ties one diner's cart, cached orders and the order API together for a
//! table visit. The session token is generated once per visit and scopes
//! every submission and order mutation.

use std::sync::Arc;

use async_trait::async_trait;
use shared::order::{CartItemInput, OrderSnapshot};
use shared::request::{
    AdjustQuantityRequest, CancelOrderRequest, ConfirmPaymentRequest, RemoveItemRequest,
    SubmitOrderRequest,
};
use shared::response::{PaymentIntentResponse, SubmitOrderResponse};

use crate::cache::{CacheStore, CacheUpdate, OrderCache};
use crate::cart::Cart;
use crate::http::OrderApi;
use crate::message::ChannelEvent;
use crate::{ClientError, ClientResult};

/// Provider-side step of the payment flow (card form, wallet sheet, ...)
#[async_trait]
pub trait PaymentConfirmer: Send + Sync {
    /// Collect the instrument and confirm the intent with the provider.
    ///
    /// `Ok` only when the provider reports the payment succeeded; a decline
    /// is [`ClientError::Provider`].
    async fn confirm(&self, intent: &PaymentIntentResponse) -> ClientResult<()>;
}

/// Submission awaiting a successful response; retried with the same id
#[derive(Debug, Clone)]
struct PendingSubmit {
    command_id: String,
    items: Vec<CartItemInput>,
    notes: Option<String>,
}

pub struct CustomerSession {
    table_token: String,
    session_token: String,
    api: Arc<dyn OrderApi>,
    cart: Cart,
    cache: OrderCache,
    pending_submit: Option<PendingSubmit>,
}

impl std::fmt::Debug for CustomerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerSession")
            .field("table_token", &self.table_token)
            .field("cart", &self.cart.len())
            .field("cache", &self.cache)
            .finish()
    }
}

impl CustomerSession {
    /// Start a visit with a fresh session token
    pub fn start(
        table_token: impl Into<String>,
        api: Arc<dyn OrderApi>,
        store: Arc<dyn CacheStore>,
    ) -> ClientResult<Self> {
        Self::resume(table_token, uuid::Uuid::new_v4().to_string(), api, store)
    }

    /// Continue a visit with a known session token
    pub fn resume(
        table_token: impl Into<String>,
        session_token: impl Into<String>,
        api: Arc<dyn OrderApi>,
        store: Arc<dyn CacheStore>,
    ) -> ClientResult<Self> {
        let table_token = table_token.into();
        let session_token = session_token.into();
        let cache = OrderCache::load(table_token.clone(), session_token.clone(), store)?;
        Ok(Self {
            table_token,
            session_token,
            api,
            cart: Cart::new(),
            cache,
            pending_submit: None,
        })
    }

    pub fn table_token(&self) -> &str {
        &self.table_token
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    pub fn orders(&self) -> &[OrderSnapshot] {
        self.cache.orders()
    }

    pub fn cache(&self) -> &OrderCache {
        &self.cache
    }

    /// Submit the whole cart. The cart is cleared only on success.
    ///
    /// Once the server accepted the cart the submission is done: a failure to
    /// persist the local cache is logged and the next refresh repairs it.
    pub async fn submit(&mut self, notes: Option<String>) -> ClientResult<SubmitOrderResponse> {
        if self.cart.is_empty() {
            return Err(ClientError::Validation("cart is empty".to_string()));
        }

        let items = self.cart.to_submission();
        // Same cart after a failed attempt: reuse its id so the server dedups
        let pending = match self.pending_submit.take() {
            Some(p) if p.items == items && p.notes == notes => p,
            _ => PendingSubmit {
                command_id: uuid::Uuid::new_v4().to_string(),
                items,
                notes,
            },
        };

        let request = SubmitOrderRequest {
            session_token: self.session_token.clone(),
            items: pending.items.clone(),
            notes: pending.notes.clone(),
            command_id: Some(pending.command_id.clone()),
        };

        match self.api.submit_order(&self.table_token, &request).await {
            Ok(response) => {
                self.cart.clear();
                if let Err(e) = self.cache.apply_submission(&response) {
                    tracing::warn!(order_id = response.order.order_id, error = %e, "Submitted order not cached");
                }
                tracing::info!(
                    order_id = response.order.order_id,
                    status = ?response.status,
                    total = response.order.total,
                    "Cart submitted"
                );
                Ok(response)
            }
            Err(e) => {
                self.pending_submit = Some(pending);
                Err(e)
            }
        }
    }

    pub async fn remove_item(
        &mut self,
        order_id: i64,
        item_id: i64,
        reason: Option<String>,
    ) -> ClientResult<OrderSnapshot> {
        let request = RemoveItemRequest {
            session_token: Some(self.session_token.clone()),
            reason,
        };
        let order = self
            .api
            .remove_item(&self.table_token, order_id, item_id, &request)
            .await?;
        self.cache.upsert(order.clone())?;
        Ok(order)
    }

    pub async fn adjust_quantity(
        &mut self,
        order_id: i64,
        item_id: i64,
        quantity: i32,
    ) -> ClientResult<OrderSnapshot> {
        let request = AdjustQuantityRequest {
            session_token: self.session_token.clone(),
            quantity,
        };
        let order = self
            .api
            .adjust_quantity(&self.table_token, order_id, item_id, &request)
            .await?;
        self.cache.upsert(order.clone())?;
        Ok(order)
    }

    pub async fn cancel_order(
        &mut self,
        order_id: i64,
        reason: Option<String>,
    ) -> ClientResult<OrderSnapshot> {
        let request = CancelOrderRequest {
            session_token: self.session_token.clone(),
            reason,
        };
        let order = self
            .api
            .cancel_order(&self.table_token, order_id, &request)
            .await?;
        self.cache.remove(order_id)?;
        Ok(order)
    }

    /// Pay an order: create intent, confirm with the provider, confirm server-side.
    ///
    /// A server-side failure after the provider succeeded is returned as
    /// [`ClientError::ConfirmationDesync`]; recover with
    /// [`retry_server_confirm`](Self::retry_server_confirm), never by paying again.
    pub async fn pay(
        &mut self,
        order_id: i64,
        confirmer: &dyn PaymentConfirmer,
    ) -> ClientResult<OrderSnapshot> {
        let intent = self
            .api
            .create_payment_intent(&self.table_token, order_id, &self.session_token)
            .await?;
        tracing::info!(order_id, intent_id = %intent.intent_id, amount = intent.amount, "Payment intent created");

        confirmer.confirm(&intent).await?;

        match self.server_confirm(order_id, &intent.intent_id).await {
            Ok(order) => Ok(order),
            Err(e) if e.is_desync() => Err(e),
            Err(e) => {
                tracing::error!(order_id, intent_id = %intent.intent_id, error = %e, "Provider charged but server confirmation failed");
                Err(ClientError::ConfirmationDesync {
                    order_id: Some(order_id),
                    intent_id: Some(intent.intent_id),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Repeat only the idempotent server-side confirmation
    pub async fn retry_server_confirm(
        &mut self,
        order_id: i64,
        intent_id: &str,
    ) -> ClientResult<OrderSnapshot> {
        self.server_confirm(order_id, intent_id).await
    }

    async fn server_confirm(&mut self, order_id: i64, intent_id: &str) -> ClientResult<OrderSnapshot> {
        let request = ConfirmPaymentRequest {
            session_token: self.session_token.clone(),
            intent_id: intent_id.to_string(),
        };
        let order = self
            .api
            .confirm_payment(&self.table_token, order_id, &request)
            .await?;
        // The server has the payment; local cache trouble is not a desync
        if let Err(e) = self
            .cache
            .upsert(order.clone())
            .and_then(|_| self.cache.set_paid_flag(true))
        {
            tracing::warn!(order_id, intent_id, error = %e, "Confirmed payment not cached");
        }
        tracing::info!(order_id, intent_id, "Payment confirmed");
        Ok(order)
    }

    /// Re-fetch the session's orders, replacing the cached projection
    pub async fn refresh(&mut self) -> ClientResult<()> {
        let orders = self
            .api
            .session_orders(&self.table_token, &self.session_token)
            .await?;
        self.cache.replace_with(orders)
    }

    /// Apply a channel event; re-fetches after reconnects and stale updates
    pub async fn handle_channel_event(&mut self, event: &ChannelEvent) -> ClientResult<()> {
        match event {
            ChannelEvent::Connected { reconnected: true } => self.refresh().await,
            ChannelEvent::Message(msg) if msg.kind == shared::ChannelEventKind::Resync => {
                self.refresh().await
            }
            ChannelEvent::Message(msg) => match self.cache.apply_message(msg)? {
                CacheUpdate::Stale => self.refresh().await,
                CacheUpdate::Applied | CacheUpdate::Ignored => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

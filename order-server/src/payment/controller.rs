//! PaymentController - orchestrates intent creation and confirmation
//!
//! Only [`PaymentController::confirm`], [`PaymentController::reconcile`] and
//! the staff settlement path ever issue `MarkPaid`. Provider calls are never
//! retried here; only the idempotent server-side bookkeeping is.
//!
//! Each tenant may use its own provider account and currency
//! ([`TenantPayment`]); otherwise the server-wide ones apply.

use std::sync::Arc;

use dashmap::DashMap;

use shared::order::{
    Actor, CommandResponse, OrderCommand, OrderCommandPayload, OrderSnapshot, OrderStatus,
};
use shared::response::{PaymentIntentResponse, ReconcileResponse};

use super::error::{PaymentError, PaymentResult};
use super::provider::{CreateIntent, IntentMetadata, IntentStatus, PaymentProvider, ProviderIntent};
use super::tenant::TenantPayment;
use crate::auth::StaffUser;
use crate::audit_log;
use crate::orders::OrdersManager;

/// Method recorded for provider-settled payments
pub const CARD_METHOD: &str = "card";

#[derive(Clone)]
pub struct PaymentController {
    manager: OrdersManager,
    provider: Option<Arc<dyn PaymentProvider>>,
    currency: String,
    tenants: Arc<DashMap<String, TenantPayment>>,
}

impl std::fmt::Debug for PaymentController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentController")
            .field("configured", &self.provider.is_some())
            .field("currency", &self.currency)
            .field("tenant_accounts", &self.tenants.len())
            .finish()
    }
}

impl PaymentController {
    pub fn new(
        manager: OrdersManager,
        provider: Option<Arc<dyn PaymentProvider>>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            provider,
            currency: currency.into(),
            tenants: Arc::new(DashMap::new()),
        }
    }

    /// Register a tenant's own provider account and/or currency
    pub fn set_tenant_payment(&self, tenant_id: &str, payment: TenantPayment) {
        self.tenants.insert(tenant_id.to_string(), payment);
    }

    /// Whether any tenant can take provider payments
    pub fn is_configured(&self) -> bool {
        self.provider.is_some() || self.tenants.iter().any(|t| t.provider.is_some())
    }

    pub fn is_configured_for(&self, tenant_id: &str) -> bool {
        self.provider(tenant_id).is_ok()
    }

    fn provider(&self, tenant_id: &str) -> PaymentResult<Arc<dyn PaymentProvider>> {
        self.tenants
            .get(tenant_id)
            .and_then(|t| t.provider.clone())
            .or_else(|| self.provider.clone())
            .ok_or(PaymentError::NotConfigured)
    }

    pub fn currency_for(&self, tenant_id: &str) -> String {
        self.tenants
            .get(tenant_id)
            .and_then(|t| t.currency.clone())
            .unwrap_or_else(|| self.currency.clone())
    }

    fn load_for_session(
        &self,
        tenant_id: &str,
        order_id: i64,
        session_token: &str,
    ) -> PaymentResult<OrderSnapshot> {
        let order = self.manager.get_order(tenant_id, order_id)?;
        if order.session_token != session_token {
            return Err(PaymentError::Unauthorized(format!(
                "order {} belongs to another session",
                order_id
            )));
        }
        Ok(order)
    }

    /// Run a bookkeeping command and return the order afterwards
    fn run(
        &self,
        tenant_id: &str,
        actor: Actor,
        payload: OrderCommandPayload,
        command_id: Option<String>,
    ) -> PaymentResult<OrderSnapshot> {
        let order_id = payload.order_id();
        let mut cmd = OrderCommand::new(tenant_id, actor, payload);
        if let Some(id) = command_id {
            cmd = cmd.with_command_id(id);
        }
        match self.manager.execute_command(cmd) {
            CommandResponse {
                success: true,
                order: Some(order),
                ..
            } => Ok(order),
            CommandResponse {
                success: true,
                order: None,
                ..
            } => {
                // Duplicate of an already committed command
                let id = order_id.ok_or_else(|| {
                    PaymentError::InvalidTransition("command has no target order".to_string())
                })?;
                Ok(self.manager.get_order(tenant_id, id)?)
            }
            CommandResponse { error, .. } => Err(match error {
                Some(err) => PaymentError::Rejected(err),
                None => PaymentError::InvalidTransition("command rejected".to_string()),
            }),
        }
    }

    /// Deterministic so a retried confirmation cannot record twice
    fn mark_paid_command_id(order_id: i64, intent_id: &str) -> String {
        format!("mark-paid:{}:{}", order_id, intent_id)
    }

    /// Step 1: create a provider intent for the order's current total
    pub async fn create_intent(
        &self,
        tenant_id: &str,
        order_id: i64,
        session_token: &str,
    ) -> PaymentResult<PaymentIntentResponse> {
        let order = self.load_for_session(tenant_id, order_id, session_token)?;
        if order.is_paid() {
            return Err(PaymentError::AlreadyPaid(order_id));
        }
        if order.status == OrderStatus::Cancelled {
            return Err(PaymentError::InvalidTransition(format!(
                "order {} is cancelled",
                order_id
            )));
        }
        if order.total <= 0 {
            return Err(PaymentError::InvalidAmount(order.total));
        }
        let provider = self.provider(tenant_id)?;
        let currency = self.currency_for(tenant_id);

        let intent = provider
            .create_intent(CreateIntent {
                amount: order.total,
                currency: currency.clone(),
                metadata: IntentMetadata {
                    order_id,
                    table_id: order.table_id,
                    tenant_id: tenant_id.to_string(),
                },
                idempotency_key: format!(
                    "{}-{}-{}",
                    tenant_id, order_id, order.last_sequence
                ),
            })
            .await?;
        let client_secret = intent
            .client_secret
            .clone()
            .ok_or_else(|| PaymentError::Provider("intent has no client secret".to_string()))?;

        self.run(
            tenant_id,
            Actor::Payment,
            OrderCommandPayload::BeginPayment {
                order_id,
                intent_id: intent.id.clone(),
                amount: order.total,
            },
            None,
        )
        .inspect_err(|e| {
            tracing::warn!(order_id, intent_id = %intent.id, error = %e, "Intent created but not recorded");
        })?;

        tracing::info!(order_id, intent_id = %intent.id, amount = order.total, "Payment intent created");
        Ok(PaymentIntentResponse {
            intent_id: intent.id,
            client_secret,
            amount: order.total,
            currency,
        })
    }

    /// Step 2: server-side confirmation after the provider reported success
    ///
    /// Idempotent: confirming an order already paid with the same intent
    /// returns it unchanged.
    pub async fn confirm(
        &self,
        tenant_id: &str,
        order_id: i64,
        session_token: &str,
        intent_id: &str,
    ) -> PaymentResult<OrderSnapshot> {
        let order = self.load_for_session(tenant_id, order_id, session_token)?;
        if let Some(payment) = &order.payment {
            if payment.intent_id.as_deref() == Some(intent_id) {
                tracing::debug!(order_id, intent_id, "Payment already confirmed");
                return Ok(order);
            }
            return Err(PaymentError::AlreadyPaid(order_id));
        }
        if order.status == OrderStatus::Cancelled {
            return Err(PaymentError::InvalidTransition(format!(
                "order {} is cancelled",
                order_id
            )));
        }

        let intent = self.provider(tenant_id)?.retrieve_intent(intent_id).await?;
        if !intent.is_bound_to(tenant_id, order_id) {
            tracing::warn!(target: "security", order_id, intent_id, "Intent bound to another order");
            return Err(PaymentError::IntentMismatch(intent_id.to_string()));
        }
        if intent.status != IntentStatus::Succeeded {
            return Err(PaymentError::Provider(format!(
                "payment not completed: {}",
                intent.status
            )));
        }

        self.settle(tenant_id, &order, &intent)
    }

    /// Record a provider-succeeded intent; any failure from here on is a desync
    fn settle(
        &self,
        tenant_id: &str,
        order: &OrderSnapshot,
        intent: &ProviderIntent,
    ) -> PaymentResult<OrderSnapshot> {
        let order_id = order.order_id;
        let desync = |reason: String| {
            tracing::error!(
                target: "audit",
                order_id,
                intent_id = %intent.id,
                charged = intent.amount,
                total = order.total,
                reason = %reason,
                "Payment charged but order not marked paid"
            );
            PaymentError::ConfirmationDesync {
                order_id,
                intent_id: intent.id.clone(),
                reason,
            }
        };

        if intent.amount < order.total {
            return Err(desync(format!(
                "charged {} but order total is {}",
                intent.amount, order.total
            )));
        }

        let result = self.run(
            tenant_id,
            Actor::Payment,
            OrderCommandPayload::MarkPaid {
                order_id,
                method: CARD_METHOD.to_string(),
                intent_id: Some(intent.id.clone()),
            },
            Some(Self::mark_paid_command_id(order_id, &intent.id)),
        );

        match result {
            Ok(paid) => {
                audit_log!(
                    "payment",
                    "order_paid",
                    order_id.to_string().as_str(),
                    intent.id.as_str()
                );
                Ok(paid)
            }
            Err(err) => {
                // A concurrent confirmation may have won the race
                if let Ok(current) = self.manager.get_order(tenant_id, order_id)
                    && current
                        .payment
                        .as_ref()
                        .is_some_and(|p| p.intent_id.as_deref() == Some(intent.id.as_str()))
                {
                    return Ok(current);
                }
                Err(desync(err.to_string()))
            }
        }
    }

    /// Re-query the provider for an order stuck with a pending intent
    pub async fn reconcile(
        &self,
        tenant_id: &str,
        order_id: i64,
    ) -> PaymentResult<ReconcileResponse> {
        let order = self.manager.get_order(tenant_id, order_id)?;
        let Some(pending) = order.pending_payment.clone() else {
            return Ok(ReconcileResponse {
                provider_status: None,
                order,
            });
        };

        let intent = self
            .provider(tenant_id)?
            .retrieve_intent(&pending.intent_id)
            .await?;
        let order = match intent.status {
            IntentStatus::Succeeded => self.settle(tenant_id, &order, &intent)?,
            IntentStatus::Canceled => self.run(
                tenant_id,
                Actor::Payment,
                OrderCommandPayload::AbandonPayment {
                    order_id,
                    intent_id: pending.intent_id.clone(),
                },
                None,
            )?,
            _ => order,
        };

        tracing::info!(order_id, intent_id = %pending.intent_id, provider_status = %intent.status, "Payment reconciled");
        Ok(ReconcileResponse {
            provider_status: Some(intent.status.to_string()),
            order,
        })
    }

    /// Make a pending intent uncollectable before staff override it.
    ///
    /// Returns the settled order when the provider reports the intent was
    /// paid after all.
    async fn release_intent(
        &self,
        tenant_id: &str,
        order: &OrderSnapshot,
        intent_id: &str,
    ) -> PaymentResult<Option<OrderSnapshot>> {
        let order_id = order.order_id;
        let Ok(provider) = self.provider(tenant_id) else {
            tracing::warn!(order_id, intent_id, "No provider account, abandoning intent locally");
            return Ok(None);
        };

        let intent = provider.retrieve_intent(intent_id).await?;
        match intent.status {
            IntentStatus::Succeeded => self.settle(tenant_id, order, &intent).map(Some),
            IntentStatus::Canceled => Ok(None),
            IntentStatus::Processing | IntentStatus::RequiresCapture => {
                Err(PaymentError::InProgress(order_id))
            }
            _ => {
                let canceled = provider.cancel_intent(intent_id).await?;
                if canceled.status != IntentStatus::Canceled {
                    return Err(PaymentError::Provider(format!(
                        "intent {} could not be canceled: {}",
                        intent_id, canceled.status
                    )));
                }
                tracing::info!(order_id, intent_id, "Pending intent canceled with provider");
                Ok(None)
            }
        }
    }

    /// Staff release of a stuck intent, so the order can be completed,
    /// cancelled or paid again
    pub async fn abandon_payment(
        &self,
        tenant_id: &str,
        order_id: i64,
        staff: &StaffUser,
    ) -> PaymentResult<OrderSnapshot> {
        let order = self.manager.get_order(tenant_id, order_id)?;
        let Some(pending) = order.pending_payment.clone() else {
            return Ok(order);
        };
        if self
            .release_intent(tenant_id, &order, &pending.intent_id)
            .await?
            .is_some()
        {
            return Err(PaymentError::AlreadyPaid(order_id));
        }

        let order = self.run(
            tenant_id,
            Actor::Payment,
            OrderCommandPayload::AbandonPayment {
                order_id,
                intent_id: pending.intent_id.clone(),
            },
            None,
        )?;
        audit_log!(
            staff.id.as_str(),
            "payment_abandoned",
            order_id.to_string().as_str(),
            pending.intent_id.as_str()
        );
        Ok(order)
    }

    /// Manual settlement (cash, card terminal) without a provider intent.
    ///
    /// A pending intent is canceled with the provider first. If it was
    /// paid in the meantime the card payment is recorded instead and the
    /// call fails with [`PaymentError::AlreadyPaid`].
    pub async fn staff_mark_paid(
        &self,
        tenant_id: &str,
        order_id: i64,
        staff: &StaffUser,
        method: &str,
    ) -> PaymentResult<OrderSnapshot> {
        let method = method.trim();
        if method.is_empty() {
            return Err(PaymentError::Rejected(shared::order::CommandError::new(
                shared::error::ErrorCode::ValidationFailed,
                "payment method is required",
            )));
        }

        let current = self.manager.get_order(tenant_id, order_id)?;
        if let Some(pending) = &current.pending_payment
            && self
                .release_intent(tenant_id, &current, &pending.intent_id)
                .await?
                .is_some()
        {
            tracing::warn!(order_id, intent_id = %pending.intent_id, "Card payment landed before manual settlement");
            return Err(PaymentError::AlreadyPaid(order_id));
        }

        let order = self.run(
            tenant_id,
            staff.actor(),
            OrderCommandPayload::MarkPaid {
                order_id,
                method: method.to_string(),
                intent_id: None,
            },
            None,
        )?;
        audit_log!(
            staff.id.as_str(),
            "order_mark_paid",
            order_id.to_string().as_str(),
            method
        );
        Ok(order)
    }
}

//! Payment provider seam

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Provider-side lifecycle of an intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    Other(String),
}

impl IntentStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "requires_payment_method" => IntentStatus::RequiresPaymentMethod,
            "requires_confirmation" => IntentStatus::RequiresConfirmation,
            "requires_action" => IntentStatus::RequiresAction,
            "processing" => IntentStatus::Processing,
            "requires_capture" => IntentStatus::RequiresCapture,
            "canceled" => IntentStatus::Canceled,
            "succeeded" => IntentStatus::Succeeded,
            other => IntentStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            IntentStatus::RequiresPaymentMethod => "requires_payment_method",
            IntentStatus::RequiresConfirmation => "requires_confirmation",
            IntentStatus::RequiresAction => "requires_action",
            IntentStatus::Processing => "processing",
            IntentStatus::RequiresCapture => "requires_capture",
            IntentStatus::Canceled => "canceled",
            IntentStatus::Succeeded => "succeeded",
            IntentStatus::Other(s) => s,
        }
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order binding stored on the intent, checked again at confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentMetadata {
    pub order_id: i64,
    pub table_id: i64,
    pub tenant_id: String,
}

impl IntentMetadata {
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("order_id".to_string(), self.order_id.to_string()),
            ("table_id".to_string(), self.table_id.to_string()),
            ("tenant_id".to_string(), self.tenant_id.clone()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct CreateIntent {
    /// Minor units
    pub amount: i64,
    pub currency: String,
    pub metadata: IntentMetadata,
    /// Forwarded so a retried create does not open a second intent
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: IntentStatus,
    pub metadata: HashMap<String, String>,
}

impl ProviderIntent {
    /// Whether the intent was created for this order of this tenant
    pub fn is_bound_to(&self, tenant_id: &str, order_id: i64) -> bool {
        let order_ok = self
            .metadata
            .get("order_id")
            .is_some_and(|v| v == &order_id.to_string());
        let tenant_ok = self
            .metadata
            .get("tenant_id")
            .is_some_and(|v| v == tenant_id);
        order_ok && tenant_ok
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Api(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Server-side half of a payment provider integration
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_intent(&self, request: CreateIntent) -> Result<ProviderIntent, ProviderError>;

    async fn retrieve_intent(&self, intent_id: &str) -> Result<ProviderIntent, ProviderError>;

    /// Cancel an intent so it can no longer be charged
    async fn cancel_intent(&self, intent_id: &str) -> Result<ProviderIntent, ProviderError>;
}

//! Response bodies for the order HTTP API

use crate::order::{OrderSnapshot, SubmitOutcome};
use serde::{Deserialize, Serialize};

/// Result of a cart submission
///
/// `created` tells the client to replace its projection, `merged` that the
/// returned order supersedes the cached one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOrderResponse {
    pub status: SubmitOutcome,
    pub order: OrderSnapshot,
}

/// Payment intent handed to the provider's client library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentResponse {
    pub intent_id: String,
    pub client_secret: String,
    /// Authoritative server-computed amount (minor units)
    pub amount: i64,
    pub currency: String,
}

/// Outcome of a provider status re-query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileResponse {
    /// Provider-side intent status, when an intent was pending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<String>,
    pub order: OrderSnapshot,
}

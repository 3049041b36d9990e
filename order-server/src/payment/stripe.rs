//! Stripe PaymentIntents via REST API (no SDK dependency)

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use super::provider::{CreateIntent, IntentStatus, PaymentProvider, ProviderError, ProviderIntent};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

pub struct StripeProvider {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl std::fmt::Debug for StripeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeProvider")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl StripeProvider {
    pub fn new(
        secret_key: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn intents_url(&self) -> String {
        format!("{}/v1/payment_intents", self.api_base)
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    async fn create_intent(&self, request: CreateIntent) -> Result<ProviderIntent, ProviderError> {
        let mut params: Vec<(String, String)> = vec![
            ("amount".to_string(), request.amount.to_string()),
            ("currency".to_string(), request.currency.clone()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        params.extend(
            request
                .metadata
                .to_pairs()
                .into_iter()
                .map(|(k, v)| (format!("metadata[{k}]"), v)),
        );

        let resp: Value = self
            .client
            .post(self.intents_url())
            .basic_auth(&self.secret_key, None::<&str>)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&params)
            .send()
            .await?
            .json()
            .await?;

        parse_intent(&resp)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<ProviderIntent, ProviderError> {
        let resp: Value = self
            .client
            .get(format!("{}/{}", self.intents_url(), intent_id))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?
            .json()
            .await?;

        parse_intent(&resp)
    }

    async fn cancel_intent(&self, intent_id: &str) -> Result<ProviderIntent, ProviderError> {
        let resp: Value = self
            .client
            .post(format!("{}/{}/cancel", self.intents_url(), intent_id))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[("cancellation_reason", "abandoned")])
            .send()
            .await?
            .json()
            .await?;

        parse_intent(&resp)
    }
}

/// Decode a PaymentIntent object or a Stripe error body
fn parse_intent(resp: &Value) -> Result<ProviderIntent, ProviderError> {
    if let Some(message) = resp["error"]["message"].as_str() {
        return Err(ProviderError::Api(message.to_string()));
    }

    let id = resp["id"]
        .as_str()
        .ok_or_else(|| ProviderError::Decode(format!("missing intent id: {resp}")))?;
    let amount = resp["amount"]
        .as_i64()
        .ok_or_else(|| ProviderError::Decode(format!("missing amount on {id}")))?;
    let status = resp["status"]
        .as_str()
        .map(IntentStatus::parse)
        .ok_or_else(|| ProviderError::Decode(format!("missing status on {id}")))?;

    let metadata: HashMap<String, String> = resp["metadata"]
        .as_object()
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Ok(ProviderIntent {
        id: id.to_string(),
        client_secret: resp["client_secret"].as_str().map(String::from),
        amount,
        currency: resp["currency"].as_str().unwrap_or_default().to_string(),
        status,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_intent_object() {
        let body = json!({
            "id": "pi_3Nx",
            "object": "payment_intent",
            "amount": 2300,
            "currency": "eur",
            "status": "requires_payment_method",
            "client_secret": "pi_3Nx_secret_abc",
            "metadata": { "order_id": "12", "tenant_id": "tenant-1", "table_id": "4" }
        });
        let intent = parse_intent(&body).unwrap();
        assert_eq!(intent.id, "pi_3Nx");
        assert_eq!(intent.amount, 2300);
        assert_eq!(intent.status, IntentStatus::RequiresPaymentMethod);
        assert_eq!(intent.client_secret.as_deref(), Some("pi_3Nx_secret_abc"));
        assert!(intent.is_bound_to("tenant-1", 12));
    }

    #[test]
    fn test_parse_error_body() {
        let body = json!({
            "error": { "type": "card_error", "message": "Your card was declined." }
        });
        let err = parse_intent(&body).unwrap_err();
        assert_eq!(err.to_string(), "Your card was declined.");
    }

    #[test]
    fn test_parse_rejects_incomplete_object() {
        let err = parse_intent(&json!({ "id": "pi_1", "status": "succeeded" })).unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[test]
    fn test_api_base_trailing_slash() {
        let provider =
            StripeProvider::new("sk_test", "http://localhost:12111/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            provider.intents_url(),
            "http://localhost:12111/v1/payment_intents"
        );
    }
}

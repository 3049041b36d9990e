//! HTTP client for the order server API

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::error::ApiResponse;
use shared::order::{ItemStatus, OrderEvent, OrderSnapshot, OrderStatus};
use shared::request::{
    AdjustQuantityRequest, CancelOrderRequest, ConfirmPaymentRequest, MarkPaidRequest,
    RemoveItemRequest, SessionRequest, SubmitOrderRequest, UpdateItemStatusRequest,
    UpdateStatusRequest,
};
use shared::response::{PaymentIntentResponse, ReconcileResponse, SubmitOrderResponse};

use crate::{ClientConfig, ClientError, ClientResult};

/// Customer-side order operations, addressed by table token
#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn submit_order(
        &self,
        table_token: &str,
        request: &SubmitOrderRequest,
    ) -> ClientResult<SubmitOrderResponse>;

    async fn session_orders(
        &self,
        table_token: &str,
        session_token: &str,
    ) -> ClientResult<Vec<OrderSnapshot>>;

    async fn remove_item(
        &self,
        table_token: &str,
        order_id: i64,
        item_id: i64,
        request: &RemoveItemRequest,
    ) -> ClientResult<OrderSnapshot>;

    async fn adjust_quantity(
        &self,
        table_token: &str,
        order_id: i64,
        item_id: i64,
        request: &AdjustQuantityRequest,
    ) -> ClientResult<OrderSnapshot>;

    async fn cancel_order(
        &self,
        table_token: &str,
        order_id: i64,
        request: &CancelOrderRequest,
    ) -> ClientResult<OrderSnapshot>;

    async fn create_payment_intent(
        &self,
        table_token: &str,
        order_id: i64,
        session_token: &str,
    ) -> ClientResult<PaymentIntentResponse>;

    async fn confirm_payment(
        &self,
        table_token: &str,
        order_id: i64,
        request: &ConfirmPaymentRequest,
    ) -> ClientResult<OrderSnapshot>;
}

/// HTTP client for making network requests to the order server
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        })
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the current token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(t) => request.bearer_auth(t),
            None => request,
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let request = self.with_auth(self.client.get(self.url(path)));
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let request = self.with_auth(self.client.post(self.url(path)).json(body));
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            return Err(error_from_body(status, &text));
        }

        response.json().await.map_err(Into::into)
    }

    // ========== Staff API ==========

    pub async fn list_orders(&self, include_closed: bool) -> ClientResult<Vec<OrderSnapshot>> {
        self.get(&format!("/api/orders?include_closed={}", include_closed))
            .await
    }

    pub async fn get_order(&self, order_id: i64) -> ClientResult<OrderSnapshot> {
        self.get(&format!("/api/orders/{}", order_id)).await
    }

    pub async fn order_events(&self, order_id: i64) -> ClientResult<Vec<OrderEvent>> {
        self.get(&format!("/api/orders/{}/events", order_id)).await
    }

    pub async fn update_status(
        &self,
        order_id: i64,
        status: OrderStatus,
    ) -> ClientResult<OrderSnapshot> {
        self.post(
            &format!("/api/orders/{}/status", order_id),
            &UpdateStatusRequest { status },
        )
        .await
    }

    pub async fn update_item_status(
        &self,
        order_id: i64,
        item_id: i64,
        status: ItemStatus,
    ) -> ClientResult<OrderSnapshot> {
        self.post(
            &format!("/api/orders/{}/items/{}/status", order_id, item_id),
            &UpdateItemStatusRequest { status },
        )
        .await
    }

    pub async fn staff_remove_item(
        &self,
        order_id: i64,
        item_id: i64,
        reason: Option<String>,
    ) -> ClientResult<OrderSnapshot> {
        self.post(
            &format!("/api/orders/{}/items/{}/remove", order_id, item_id),
            &RemoveItemRequest {
                session_token: None,
                reason,
            },
        )
        .await
    }

    /// Record an offline payment (cash, card terminal)
    pub async fn mark_paid(&self, order_id: i64, method: &str) -> ClientResult<OrderSnapshot> {
        self.post(
            &format!("/api/orders/{}/mark-paid", order_id),
            &MarkPaidRequest {
                method: method.to_string(),
            },
        )
        .await
    }

    /// Re-query a stuck payment intent with the provider
    pub async fn reconcile_payment(&self, order_id: i64) -> ClientResult<ReconcileResponse> {
        self.post(
            &format!("/api/orders/{}/reconcile-payment", order_id),
            &serde_json::json!({}),
        )
        .await
    }

    /// Cancel a stuck payment intent so the order can be closed or settled
    pub async fn abandon_payment(&self, order_id: i64) -> ClientResult<OrderSnapshot> {
        self.post(
            &format!("/api/orders/{}/abandon-payment", order_id),
            &serde_json::json!({}),
        )
        .await
    }
}

/// Map an error body to the client taxonomy by its `code` field
fn error_from_body(status: StatusCode, text: &str) -> ClientError {
    if let Ok(body) = serde_json::from_str::<ApiResponse<()>>(text) {
        if !body.is_success() {
            return body.to_error().into();
        }
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ClientError::Unauthorized(text.to_string())
        }
        StatusCode::NOT_FOUND => ClientError::NotFound(text.to_string()),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ClientError::Validation(text.to_string())
        }
        _ => ClientError::Internal(format!("{}: {}", status, text)),
    }
}

fn menu_path(table_token: &str, rest: &str) -> String {
    format!("/api/menu/{}/orders{}", table_token, rest)
}

#[async_trait]
impl OrderApi for HttpClient {
    async fn submit_order(
        &self,
        table_token: &str,
        request: &SubmitOrderRequest,
    ) -> ClientResult<SubmitOrderResponse> {
        self.post(&menu_path(table_token, ""), request).await
    }

    async fn session_orders(
        &self,
        table_token: &str,
        session_token: &str,
    ) -> ClientResult<Vec<OrderSnapshot>> {
        let request = self
            .client
            .get(self.url(&menu_path(table_token, "")))
            .query(&[("session", session_token)]);
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    async fn remove_item(
        &self,
        table_token: &str,
        order_id: i64,
        item_id: i64,
        request: &RemoveItemRequest,
    ) -> ClientResult<OrderSnapshot> {
        let path = format!("/{}/items/{}/remove", order_id, item_id);
        self.post(&menu_path(table_token, &path), request).await
    }

    async fn adjust_quantity(
        &self,
        table_token: &str,
        order_id: i64,
        item_id: i64,
        request: &AdjustQuantityRequest,
    ) -> ClientResult<OrderSnapshot> {
        let path = format!("/{}/items/{}/quantity", order_id, item_id);
        self.post(&menu_path(table_token, &path), request).await
    }

    async fn cancel_order(
        &self,
        table_token: &str,
        order_id: i64,
        request: &CancelOrderRequest,
    ) -> ClientResult<OrderSnapshot> {
        let path = format!("/{}/cancel", order_id);
        self.post(&menu_path(table_token, &path), request).await
    }

    async fn create_payment_intent(
        &self,
        table_token: &str,
        order_id: i64,
        session_token: &str,
    ) -> ClientResult<PaymentIntentResponse> {
        let path = format!("/{}/payment-intent", order_id);
        let body = SessionRequest {
            session_token: session_token.to_string(),
        };
        self.post(&menu_path(table_token, &path), &body).await
    }

    async fn confirm_payment(
        &self,
        table_token: &str,
        order_id: i64,
        request: &ConfirmPaymentRequest,
    ) -> ClientResult<OrderSnapshot> {
        let path = format!("/{}/confirm-payment", order_id);
        self.post(&menu_path(table_token, &path), request).await
    }
}

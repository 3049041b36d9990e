//! Client configuration

use std::time::Duration;

use crate::{ClientError, ClientResult};

/// Reconnect delay on the staff dashboard channel
pub const STAFF_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Reconnect delay on the customer table channel
pub const CUSTOMER_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Client configuration for connecting to the order server
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., "http://localhost:8080")
    pub base_url: String,

    /// Staff JWT
    pub token: Option<String>,

    /// Table token from the QR link (customer side)
    pub table_token: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Fixed delay before a channel reconnect attempt
    pub reconnect_delay: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            table_token: None,
            timeout: 30,
            reconnect_delay: CUSTOMER_RECONNECT_DELAY,
        }
    }

    /// Staff dashboard preset
    pub fn staff(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(base_url)
            .with_token(token)
            .with_reconnect_delay(STAFF_RECONNECT_DELAY)
    }

    /// Customer table preset
    pub fn customer(base_url: impl Into<String>, table_token: impl Into<String>) -> Self {
        Self::new(base_url)
            .with_table_token(table_token)
            .with_reconnect_delay(CUSTOMER_RECONNECT_DELAY)
    }

    /// Set the JWT token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_table_token(mut self, table_token: impl Into<String>) -> Self {
        self.table_token = Some(table_token.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Staff channel URL for a tenant
    pub fn staff_channel_url(&self, tenant_id: &str) -> ClientResult<String> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ClientError::Validation("staff channel requires a token".into()))?;
        let mut url = self.ws_base()?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Validation("base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["ws", "tenant", tenant_id]);
        url.query_pairs_mut().append_pair("token", token);
        Ok(url.into())
    }

    /// Customer channel URL, narrowed to one session when given
    pub fn table_channel_url(&self, session: Option<&str>) -> ClientResult<String> {
        let table_token = self.table_token.as_deref().ok_or_else(|| {
            ClientError::Validation("table channel requires a table token".into())
        })?;
        let mut url = self.ws_base()?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Validation("base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["ws", "table", table_token]);
        if let Some(session) = session {
            url.query_pairs_mut().append_pair("session", session);
        }
        Ok(url.into())
    }

    fn ws_base(&self) -> ClientResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ClientError::Validation(format!("invalid base URL: {}", e)))?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| ClientError::Validation("cannot derive websocket URL".into()))?;
        Ok(url)
    }

    /// Create an HTTP client from this configuration
    pub fn build_http_client(&self) -> ClientResult<super::HttpClient> {
        super::HttpClient::new(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

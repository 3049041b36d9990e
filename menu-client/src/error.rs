//! Client error types

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Order, item, product or table absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Session or staff identity does not own the resource
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Status precondition violated
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Order already paid: {0}")]
    AlreadyPaid(String),

    /// Payment provider failure; the whole payment flow may be retried
    #[error("Payment failed: {0}")]
    Provider(String),

    /// The provider charged but the order is not marked paid.
    ///
    /// Only the server-side confirmation may be retried; the charge itself
    /// must be verified manually.
    #[error("Payment received but not recorded, please ask staff to verify: {message}")]
    ConfirmationDesync {
        order_id: Option<i64>,
        intent_id: Option<String>,
        message: String,
    },

    /// Realtime channel failure
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Local cache store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    pub fn is_desync(&self) -> bool {
        matches!(self, ClientError::ConfirmationDesync { .. })
    }
}

impl From<AppError> for ClientError {
    fn from(err: AppError) -> Self {
        let message = err.message;
        match err.code {
            ErrorCode::NotFound
            | ErrorCode::OrderNotFound
            | ErrorCode::OrderItemNotFound
            | ErrorCode::ProductNotFound
            | ErrorCode::TableNotFound => ClientError::NotFound(message),
            ErrorCode::NotAuthenticated
            | ErrorCode::TokenExpired
            | ErrorCode::TokenInvalid
            | ErrorCode::PermissionDenied => ClientError::Unauthorized(message),
            ErrorCode::InvalidTransition
            | ErrorCode::OrderAlreadyCompleted
            | ErrorCode::OrderAlreadyCancelled
            | ErrorCode::PaymentInProgress => ClientError::InvalidTransition(message),
            ErrorCode::OrderAlreadyPaid => ClientError::AlreadyPaid(message),
            ErrorCode::PaymentProviderError
            | ErrorCode::PaymentInvalidAmount
            | ErrorCode::PaymentNotConfigured => ClientError::Provider(message),
            ErrorCode::PaymentConfirmationDesync => {
                let details = err.details.unwrap_or_default();
                ClientError::ConfirmationDesync {
                    order_id: details.get("order_id").and_then(|v| v.as_i64()),
                    intent_id: details
                        .get("intent_id")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                    message,
                }
            }
            ErrorCode::ValidationFailed | ErrorCode::InvalidRequest | ErrorCode::OrderEmpty => {
                ClientError::Validation(message)
            }
            ErrorCode::ChannelError => ClientError::Channel(message),
            _ => ClientError::Internal(message),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

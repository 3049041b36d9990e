use shared::error::{AppError, ErrorCode};
use shared::order::CommandError;
use thiserror::Error;

use super::provider::ProviderError;
use crate::orders::ManagerError;

/// Payment flow errors
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Order already paid: {0}")]
    AlreadyPaid(i64),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Order total {0} is not chargeable")]
    InvalidAmount(i64),

    #[error("Payment intent does not belong to this order: {0}")]
    IntentMismatch(String),

    #[error("Order {0} has a payment in progress")]
    InProgress(i64),

    #[error("Payment provider not configured")]
    NotConfigured,

    #[error("Payment provider error: {0}")]
    Provider(String),

    /// The provider charged the customer but the order is not marked paid
    #[error("Payment {intent_id} for order {order_id} was charged but not recorded: {reason}")]
    ConfirmationDesync {
        order_id: i64,
        intent_id: String,
        reason: String,
    },

    /// The order pipeline refused the bookkeeping command
    #[error("{}", .0.message)]
    Rejected(CommandError),
}

impl PaymentError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PaymentError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            PaymentError::Unauthorized(_) => ErrorCode::PermissionDenied,
            PaymentError::AlreadyPaid(_) => ErrorCode::OrderAlreadyPaid,
            PaymentError::InvalidTransition(_) => ErrorCode::InvalidTransition,
            PaymentError::InvalidAmount(_) => ErrorCode::PaymentInvalidAmount,
            PaymentError::IntentMismatch(_) => ErrorCode::ValidationFailed,
            PaymentError::InProgress(_) => ErrorCode::PaymentInProgress,
            PaymentError::NotConfigured => ErrorCode::PaymentNotConfigured,
            PaymentError::Provider(_) => ErrorCode::PaymentProviderError,
            PaymentError::ConfirmationDesync { .. } => ErrorCode::PaymentConfirmationDesync,
            PaymentError::Rejected(err) => err.code,
        }
    }
}

impl From<ProviderError> for PaymentError {
    fn from(err: ProviderError) -> Self {
        PaymentError::Provider(err.to_string())
    }
}

impl From<ManagerError> for PaymentError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::OrderNotFound(id) => PaymentError::OrderNotFound(id),
            other => PaymentError::Rejected(other.into()),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        let code = err.code();
        match &err {
            PaymentError::ConfirmationDesync {
                order_id,
                intent_id,
                ..
            } => {
                let (order_id, intent_id) = (*order_id, intent_id.clone());
                AppError::with_message(code, err.to_string())
                    .with_detail("order_id", order_id)
                    .with_detail("intent_id", intent_id)
            }
            PaymentError::Rejected(inner) => AppError::with_message(code, inner.message.clone()),
            _ => AppError::with_message(code, err.to_string()),
        }
    }
}

pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desync_is_distinct_from_provider_failure() {
        let desync = PaymentError::ConfirmationDesync {
            order_id: 7,
            intent_id: "pi_7".to_string(),
            reason: "storage unavailable".to_string(),
        };
        let provider = PaymentError::Provider("card declined".to_string());
        assert_ne!(desync.code(), provider.code());

        let app: AppError = desync.into();
        assert_eq!(app.code, ErrorCode::PaymentConfirmationDesync);
        let details = app.details.unwrap();
        assert_eq!(details.get("intent_id").unwrap(), "pi_7");
        assert_eq!(details.get("order_id").unwrap(), 7);
    }

    #[test]
    fn test_rejected_keeps_pipeline_code() {
        let err: PaymentError = ManagerError::PaymentInProgress(3).into();
        assert_eq!(err.code(), ErrorCode::PaymentInProgress);

        let missing: PaymentError = ManagerError::OrderNotFound(9).into();
        assert!(matches!(missing, PaymentError::OrderNotFound(9)));
    }
}

use super::super::storage::StorageError;
use super::super::traits::OrderError;
use shared::error::ErrorCode;
use shared::order::CommandError;
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Item not found: {0}")]
    ItemNotFound(i64),

    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Order {0} has a payment in progress")]
    PaymentInProgress(i64),

    #[error("Order already paid: {0}")]
    AlreadyPaid(i64),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ManagerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ManagerError::Storage(_) => ErrorCode::StorageError,
            ManagerError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            ManagerError::ItemNotFound(_) => ErrorCode::OrderItemNotFound,
            ManagerError::ProductNotFound(_) => ErrorCode::ProductNotFound,
            ManagerError::InvalidTransition(_) => ErrorCode::InvalidTransition,
            ManagerError::PaymentInProgress(_) => ErrorCode::PaymentInProgress,
            ManagerError::AlreadyPaid(_) => ErrorCode::OrderAlreadyPaid,
            ManagerError::Unauthorized(_) => ErrorCode::PermissionDenied,
            ManagerError::Validation(_) => ErrorCode::ValidationFailed,
            ManagerError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

impl From<ManagerError> for CommandError {
    fn from(err: ManagerError) -> Self {
        if let ManagerError::Storage(e) = &err {
            // 保留技术细节用于日志/调试
            tracing::error!(error = %e, "Storage error occurred");
        }
        CommandError::new(err.code(), err.to_string())
    }
}

impl From<ManagerError> for shared::error::AppError {
    fn from(err: ManagerError) -> Self {
        CommandError::from(err).into()
    }
}

impl From<OrderError> for ManagerError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::OrderNotFound(id) => ManagerError::OrderNotFound(id),
            OrderError::ItemNotFound(id) => ManagerError::ItemNotFound(id),
            OrderError::ProductNotFound(id) => ManagerError::ProductNotFound(id),
            OrderError::InvalidTransition(msg) => ManagerError::InvalidTransition(msg),
            OrderError::PaymentInProgress(id) => ManagerError::PaymentInProgress(id),
            OrderError::AlreadyPaid(id) => ManagerError::AlreadyPaid(id),
            OrderError::Unauthorized(msg) => ManagerError::Unauthorized(msg),
            OrderError::Validation(msg) => ManagerError::Validation(msg),
            OrderError::Storage(msg) => ManagerError::Internal(msg),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;

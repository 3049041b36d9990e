//! 类型转换模块
//!
//! 将命令结果 (CommandResponse) 转换为 API 响应

use shared::error::{AppError, AppResult, ErrorCode};
use shared::order::{CommandResponse, OrderSnapshot};

use crate::orders::OrdersManager;

/// Extract the resulting order from a command response
///
/// A duplicate command carries no snapshot; the current state of
/// `order_id` is returned instead.
pub fn order_from_response(
    response: CommandResponse,
    manager: &OrdersManager,
    tenant_id: &str,
    order_id: i64,
) -> AppResult<OrderSnapshot> {
    if !response.success {
        return Err(match response.error {
            Some(err) => err.into(),
            None => AppError::new(ErrorCode::Unknown),
        });
    }
    match response.order {
        Some(order) => Ok(order),
        None => Ok(manager.get_order(tenant_id, order_id)?),
    }
}

/// Reject blank session tokens before they reach the pipeline
pub fn require_session(session_token: &str) -> AppResult<&str> {
    let token = session_token.trim();
    if token.is_empty() {
        return Err(AppError::validation("session token is required"));
    }
    Ok(token)
}

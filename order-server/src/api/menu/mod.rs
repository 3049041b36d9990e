//! Customer API 模块
//!
//! 顾客通过桌台二维码 token 访问，匿名会话以 session token 标识。

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/menu/{table_token}", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::table_info))
        .route(
            "/orders",
            get(handler::list_session_orders).post(handler::submit),
        )
        .route(
            "/orders/{order_id}/items/{item_id}/remove",
            post(handler::remove_item),
        )
        .route(
            "/orders/{order_id}/items/{item_id}/quantity",
            post(handler::adjust_quantity),
        )
        .route("/orders/{order_id}/cancel", post(handler::cancel))
        .route(
            "/orders/{order_id}/payment-intent",
            post(handler::create_payment_intent),
        )
        .route(
            "/orders/{order_id}/confirm-payment",
            post(handler::confirm_payment),
        )
}

//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`menu`] - 顾客接口 (桌台二维码 token + session)
//! - [`orders`] - 员工订单管理接口 (JWT)
//! - [`ws`] - 实时推送 WebSocket

pub mod convert;

pub mod health;
pub mod menu;
pub mod orders;
pub mod ws;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        // Health API - public route
        .merge(health::router())
        // Customer API - table token + session
        .merge(menu::router())
        // Staff API - bearer token
        .merge(orders::router())
        // Realtime channels - credentials in query string
        .merge(ws::router())
}

/// Build a fully configured application with all middleware
pub fn build_app(state: &ServerState) -> Router<ServerState> {
    build_router()
        // Request timeout
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .timeout(state.config.request_timeout()),
        )
        // CORS - Handle cross-origin requests
        .layer(CorsLayer::permissive())
        // Trace - Request tracing (logs at INFO level)
        .layer(TraceLayer::new_for_http())
}

async fn handle_timeout(err: tower::BoxError) -> axum::response::Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::new(ErrorCode::TimeoutError).into_response()
    } else {
        AppError::internal(err.to_string()).into_response()
    }
}

//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /health | GET | 健康检查 | 无 |

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

/// 健康检查路由 - 公共路由 (无需认证)
pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Serialize)]
pub struct HealthResponse {
    /// 状态 (ok | error)
    status: &'static str,
    version: &'static str,
    environment: String,
    /// 已提交事件的全局序号
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence: Option<u64>,
    payments_enabled: bool,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let sequence = match state.manager.get_current_sequence() {
        Ok(seq) => Some(seq),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed to read storage");
            None
        }
    };
    Json(HealthResponse {
        status: if sequence.is_some() { "ok" } else { "error" },
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        sequence,
        payments_enabled: state.payments.is_configured(),
    })
}

//! Order Server - 多租户扫码点餐订单核心
//!
//! # 架构概述
//!
//! - **订单** (`orders`): 命令 → 事件 → 快照，redb 事件溯源存储
//! - **推送** (`message`): 按租户隔离的实时事件广播
//! - **支付** (`payment`): 两步支付意图流程，服务端确认
//! - **认证** (`auth`): 员工 JWT
//! - **HTTP API** (`api`): 顾客 / 员工接口与 WebSocket
//!
//! # 模块结构
//!
//! ```text
//! order-server/src/
//! ├── core/          # 配置、状态、启动
//! ├── auth/          # JWT 认证
//! ├── services/      # 产品目录、桌台、种子数据
//! ├── api/           # HTTP 路由和处理器
//! ├── utils/         # 日志
//! ├── message/       # 租户推送 hub
//! ├── orders/        # 订单事件溯源
//! └── payment/       # 支付流程控制
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod message;
pub mod orders;
pub mod payment;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use auth::{JwtService, StaffUser};
pub use core::{Config, Server, ServerState};
pub use message::TenantHub;
pub use orders::{OrderStorage, OrdersManager};
pub use payment::{PaymentController, PaymentError, PaymentProvider};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger};

pub fn print_banner() {
    println!(
        r#"
  ___          _           ___
 / _ \ _ _ __| |___ _ _  / __| ___ _ ___ _____ _ _
| (_) | '_/ _` / -_) '_| \__ \/ -_) '_\ V / -_) '_|
 \___/|_| \__,_\___|_|   |___/\___|_|  \_/\___|_|
    "#
    );
}

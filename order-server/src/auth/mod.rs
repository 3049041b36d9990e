//! 认证模块
//!
//! - [`JwtService`] - 员工 JWT 令牌校验（含 tenant_id 声明）
//! - [`StaffUser`] - 当前员工上下文，axum 提取器

pub mod extractor;
pub mod jwt;

pub use jwt::{Claims, DEV_JWT_SECRET, JwtConfig, JwtError, JwtService, StaffUser};

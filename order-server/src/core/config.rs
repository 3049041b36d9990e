use crate::auth::{DEV_JWT_SECRET, JwtConfig};
use crate::payment::DEFAULT_STRIPE_API_BASE;
use shared::order::{CancelBoundary, TenantPolicy};

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | HTTP_PORT | 8080 | HTTP 服务端口 |
/// | DATA_DIR | ./data | redb 数据目录 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 格式日志 |
/// | LOG_DIR | - | 日志文件目录 (未设置则只输出到控制台) |
/// | ENVIRONMENT | development | 运行环境 |
/// | JWT_SECRET | 开发密钥 | 员工令牌签名密钥 |
/// | STRIPE_SECRET_KEY | - | 未设置则拒绝创建支付意图 |
/// | STRIPE_API_BASE | https://api.stripe.com | 支付服务地址 |
/// | PAYMENT_CURRENCY | eur | 货币 |
/// | CUSTOMER_CANCEL_UNTIL | pending | 顾客可取消的最晚阶段 (pending/preparing) |
/// | REQUIRE_PAID_BEFORE_COMPLETE | false | 完成订单前必须已支付 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | SEED_FILE | - | 启动时加载的产品/桌台 JSON |
///
/// # 示例
///
/// ```ignore
/// DATA_DIR=/var/lib/orders HTTP_PORT=9000 cargo run -p order-server
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 数据目录，存放 orders.redb
    pub data_dir: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// JWT 认证配置
    pub jwt: JwtConfig,

    // === 支付 ===
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: String,
    pub payment_currency: String,

    // === 租户默认策略 ===
    pub customer_cancel_until: CancelBoundary,
    pub require_paid_before_complete: bool,

    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    pub seed_file: Option<String>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            http_port: env_parse("HTTP_PORT", 8080),
            data_dir: env_or("DATA_DIR", "./data"),
            log_level: env_or("LOG_LEVEL", "info"),
            log_json: env_parse("LOG_JSON", false),
            log_dir: env_opt("LOG_DIR"),
            environment: env_or("ENVIRONMENT", "development"),
            jwt: JwtConfig::from_env(),

            stripe_secret_key: env_opt("STRIPE_SECRET_KEY"),
            stripe_api_base: env_or("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE),
            payment_currency: env_or("PAYMENT_CURRENCY", "eur").to_ascii_lowercase(),

            customer_cancel_until: env_parse("CUSTOMER_CANCEL_UNTIL", CancelBoundary::Pending),
            require_paid_before_complete: env_parse("REQUIRE_PAID_BEFORE_COMPLETE", false),

            request_timeout_ms: env_parse("REQUEST_TIMEOUT_MS", 30000),
            seed_file: env_opt("SEED_FILE"),
        }
    }

    /// 使用自定义数据目录和端口 (测试场景)
    pub fn with_overrides(data_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.data_dir = data_dir.into();
        config.http_port = http_port;
        config
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// 启动前校验
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.is_production() && self.jwt.secret == DEV_JWT_SECRET {
            anyhow::bail!("JWT_SECRET must be set in production");
        }
        if self.payment_currency.len() != 3 {
            anyhow::bail!("PAYMENT_CURRENCY must be a 3-letter ISO code");
        }
        Ok(())
    }

    /// 默认租户策略
    pub fn policy(&self) -> TenantPolicy {
        TenantPolicy {
            customer_cancel_until: self.customer_cancel_until,
            require_paid_before_complete: self.require_paid_before_complete,
        }
    }

    pub fn db_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join("orders.redb")
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

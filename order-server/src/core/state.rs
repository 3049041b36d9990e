use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::JwtService;
use crate::core::Config;
use crate::message::TenantHub;
use crate::orders::{OrderStorage, OrdersManager};
use crate::payment::{PaymentController, PaymentProvider, StripeProvider, TenantPayment};
use crate::services::{InMemoryCatalog, InMemoryTableDirectory, SeedFile, TableDirectory};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 所有字段均为 Arc 或内部 Arc，克隆成本极低。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | manager | 订单命令处理 + 租户推送 |
/// | payments | 支付流程控制器 |
/// | tables | 桌台 token 解析 |
/// | jwt_service | 员工令牌校验 |
/// | shutdown | 关闭信号，WebSocket 会话据此发送 1000 关闭帧 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub manager: OrdersManager,
    pub payments: PaymentController,
    pub tables: Arc<dyn TableDirectory>,
    pub jwt_service: JwtService,
    pub shutdown: CancellationToken,
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("environment", &self.config.environment)
            .field("manager", &self.manager)
            .field("payments", &self.payments)
            .finish()
    }
}

impl ServerState {
    pub fn new(
        config: Config,
        manager: OrdersManager,
        payments: PaymentController,
        tables: Arc<dyn TableDirectory>,
    ) -> Self {
        let jwt_service = JwtService::with_config(config.jwt.clone());
        Self {
            config,
            manager,
            payments,
            tables,
            jwt_service,
            shutdown: CancellationToken::new(),
        }
    }

    /// 初始化服务器状态
    ///
    /// 1. 创建数据目录并打开 redb
    /// 2. 加载种子文件 (产品 + 桌台)
    /// 3. 组装订单管理器与支付控制器
    pub fn initialize(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let catalog = InMemoryCatalog::new();
        let tables = InMemoryTableDirectory::new();
        let seed = match &config.seed_file {
            Some(path) => SeedFile::load(path)?,
            None => SeedFile::default(),
        };
        seed.apply(&catalog, &tables);

        let storage = OrderStorage::open(config.db_path())?;
        let manager = OrdersManager::new(storage, Arc::new(catalog), TenantHub::new())
            .with_default_policy(config.policy());

        let provider: Option<Arc<dyn PaymentProvider>> = match &config.stripe_secret_key {
            Some(key) => Some(Arc::new(StripeProvider::new(
                key.clone(),
                config.stripe_api_base.clone(),
                config.request_timeout(),
            )?)),
            None => {
                tracing::warn!("STRIPE_SECRET_KEY not set, only tenants with their own key take card payments");
                None
            }
        };
        let payments =
            PaymentController::new(manager.clone(), provider, config.payment_currency.clone());
        for tenant in &seed.tenants {
            if tenant.currency.is_none() && tenant.stripe_secret_key.is_none() {
                continue;
            }
            let mut account = TenantPayment::new();
            if let Some(key) = &tenant.stripe_secret_key {
                account = account.with_provider(Arc::new(StripeProvider::new(
                    key.clone(),
                    config.stripe_api_base.clone(),
                    config.request_timeout(),
                )?));
            }
            if let Some(symbol) = &tenant.currency {
                account = account.with_currency(symbol);
                if account.currency.is_none() {
                    tracing::warn!(tenant_id = %tenant.tenant_id, currency = %symbol, "Unknown tenant currency, using server default");
                }
            }
            tracing::info!(tenant_id = %tenant.tenant_id, account = ?account, "Tenant payment settings");
            payments.set_tenant_payment(&tenant.tenant_id, account);
        }

        tracing::info!(
            db_path = %config.db_path().display(),
            tables = tables.len(),
            "Server state initialized"
        );
        Ok(Self::new(
            config.clone(),
            manager,
            payments,
            Arc::new(tables),
        ))
    }
}

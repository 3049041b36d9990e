//! 服务层 - 订单核心的外部协作者
//!
//! # 服务列表
//!
//! - [`Catalog`] - 产品目录查询（价格、名称、可售状态）
//! - [`TableDirectory`] - 桌台二维码 token 解析
//! - [`SeedFile`] - 启动时从 JSON 加载目录与桌台

pub mod catalog;
pub mod seed;
pub mod tables;

pub use catalog::{Catalog, CatalogProduct, InMemoryCatalog};
pub use seed::SeedFile;
pub use tables::{InMemoryTableDirectory, TableDirectory, TableRef};

//! Startup seed file
//!
//! ```json
//! {
//!   "tenants": [{
//!     "tenant_id": "demo",
//!     "currency": "€",
//!     "stripe_secret_key": "sk_test_...",
//!     "products": [{ "product_id": 1, "name": "Burger", "unit_price": 1000 }],
//!     "tables": [{ "token": "qr-demo-1", "table_id": 1, "name": "Table 1" }]
//!   }]
//! }
//! ```

use super::catalog::{CatalogProduct, InMemoryCatalog};
use super::tables::{InMemoryTableDirectory, TableRef};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct SeedTable {
    pub token: String,
    pub table_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedTenant {
    pub tenant_id: String,
    #[serde(default)]
    pub products: Vec<CatalogProduct>,
    #[serde(default)]
    pub tables: Vec<SeedTable>,
    /// Display currency (`€`, `$`, `GBP`); server default when absent
    #[serde(default)]
    pub currency: Option<String>,
    /// Tenant's own provider account; server account when absent
    #[serde(default)]
    pub stripe_secret_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub tenants: Vec<SeedTenant>,
}

impl SeedFile {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Populate the catalog and table directory
    pub fn apply(&self, catalog: &InMemoryCatalog, tables: &InMemoryTableDirectory) {
        for tenant in &self.tenants {
            for product in &tenant.products {
                catalog.upsert(&tenant.tenant_id, product.clone());
            }
            for table in &tenant.tables {
                tables.insert(
                    table.token.clone(),
                    TableRef {
                        tenant_id: tenant.tenant_id.clone(),
                        table_id: table.table_id,
                        name: table.name.clone(),
                    },
                );
            }
            tracing::info!(
                tenant_id = %tenant.tenant_id,
                products = tenant.products.len(),
                tables = tenant.tables.len(),
                "Seeded tenant"
            );
        }
    }
}

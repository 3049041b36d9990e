//! Catalog - product lookup with an in-memory cache per tenant

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared::order::ProductRef;
use std::collections::HashMap;
use std::sync::Arc;

/// Product lookup used when pricing a submission
pub trait Catalog: Send + Sync {
    /// Resolve a product that is currently orderable
    fn resolve(&self, tenant_id: &str, product_id: i64) -> Option<ProductRef>;
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub product_id: i64,
    pub name: String,
    /// Price in minor units
    pub unit_price: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// In-memory catalog: tenant_id -> (product_id -> product)
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    products: Arc<RwLock<HashMap<String, HashMap<i64, CatalogProduct>>>>,
}

impl std::fmt::Debug for InMemoryCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tenants = self.products.read().len();
        f.debug_struct("InMemoryCatalog")
            .field("tenants", &tenants)
            .finish()
    }
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product
    pub fn upsert(&self, tenant_id: &str, product: CatalogProduct) {
        self.products
            .write()
            .entry(tenant_id.to_string())
            .or_default()
            .insert(product.product_id, product);
    }

    pub fn set_active(&self, tenant_id: &str, product_id: i64, is_active: bool) -> bool {
        let mut guard = self.products.write();
        match guard
            .get_mut(tenant_id)
            .and_then(|products| products.get_mut(&product_id))
        {
            Some(product) => {
                product.is_active = is_active;
                true
            }
            None => false,
        }
    }

    pub fn product_count(&self, tenant_id: &str) -> usize {
        self.products
            .read()
            .get(tenant_id)
            .map(|p| p.len())
            .unwrap_or(0)
    }
}

impl Catalog for InMemoryCatalog {
    fn resolve(&self, tenant_id: &str, product_id: i64) -> Option<ProductRef> {
        let guard = self.products.read();
        let product = guard.get(tenant_id)?.get(&product_id)?;
        if !product.is_active {
            return None;
        }
        Some(ProductRef {
            product_id: product.product_id,
            name: product.name.clone(),
            unit_price: product.unit_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burger() -> CatalogProduct {
        CatalogProduct {
            product_id: 1,
            name: "Burger".to_string(),
            unit_price: 1000,
            is_active: true,
        }
    }

    #[test]
    fn resolve_is_tenant_scoped() {
        let catalog = InMemoryCatalog::new();
        catalog.upsert("t1", burger());

        assert_eq!(catalog.resolve("t1", 1).unwrap().unit_price, 1000);
        assert!(catalog.resolve("t2", 1).is_none());
        assert!(catalog.resolve("t1", 2).is_none());
    }

    #[test]
    fn inactive_products_do_not_resolve() {
        let catalog = InMemoryCatalog::new();
        catalog.upsert("t1", burger());
        assert!(catalog.set_active("t1", 1, false));
        assert!(catalog.resolve("t1", 1).is_none());
        assert!(!catalog.set_active("t1", 9, false));
    }
}

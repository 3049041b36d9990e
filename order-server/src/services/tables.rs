//! Table directory - maps QR table tokens to (tenant, table)

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Table addressed by a customer link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub tenant_id: String,
    pub table_id: i64,
    pub name: String,
}

pub trait TableDirectory: Send + Sync {
    fn resolve_token(&self, table_token: &str) -> Option<TableRef>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryTableDirectory {
    tables: Arc<DashMap<String, TableRef>>,
}

impl InMemoryTableDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, table_token: impl Into<String>, table: TableRef) {
        self.tables.insert(table_token.into(), table);
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl TableDirectory for InMemoryTableDirectory {
    fn resolve_token(&self, table_token: &str) -> Option<TableRef> {
        self.tables.get(table_token).map(|t| t.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_tokens_only() {
        let directory = InMemoryTableDirectory::new();
        directory.insert(
            "qr-abc",
            TableRef {
                tenant_id: "t1".to_string(),
                table_id: 4,
                name: "Terrace 4".to_string(),
            },
        );
        assert_eq!(directory.resolve_token("qr-abc").unwrap().table_id, 4);
        assert!(directory.resolve_token("qr-zzz").is_none());
    }
}

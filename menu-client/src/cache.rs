//! Client reconciliation cache
//!
//! Keeps the customer's known open orders for one table, keyed by table
//! token, plus a "paid" UI flag. The server stays authoritative: a submit
//! or re-fetch response replaces the cached projection wholesale, and
//! broadcast events only patch status fields.
//!
//! Orders that reached a final state (paid, completed or cancelled) are
//! dropped on load so they never resurface as "current" on a later visit.
//! So are orders placed under another session token: a shared device at the
//! same table must not show the previous diner's orders.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared::message::{ChannelEventKind, ChannelMessage};
use shared::order::OrderSnapshot;
use shared::response::SubmitOrderResponse;

use crate::ClientResult;

/// Persisted per-table state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedTable {
    #[serde(default)]
    pub orders: Vec<OrderSnapshot>,
    /// UI shortcut only, never authoritative
    #[serde(default)]
    pub paid: bool,
    /// Session that wrote this entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

/// Backing store for [`CachedTable`]s
pub trait CacheStore: Send + Sync {
    fn load(&self, table_token: &str) -> ClientResult<Option<CachedTable>>;
    fn save(&self, table_token: &str, table: &CachedTable) -> ClientResult<()>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, CachedTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, table_token: &str) -> ClientResult<Option<CachedTable>> {
        Ok(self.tables.lock().get(table_token).cloned())
    }

    fn save(&self, table_token: &str, table: &CachedTable) -> ClientResult<()> {
        self.tables
            .lock()
            .insert(table_token.to_string(), table.clone());
        Ok(())
    }
}

/// One JSON file per table token under a directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, table_token: &str) -> PathBuf {
        let name: String = table_token
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("orders-{}.json", name))
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self, table_token: &str) -> ClientResult<Option<CachedTable>> {
        let path = self.path_for(table_token);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        match serde_json::from_slice(&bytes) {
            Ok(table) => Ok(Some(table)),
            Err(e) => {
                // A corrupt cache is only a stale hint; start over
                tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable order cache");
                Ok(None)
            }
        }
    }

    fn save(&self, table_token: &str, table: &CachedTable) -> ClientResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let bytes = serde_json::to_vec_pretty(table)?;
        std::fs::write(self.path_for(table_token), bytes)?;
        Ok(())
    }
}

/// Effect of a broadcast message on the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheUpdate {
    /// Patched and persisted
    Applied,
    /// Not about a cached order, or nothing to patch
    Ignored,
    /// A cached order changed in a way the message cannot express; re-fetch
    Stale,
}

/// Session-scoped order projection with explicit load/save
pub struct OrderCache {
    table_token: String,
    session_token: String,
    store: Arc<dyn CacheStore>,
    state: CachedTable,
}

impl std::fmt::Debug for OrderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderCache")
            .field("table_token", &self.table_token)
            .field("orders", &self.state.orders.len())
            .field("paid", &self.state.paid)
            .finish()
    }
}

fn is_settled(order: &OrderSnapshot) -> bool {
    order.is_paid() || order.is_terminal()
}

impl OrderCache {
    /// Load the table's cache for one session, pruning settled orders and
    /// orders of other sessions.
    ///
    /// The pruned set is written back immediately when anything was dropped.
    pub fn load(
        table_token: impl Into<String>,
        session_token: impl Into<String>,
        store: Arc<dyn CacheStore>,
    ) -> ClientResult<Self> {
        let table_token = table_token.into();
        let session_token = session_token.into();
        let mut state = store.load(&table_token)?.unwrap_or_default();

        let before = state.orders.len();
        state
            .orders
            .retain(|o| !is_settled(o) && o.session_token == session_token);
        let pruned = before - state.orders.len();

        let other_session = state
            .session_token
            .as_deref()
            .is_some_and(|s| s != session_token);
        if other_session {
            // The paid flag belonged to the previous diner
            state.paid = false;
        }
        let claimed = state.session_token.as_deref() != Some(session_token.as_str());
        state.session_token = Some(session_token.clone());

        let cache = Self {
            table_token,
            session_token,
            store,
            state,
        };
        if pruned > 0 || claimed {
            tracing::debug!(table = %cache.table_token, pruned, other_session, "Pruned order cache");
            cache.persist()?;
        }
        Ok(cache)
    }

    pub fn table_token(&self) -> &str {
        &self.table_token
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    pub fn orders(&self) -> &[OrderSnapshot] {
        &self.state.orders
    }

    pub fn get(&self, order_id: i64) -> Option<&OrderSnapshot> {
        self.state.orders.iter().find(|o| o.order_id == order_id)
    }

    pub fn contains(&self, order_id: i64) -> bool {
        self.get(order_id).is_some()
    }

    /// Patch a cached order from a broadcast message
    pub fn apply_message(&mut self, message: &ChannelMessage) -> ClientResult<CacheUpdate> {
        let Some(order) = self
            .state
            .orders
            .iter_mut()
            .find(|o| o.order_id == message.order_id)
        else {
            return Ok(CacheUpdate::Ignored);
        };

        match message.kind {
            ChannelEventKind::StatusUpdate => {
                let Some(status) = message.status else {
                    return Ok(CacheUpdate::Ignored);
                };
                order.status = status;
                order.updated_at = order.updated_at.max(message.timestamp);
            }
            ChannelEventKind::ItemStatusUpdate => {
                let (Some(item_id), Some(item_status)) = (message.item_id, message.item_status)
                else {
                    return Ok(CacheUpdate::Ignored);
                };
                let Some(item) = order.find_item_mut(item_id) else {
                    return Ok(CacheUpdate::Stale);
                };
                item.status = item_status;
            }
            ChannelEventKind::OrderPaid => {
                self.state.paid = true;
                // Payment details live on the server
                return self.persist().map(|_| CacheUpdate::Stale);
            }
            ChannelEventKind::ItemsAdded
            | ChannelEventKind::ItemRemoved
            | ChannelEventKind::ItemUpdated => return Ok(CacheUpdate::Stale),
            _ => return Ok(CacheUpdate::Ignored),
        }

        self.persist()?;
        Ok(CacheUpdate::Applied)
    }

    /// Take the authoritative order from a submit response
    pub fn apply_submission(&mut self, response: &SubmitOrderResponse) -> ClientResult<()> {
        self.upsert(response.order.clone())
    }

    /// Replace (or add) one order with the server's version
    pub fn upsert(&mut self, order: OrderSnapshot) -> ClientResult<()> {
        if order.session_token != self.session_token {
            tracing::warn!(order_id = order.order_id, "Not caching another session's order");
            return Ok(());
        }
        match self
            .state
            .orders
            .iter_mut()
            .find(|o| o.order_id == order.order_id)
        {
            Some(existing) => *existing = order,
            None => self.state.orders.push(order),
        }
        self.persist()
    }

    /// Replace the whole projection with a re-fetched order list
    pub fn replace_with(&mut self, orders: Vec<OrderSnapshot>) -> ClientResult<()> {
        self.state.orders = orders
            .into_iter()
            .filter(|o| !is_settled(o) && o.session_token == self.session_token)
            .collect();
        self.persist()
    }

    pub fn remove(&mut self, order_id: i64) -> ClientResult<bool> {
        let before = self.state.orders.len();
        self.state.orders.retain(|o| o.order_id != order_id);
        if self.state.orders.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    pub fn paid_flag(&self) -> bool {
        self.state.paid
    }

    pub fn set_paid_flag(&mut self, paid: bool) -> ClientResult<()> {
        self.state.paid = paid;
        self.persist()
    }

    fn persist(&self) -> ClientResult<()> {
        self.store.save(&self.table_token, &self.state)
    }
}

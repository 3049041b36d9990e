//! redb-based storage layer for order event sourcing
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `events` | `(order_id, sequence)` | `OrderEvent` | Event stream (append-only) |
//! | `snapshots` | `order_id` | `OrderSnapshot` | Snapshot cache |
//! | `open_orders` | `(tenant_id, table_id, session_token)` | `order_id` | Open order per session/table |
//! | `tenant_orders` | `(tenant_id, order_id)` | `()` | Tenant order index |
//! | `processed_commands` | `command_id` | `()` | Idempotency check |
//! | `counters` | `name` | `u64` | Sequence and id counters |
//!
//! Orders are never deleted: terminal and paid orders only leave the
//! `open_orders` index.

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::order::{OrderEvent, OrderSnapshot};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for storing events: key = (order_id, sequence), value = JSON-serialized OrderEvent
const EVENTS_TABLE: TableDefinition<(i64, u64), &[u8]> = TableDefinition::new("events");

/// Table for storing snapshots: key = order_id, value = JSON-serialized OrderSnapshot
const SNAPSHOTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("snapshots");

/// Table for the open order of each (tenant, table, session)
const OPEN_ORDERS_TABLE: TableDefinition<(&str, i64, &str), i64> =
    TableDefinition::new("open_orders");

/// Table for listing orders by tenant: key = (tenant_id, order_id)
const TENANT_ORDERS_TABLE: TableDefinition<(&str, i64), ()> =
    TableDefinition::new("tenant_orders");

/// Table for tracking processed commands: key = command_id, value = empty (idempotency)
const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, ()> =
    TableDefinition::new("processed_commands");

/// Table for counters: key = "seq" | "order_id" | "item_id"
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const SEQUENCE_KEY: &str = "seq";
pub(crate) const ORDER_ID_KEY: &str = "order_id";
pub(crate) const ITEM_ID_KEY: &str = "item_id";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for OrderStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStorage").finish_non_exhaustive()
    }
}

impl OrderStorage {
    /// Open or create the database at the given path
    ///
    /// redb commits are durable once `commit()` returns (copy-on-write with
    /// an atomic root swap), so a crash never leaves a half-applied command.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            // Create all tables if they don't exist
            let _ = write_txn.open_table(EVENTS_TABLE)?;
            let _ = write_txn.open_table(SNAPSHOTS_TABLE)?;
            let _ = write_txn.open_table(OPEN_ORDERS_TABLE)?;
            let _ = write_txn.open_table(TENANT_ORDERS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_COMMANDS_TABLE)?;

            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            for key in [SEQUENCE_KEY, ORDER_ID_KEY, ITEM_ID_KEY] {
                if counters.get(key)?.is_none() {
                    counters.insert(key, 0u64)?;
                }
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Sequence / Id Operations ==========

    /// Get current sequence (read-only)
    pub fn get_current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COUNTERS_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Set sequence number (within transaction)
    pub fn set_sequence(&self, txn: &WriteTransaction, sequence: u64) -> StorageResult<()> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        table.insert(SEQUENCE_KEY, sequence)?;
        Ok(())
    }

    /// Allocate the next id for `key` (within transaction, rolled back with it)
    pub fn next_id(&self, txn: &WriteTransaction, key: &str) -> StorageResult<i64> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table.get(key)?.map(|g| g.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(key, next)?;
        Ok(next as i64)
    }

    // ========== Command Idempotency ==========

    /// Check if a command has been processed
    pub fn is_command_processed(&self, command_id: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Check if a command has been processed (within transaction)
    pub fn is_command_processed_txn(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    /// Mark a command as processed
    pub fn mark_command_processed(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        table.insert(command_id, ())?;
        Ok(())
    }

    // ========== Event Operations ==========

    /// Store an event
    pub fn store_event(&self, txn: &WriteTransaction, event: &OrderEvent) -> StorageResult<()> {
        let mut table = txn.open_table(EVENTS_TABLE)?;
        let value = serde_json::to_vec(event)?;
        table.insert((event.order_id, event.sequence), value.as_slice())?;
        Ok(())
    }

    /// Get all events for an order, in sequence order
    pub fn get_events_for_order(&self, order_id: i64) -> StorageResult<Vec<OrderEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS_TABLE)?;

        let mut events = Vec::new();
        for result in table.range((order_id, 0u64)..=(order_id, u64::MAX))? {
            let (_key, value) = result?;
            let event: OrderEvent = serde_json::from_slice(value.value())?;
            events.push(event);
        }
        Ok(events)
    }

    // ========== Snapshot Operations ==========

    /// Store a snapshot and keep the tenant/open indexes in line with it
    pub fn store_snapshot(
        &self,
        txn: &WriteTransaction,
        snapshot: &OrderSnapshot,
    ) -> StorageResult<()> {
        {
            let mut table = txn.open_table(SNAPSHOTS_TABLE)?;
            let value = serde_json::to_vec(snapshot)?;
            table.insert(snapshot.order_id, value.as_slice())?;
        }
        {
            let mut tenant_orders = txn.open_table(TENANT_ORDERS_TABLE)?;
            tenant_orders.insert((snapshot.tenant_id.as_str(), snapshot.order_id), ())?;
        }

        let mut open = txn.open_table(OPEN_ORDERS_TABLE)?;
        let key = (
            snapshot.tenant_id.as_str(),
            snapshot.table_id,
            snapshot.session_token.as_str(),
        );
        if snapshot.is_open() {
            open.insert(key, snapshot.order_id)?;
        } else {
            let indexed = open.get(key)?.map(|g| g.value());
            if indexed == Some(snapshot.order_id) {
                open.remove(key)?;
            }
        }
        Ok(())
    }

    /// Get a snapshot by order ID
    pub fn get_snapshot(&self, order_id: i64) -> StorageResult<Option<OrderSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SNAPSHOTS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a snapshot by order ID (within transaction)
    pub fn get_snapshot_txn(
        &self,
        txn: &WriteTransaction,
        order_id: i64,
    ) -> StorageResult<Option<OrderSnapshot>> {
        let table = txn.open_table(SNAPSHOTS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Find the open order for a session at a table (within transaction)
    pub fn find_open_order_txn(
        &self,
        txn: &WriteTransaction,
        tenant_id: &str,
        table_id: i64,
        session_token: &str,
    ) -> StorageResult<Option<i64>> {
        let table = txn.open_table(OPEN_ORDERS_TABLE)?;
        Ok(table
            .get((tenant_id, table_id, session_token))?
            .map(|g| g.value()))
    }

    /// Find the open order for a session at a table
    pub fn find_open_order(
        &self,
        tenant_id: &str,
        table_id: i64,
        session_token: &str,
    ) -> StorageResult<Option<OrderSnapshot>> {
        let order_id = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(OPEN_ORDERS_TABLE)?;
            table
                .get((tenant_id, table_id, session_token))?
                .map(|g| g.value())
        };
        match order_id {
            Some(id) => self.get_snapshot(id),
            None => Ok(None),
        }
    }

    /// All orders of a tenant, oldest first
    pub fn list_tenant_orders(&self, tenant_id: &str) -> StorageResult<Vec<OrderSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(TENANT_ORDERS_TABLE)?;
        let snapshots = read_txn.open_table(SNAPSHOTS_TABLE)?;

        let mut orders = Vec::new();
        for result in index.range((tenant_id, i64::MIN)..=(tenant_id, i64::MAX))? {
            let (key, _) = result?;
            let (_, order_id) = key.value();
            if let Some(value) = snapshots.get(order_id)? {
                orders.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(orders)
    }
}

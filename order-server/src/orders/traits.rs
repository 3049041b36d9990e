//! Core abstractions of the command pipeline
//!
//! - [`CommandHandler`]: validates a command against current state and emits events
//! - [`EventApplier`]: folds one event into a snapshot (pure)
//! - [`CommandContext`]: transactional view handed to handlers

use async_trait::async_trait;
use enum_dispatch::enum_dispatch;
use redb::WriteTransaction;
use shared::error::ErrorCode;
use shared::order::{Actor, CommandError, OrderEvent, OrderSnapshot};
use std::collections::HashMap;
use thiserror::Error;

use super::storage::{ITEM_ID_KEY, ORDER_ID_KEY, OrderStorage, StorageError};

/// Errors raised while validating a command
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Item not found: {0}")]
    ItemNotFound(i64),

    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Order {0} has a payment in progress")]
    PaymentInProgress(i64),

    #[error("Order already paid: {0}")]
    AlreadyPaid(i64),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for OrderError {
    fn from(err: StorageError) -> Self {
        OrderError::Storage(err.to_string())
    }
}

impl OrderError {
    pub fn code(&self) -> ErrorCode {
        match self {
            OrderError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            OrderError::ItemNotFound(_) => ErrorCode::OrderItemNotFound,
            OrderError::ProductNotFound(_) => ErrorCode::ProductNotFound,
            OrderError::InvalidTransition(_) => ErrorCode::InvalidTransition,
            OrderError::PaymentInProgress(_) => ErrorCode::PaymentInProgress,
            OrderError::AlreadyPaid(_) => ErrorCode::OrderAlreadyPaid,
            OrderError::Unauthorized(_) => ErrorCode::PermissionDenied,
            OrderError::Validation(_) => ErrorCode::ValidationFailed,
            OrderError::Storage(_) => ErrorCode::StorageError,
        }
    }
}

impl From<OrderError> for CommandError {
    fn from(err: OrderError) -> Self {
        CommandError::new(err.code(), err.to_string())
    }
}

/// Command metadata shared by every handler
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    pub tenant_id: String,
    pub actor: Actor,
    /// Client timestamp
    pub timestamp: i64,
}

/// Transactional view used by command handlers
///
/// Snapshots loaded here are cached so that events emitted by one handler
/// can be applied and persisted together at the end of the command.
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a OrderStorage,
    current_sequence: u64,
    snapshots: HashMap<i64, OrderSnapshot>,
}

impl<'a> CommandContext<'a> {
    pub fn new(txn: &'a WriteTransaction, storage: &'a OrderStorage, current_sequence: u64) -> Self {
        Self {
            txn,
            storage,
            current_sequence,
            snapshots: HashMap::new(),
        }
    }

    /// Allocate the next global sequence number
    pub fn next_sequence(&mut self) -> u64 {
        self.current_sequence += 1;
        self.current_sequence
    }

    pub fn current_sequence(&self) -> u64 {
        self.current_sequence
    }

    pub fn next_order_id(&mut self) -> Result<i64, OrderError> {
        Ok(self.storage.next_id(self.txn, ORDER_ID_KEY)?)
    }

    pub fn next_item_id(&mut self) -> Result<i64, OrderError> {
        Ok(self.storage.next_id(self.txn, ITEM_ID_KEY)?)
    }

    /// Load a snapshot, preferring the in-command copy
    pub fn load_snapshot(&self, order_id: i64) -> Result<OrderSnapshot, OrderError> {
        if let Some(snapshot) = self.snapshots.get(&order_id) {
            return Ok(snapshot.clone());
        }
        self.storage
            .get_snapshot_txn(self.txn, order_id)?
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    /// Open order id for a session at a table, if any
    pub fn find_open_order(
        &self,
        tenant_id: &str,
        table_id: i64,
        session_token: &str,
    ) -> Result<Option<i64>, OrderError> {
        Ok(self
            .storage
            .find_open_order_txn(self.txn, tenant_id, table_id, session_token)?)
    }

    pub fn save_snapshot(&mut self, snapshot: OrderSnapshot) {
        self.snapshots.insert(snapshot.order_id, snapshot);
    }

    pub fn modified_snapshots(&self) -> impl Iterator<Item = &OrderSnapshot> {
        self.snapshots.values()
    }

    pub fn take_snapshot(&mut self, order_id: i64) -> Option<OrderSnapshot> {
        self.snapshots.remove(&order_id)
    }
}

/// Command handler: validate and emit events, never mutate state directly
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError>;
}

/// Event applier: pure fold of one event into a snapshot
#[enum_dispatch]
pub trait EventApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent);
}

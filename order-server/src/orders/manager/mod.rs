//! OrdersManager - Core command processing and event generation
//!
//! # Command Flow
//!
//! ```text
//! execute_command(cmd)
//!     ├─ 1. Idempotency check (command_id)
//!     ├─ 2. Acquire the single-writer lock
//!     ├─ 3. Resolve catalog entries / tenant policy for the action
//!     ├─ 4. Begin write transaction, create CommandContext
//!     ├─ 5. Execute action -> events
//!     ├─ 6. Apply events to snapshots via EventApplier
//!     ├─ 7. Persist events, snapshots, sequence, processed marker
//!     ├─ 8. Commit transaction
//!     ├─ 9. Publish to the tenant hub (still under the lock)
//!     └─ 10. Return response
//! ```
//!
//! The lock makes "read open order -> merge -> write" atomic with respect to
//! every other mutation and keeps hub publication in commit order.

mod error;
pub use error::*;

use super::actions::CommandAction;
use super::appliers::{self, EventAction};
use super::storage::{OrderStorage, StorageError};
use super::traits::{CommandContext, CommandHandler, CommandMetadata, EventApplier};
use crate::message::{HubEvent, TenantHub};
use crate::services::Catalog;
use dashmap::DashMap;
use parking_lot::Mutex;
use shared::order::{
    CommandResponse, EventPayload, OrderCommand, OrderCommandPayload, OrderEvent, OrderSnapshot,
    SubmitOutcome, TenantPolicy,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Result of a committed command, ready for publication
struct Processed {
    response: CommandResponse,
    events: Vec<OrderEvent>,
    snapshots: HashMap<i64, OrderSnapshot>,
}

/// OrdersManager for command processing
#[derive(Clone)]
pub struct OrdersManager {
    storage: OrderStorage,
    hub: TenantHub,
    catalog: Arc<dyn Catalog>,
    /// Per-tenant overrides of `default_policy`
    policies: Arc<DashMap<String, TenantPolicy>>,
    default_policy: TenantPolicy,
    write_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("storage", &"<OrderStorage>")
            .field("hub", &self.hub)
            .field("default_policy", &self.default_policy)
            .finish()
    }
}

impl OrdersManager {
    pub fn new(storage: OrderStorage, catalog: Arc<dyn Catalog>, hub: TenantHub) -> Self {
        Self {
            storage,
            hub,
            catalog,
            policies: Arc::new(DashMap::new()),
            default_policy: TenantPolicy::default(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Open (or create) the order database at `db_path`
    pub fn open(
        db_path: impl AsRef<Path>,
        catalog: Arc<dyn Catalog>,
        hub: TenantHub,
    ) -> ManagerResult<Self> {
        let storage = OrderStorage::open(db_path)?;
        Ok(Self::new(storage, catalog, hub))
    }

    pub fn with_default_policy(mut self, policy: TenantPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn set_tenant_policy(&self, tenant_id: &str, policy: TenantPolicy) {
        self.policies.insert(tenant_id.to_string(), policy);
    }

    pub fn policy_for(&self, tenant_id: &str) -> TenantPolicy {
        self.policies
            .get(tenant_id)
            .map(|p| *p.value())
            .unwrap_or(self.default_policy)
    }

    /// Subscribe to a tenant's committed events
    pub fn subscribe(&self, tenant_id: &str) -> broadcast::Receiver<HubEvent> {
        self.hub.subscribe(tenant_id)
    }

    pub fn hub(&self) -> &TenantHub {
        &self.hub
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &OrderStorage {
        &self.storage
    }

    /// Execute a command and return the response
    pub fn execute_command(&self, cmd: OrderCommand) -> CommandResponse {
        let command_id = cmd.command_id.clone();
        let _guard = self.write_lock.lock();
        match self.process_command(cmd) {
            Ok(processed) => {
                for event in &processed.events {
                    if let Some(snapshot) = processed.snapshots.get(&event.order_id) {
                        self.hub.publish(event, snapshot);
                    }
                }
                processed.response
            }
            Err(err) => {
                tracing::debug!(command_id = %command_id, error = %err, "Command rejected");
                CommandResponse::error(command_id, err.into())
            }
        }
    }

    /// Resolve the products a submission references; unknown ones are left
    /// out so the action reports them.
    fn resolve_products(
        &self,
        tenant_id: &str,
        items: &[shared::order::CartItemInput],
    ) -> HashMap<i64, shared::order::ProductRef> {
        items
            .iter()
            .filter_map(|i| {
                self.catalog
                    .resolve(tenant_id, i.product_id)
                    .map(|p| (i.product_id, p))
            })
            .collect()
    }

    fn process_command(&self, cmd: OrderCommand) -> ManagerResult<Processed> {
        tracing::debug!(command_id = %cmd.command_id, payload = ?cmd.payload, "Processing command");

        // 1. Idempotency check (before transaction)
        if self.storage.is_command_processed(&cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "Duplicate command");
            return Ok(Processed {
                response: CommandResponse::duplicate(cmd.command_id),
                events: vec![],
                snapshots: HashMap::new(),
            });
        }

        // 2. Convert to action, inject catalog entries and tenant policy
        let mut action: CommandAction = (&cmd).into();
        action.set_policy(self.policy_for(&cmd.tenant_id));
        if let (CommandAction::SubmitItems(submit), OrderCommandPayload::SubmitItems { items, .. }) =
            (&mut action, &cmd.payload)
        {
            submit.products = self.resolve_products(&cmd.tenant_id, items);
        }

        // 3. Begin write transaction
        let txn = self.storage.begin_write()?;
        let current_sequence = self.storage.get_current_sequence()?;
        let mut ctx = CommandContext::new(&txn, &self.storage, current_sequence);
        let metadata = CommandMetadata {
            command_id: cmd.command_id.clone(),
            tenant_id: cmd.tenant_id.clone(),
            actor: cmd.actor.clone(),
            timestamp: cmd.timestamp,
        };

        // 4. Execute action
        let events = futures::executor::block_on(action.execute(&mut ctx, &metadata))
            .map_err(ManagerError::from)?;

        // 5. Apply events to snapshots
        for event in &events {
            let mut snapshot = match ctx.load_snapshot(event.order_id) {
                Ok(snapshot) => snapshot,
                Err(_) => OrderSnapshot::new(
                    event.order_id,
                    event.tenant_id.clone(),
                    0,
                    String::new(),
                ),
            };
            let applier: EventAction = event.into();
            applier.apply(&mut snapshot, event);
            ctx.save_snapshot(snapshot);
        }

        // Target order for the response (no-op commands still return state)
        let target = events
            .last()
            .map(|e| e.order_id)
            .or(cmd.payload.order_id());
        let mut snapshots: HashMap<i64, OrderSnapshot> = ctx
            .modified_snapshots()
            .map(|s| (s.order_id, s.clone()))
            .collect();
        let response_order = match target {
            Some(id) => match snapshots.get(&id) {
                Some(s) => Some(s.clone()),
                None => ctx.load_snapshot(id).ok(),
            },
            None => None,
        };
        drop(ctx);

        // 6. Persist events and snapshots
        for event in &events {
            self.storage.store_event(&txn, event)?;
        }
        for snapshot in snapshots.values() {
            self.storage.store_snapshot(&txn, snapshot)?;
        }

        // 7. Update sequence counter
        let max_sequence = events
            .iter()
            .map(|e| e.sequence)
            .max()
            .unwrap_or(current_sequence);
        if max_sequence > current_sequence {
            self.storage.set_sequence(&txn, max_sequence)?;
        }

        // 8. Mark command processed and commit
        self.storage.mark_command_processed(&txn, &cmd.command_id)?;
        txn.commit().map_err(StorageError::from)?;

        let outcome = match &cmd.payload {
            OrderCommandPayload::SubmitItems { .. } => Some(
                if events
                    .iter()
                    .any(|e| matches!(e.payload, EventPayload::OrderCreated { .. }))
                {
                    SubmitOutcome::Created
                } else {
                    SubmitOutcome::Merged
                },
            ),
            _ => None,
        };

        tracing::info!(
            command_id = %cmd.command_id,
            tenant_id = %cmd.tenant_id,
            order_id = ?target,
            event_count = events.len(),
            "Command processed successfully"
        );

        // Only orders that actually changed are published
        snapshots.retain(|id, _| events.iter().any(|e| e.order_id == *id));
        Ok(Processed {
            response: CommandResponse::success(cmd.command_id, response_order)
                .with_outcome(outcome),
            events,
            snapshots,
        })
    }

    // ========== Public Query Methods ==========

    /// Get an order visible to `tenant_id`
    pub fn get_order(&self, tenant_id: &str, order_id: i64) -> ManagerResult<OrderSnapshot> {
        self.storage
            .get_snapshot(order_id)?
            .filter(|s| s.tenant_id == tenant_id)
            .ok_or(ManagerError::OrderNotFound(order_id))
    }

    /// The session's open order at a table, if any
    pub fn find_open_order(
        &self,
        tenant_id: &str,
        table_id: i64,
        session_token: &str,
    ) -> ManagerResult<Option<OrderSnapshot>> {
        Ok(self
            .storage
            .find_open_order(tenant_id, table_id, session_token)?)
    }

    /// Tenant orders, newest first; terminal orders only on request
    pub fn list_orders(
        &self,
        tenant_id: &str,
        include_closed: bool,
    ) -> ManagerResult<Vec<OrderSnapshot>> {
        let mut orders = self.storage.list_tenant_orders(tenant_id)?;
        if !include_closed {
            orders.retain(|o| !o.is_terminal());
        }
        orders.sort_by(|a, b| b.order_id.cmp(&a.order_id));
        Ok(orders)
    }

    /// Every order a session placed at a table
    pub fn list_session_orders(
        &self,
        tenant_id: &str,
        table_id: i64,
        session_token: &str,
    ) -> ManagerResult<Vec<OrderSnapshot>> {
        let mut orders = self.storage.list_tenant_orders(tenant_id)?;
        orders.retain(|o| o.table_id == table_id && o.session_token == session_token);
        orders.sort_by_key(|o| o.order_id);
        Ok(orders)
    }

    /// Get all events for a specific order
    pub fn get_events_for_order(
        &self,
        tenant_id: &str,
        order_id: i64,
    ) -> ManagerResult<Vec<OrderEvent>> {
        self.get_order(tenant_id, order_id)?;
        Ok(self.storage.get_events_for_order(order_id)?)
    }

    /// Rebuild a snapshot from events (for verification)
    pub fn rebuild_snapshot(&self, order_id: i64) -> ManagerResult<OrderSnapshot> {
        let events = self.storage.get_events_for_order(order_id)?;
        appliers::replay(&events).ok_or(ManagerError::OrderNotFound(order_id))
    }

    pub fn get_current_sequence(&self) -> ManagerResult<u64> {
        Ok(self.storage.get_current_sequence()?)
    }
}

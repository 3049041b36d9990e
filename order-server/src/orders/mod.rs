//! Order Event Sourcing Module
//!
//! - **manager**: Core OrdersManager for command processing and event generation
//! - **storage**: redb-based persistence layer for events, snapshots, and indices
//! - **actions**: command validation, one handler per command
//! - **appliers**: pure event folding into snapshots
//!
//! # Architecture
//!
//! ```text
//! Command → OrdersManager → Event → Storage (redb)
//!                 ↓                      ↓
//!            TenantHub            Snapshot Update
//!                 ↓
//!        Staff / table channels
//! ```

pub mod traits;

pub mod actions;
pub mod appliers;
pub mod manager;
pub mod storage;

pub use manager::{ManagerError, ManagerResult, OrdersManager};
pub use storage::{OrderStorage, StorageError};
pub use traits::{CommandContext, CommandHandler, CommandMetadata, EventApplier, OrderError};

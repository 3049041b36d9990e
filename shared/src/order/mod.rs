//! Order domain module
//!
//! - Commands: requests from staff, customer sessions and the payment flow
//! - Events: immutable facts recorded after command processing
//! - Snapshots: order state folded from the event stream
//! - Policy: tenant rules layered on the status machine

pub mod command;
pub mod event;
pub mod policy;
pub mod snapshot;
pub mod types;

// Re-exports
pub use command::{Actor, OrderCommand, OrderCommandPayload};
pub use event::{EventPayload, OrderEvent, OrderEventType};
pub use policy::{CancelBoundary, TenantPolicy};
pub use snapshot::OrderSnapshot;
pub use types::*;

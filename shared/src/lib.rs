//! Shared types for the ordering platform
//!
//! Order model, status machine rules, events, commands, realtime
//! channel messages and the unified error system, used by both
//! order-server and menu-client.

pub mod error;
pub mod message;
pub mod order;
pub mod request;
pub mod response;
pub mod util;

// Re-exports
pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use message::{ChannelEventKind, ChannelMessage};
pub use serde::{Deserialize, Serialize};

//! Menu Client - customer and staff client for the order server
//!
//! - [`Cart`]: local selection before submission
//! - [`HttpClient`] / [`OrderApi`]: REST calls
//! - [`ChannelSubscriber`]: realtime events with the reconnect policy
//! - [`OrderCache`]: table-scoped projection of the session's open orders
//! - [`CustomerSession`]: submit and pay flows for one table visit

pub mod cache;
pub mod cart;
pub mod config;
pub mod error;
pub mod http;
pub mod message;
pub mod session;

pub use cache::{CacheStore, CacheUpdate, CachedTable, JsonFileStore, MemoryStore, OrderCache};
pub use cart::{Cart, CartEntry};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, OrderApi};
pub use session::{CustomerSession, PaymentConfirmer};

// Message types and subscriber
pub use message::{
    ChannelConnection, ChannelError, ChannelEvent, ChannelSubscriber, ChannelTransport, Frame,
    WsTransport,
};

// Re-export shared types for convenience
pub use shared::message::{ChannelEventKind, ChannelMessage};
pub use shared::order::{OrderSnapshot, OrderStatus, ProductRef, SubmitOutcome};
pub use shared::response::{PaymentIntentResponse, SubmitOrderResponse};

//! 实时推送
//!
//! Committed order events are translated into [`ChannelMessage`]s and
//! fanned out per tenant through [`TenantHub`].

mod hub;

pub use hub::{HubEvent, TenantHub, channel_message};
pub use shared::message::{CLOSE_AUTH_REJECTED, CLOSE_NORMAL, ChannelEventKind, ChannelMessage};

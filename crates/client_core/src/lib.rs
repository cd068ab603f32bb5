//! Client core for the realtime chat service: gateway session, normalized
//! cache, permission resolution and the per-channel message timeline.

use shared::domain::{GuildId, PartialChannel, PresenceStatus, UserId};

pub mod cache;
pub mod channel_view;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod listeners;
pub mod permissions;
pub mod session;
pub mod timeline;
pub mod token_store;
pub mod views;

pub use cache::{CacheStore, GuildCache};
pub use channel_view::{ChannelView, ViewStatus};
pub use config::{load_settings, ClientSettings};
pub use error::{HttpError, SessionError};
pub use gateway::{Gateway, GatewayState};
pub use http::HttpClient;
pub use listeners::{ListenerRegistry, MessageSubscription};
pub use permissions::{effective_permissions, has_permission};
pub use session::{ReconnectPolicy, Session};
pub use timeline::{group_messages, ChannelTimeline, MessageContent, MessageGroup};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};

/// Cache-level changes announced to the UI after they are applied.
/// Message traffic goes through [`MessageSubscription`] instead.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Hydration finished; the cache is complete.
    Ready,
    GuildAvailable(GuildId),
    ChannelCreated(PartialChannel),
    ChannelDeleted(PartialChannel),
    PresenceChanged(UserId, PresenceStatus),
    ConnectionStateChanged(GatewayState),
    Error(String),
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

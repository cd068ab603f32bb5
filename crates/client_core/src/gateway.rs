//! Gateway protocol handling: identify, hydration bookkeeping and the
//! application of inbound events to the cache.
//!
//! The socket itself is owned by [`crate::session::Session`]; this type only
//! sees decoded frames, which keeps it testable without a network.

use std::sync::Arc;

use anyhow::{Context, Result};
use shared::{
    domain::{ChannelId, PresenceStatus, User},
    protocol::{Envelope, GatewayEvent, Identify},
};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info};

use crate::{
    cache::CacheStore,
    listeners::{ListenerRegistry, MessageSubscription},
    ClientEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    Connecting,
    Authenticating,
    Hydrating { remaining: u32 },
    Ready,
}

pub struct Gateway {
    cache: Arc<RwLock<CacheStore>>,
    state: Mutex<GatewayState>,
    listeners: ListenerRegistry,
    events: broadcast::Sender<ClientEvent>,
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

impl Gateway {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            cache: Arc::new(RwLock::new(CacheStore::new())),
            state: Mutex::new(GatewayState::Connecting),
            listeners: ListenerRegistry::new(),
            events,
        }
    }

    pub fn cache(&self) -> Arc<RwLock<CacheStore>> {
        Arc::clone(&self.cache)
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_messages(&self, channel_id: ChannelId) -> MessageSubscription {
        self.listeners.subscribe(channel_id)
    }

    pub fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    pub async fn state(&self) -> GatewayState {
        *self.state.lock().await
    }

    async fn set_state(&self, next: GatewayState) {
        *self.state.lock().await = next;
        self.emit(ClientEvent::ConnectionStateChanged(next));
    }

    /// Moves to `Authenticating` and returns the identify frame, which must
    /// be the first frame written on a fresh socket.
    pub async fn on_open(&self, token: &str) -> Result<String> {
        let frame = serde_json::to_string(&Envelope::<Identify>::identify(token))
            .context("failed to encode identify frame")?;
        self.set_state(GatewayState::Authenticating).await;
        Ok(frame)
    }

    /// Drops all cached state and returns to `Connecting`. Message
    /// subscriptions survive so open channel views keep receiving.
    pub async fn reset(&self) {
        self.cache.write().await.clear();
        self.set_state(GatewayState::Connecting).await;
    }

    /// Decodes and applies one text frame. Frames that fail to decode are
    /// dropped.
    pub async fn handle_text(&self, text: &str) {
        match GatewayEvent::decode(text) {
            Ok(event) => self.apply(event).await,
            Err(err) => debug!(error = %err, "gateway: dropping undecodable frame"),
        }
    }

    pub async fn apply(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::Ready(ready) => {
                let guild_count = ready.guild_count;
                let next = {
                    let mut state = self.state.lock().await;
                    let mut cache = self.cache.write().await;
                    cache.set_user(User {
                        id: ready.id,
                        username: ready.username,
                        display_name: ready.display_name,
                        created_at: 0,
                    });
                    let next = if guild_count == 0 {
                        cache.set_ready();
                        GatewayState::Ready
                    } else {
                        GatewayState::Hydrating {
                            remaining: guild_count,
                        }
                    };
                    *state = next;
                    next
                };
                info!(guild_count, "gateway: identified");
                self.emit(ClientEvent::ConnectionStateChanged(next));
                if next == GatewayState::Ready {
                    self.emit(ClientEvent::Ready);
                }
            }
            GatewayEvent::GuildCreate(snapshot) => {
                let guild_id = snapshot.id.clone();
                let became_ready = {
                    let mut state = self.state.lock().await;
                    let mut cache = self.cache.write().await;
                    cache.add_guild(snapshot);
                    match *state {
                        GatewayState::Hydrating { remaining } if remaining <= 1 => {
                            cache.set_ready();
                            *state = GatewayState::Ready;
                            true
                        }
                        GatewayState::Hydrating { remaining } => {
                            *state = GatewayState::Hydrating {
                                remaining: remaining - 1,
                            };
                            false
                        }
                        _ => false,
                    }
                };
                debug!(guild_id = %guild_id, "gateway: guild available");
                self.emit(ClientEvent::GuildAvailable(guild_id));
                if became_ready {
                    info!("gateway: hydration complete");
                    self.emit(ClientEvent::ConnectionStateChanged(GatewayState::Ready));
                    self.emit(ClientEvent::Ready);
                }
            }
            GatewayEvent::ChannelCreate(partial) => {
                let applied = self.cache.write().await.add_channel(&partial);
                if applied {
                    self.emit(ClientEvent::ChannelCreated(partial));
                } else {
                    debug!(guild_id = %partial.guild_id, "gateway: channel create for unknown guild");
                }
            }
            GatewayEvent::ChannelDelete(partial) => {
                let applied = self.cache.write().await.remove_channel(&partial);
                if applied {
                    self.emit(ClientEvent::ChannelDeleted(partial));
                } else {
                    debug!(channel_id = %partial.id, "gateway: channel delete was a no-op");
                }
            }
            GatewayEvent::PresenceUpdate(presence) => {
                let user_id = presence.user.id.clone();
                let status = presence.status;
                {
                    let mut cache = self.cache.write().await;
                    if status == PresenceStatus::Offline {
                        cache.remove_presence(&user_id);
                    } else {
                        cache.update_presence(presence);
                    }
                }
                self.emit(ClientEvent::PresenceChanged(user_id, status));
            }
            GatewayEvent::Message(event) => {
                let delivered = self.listeners.dispatch(&event);
                debug!(kind = event.kind(), delivered, "gateway: routed message event");
            }
            GatewayEvent::Unknown { op, t } => {
                debug!(op, t = %t, "gateway: ignoring unknown event");
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;

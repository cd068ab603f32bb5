//! Channel-scoped fan-out of `MESSAGE_*` events.
//!
//! Any number of subscribers may watch the same channel. Each
//! [`MessageSubscription`] removes itself from the registry when dropped,
//! so switching the viewed channel is just dropping the old handle.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use shared::{domain::ChannelId, protocol::MessageEvent};
use tokio::sync::mpsc;

type SubscriberId = u64;

#[derive(Default)]
struct RegistryInner {
    next_id: SubscriberId,
    subscribers: HashMap<ChannelId, Vec<(SubscriberId, mpsc::UnboundedSender<MessageEvent>)>>,
}

fn lock(inner: &Mutex<RegistryInner>) -> MutexGuard<'_, RegistryInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, channel_id: ChannelId) -> MessageSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut guard = lock(&self.inner);
            let id = guard.next_id;
            guard.next_id += 1;
            guard
                .subscribers
                .entry(channel_id.clone())
                .or_default()
                .push((id, tx));
            id
        };
        MessageSubscription {
            id,
            channel_id,
            rx,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Delivers the event to every live subscriber of its channel and
    /// returns how many received it. Events without a channel go nowhere.
    pub fn dispatch(&self, event: &MessageEvent) -> usize {
        let Some(channel_id) = event.channel_id() else {
            return 0;
        };
        let mut guard = lock(&self.inner);
        let Some(slots) = guard.subscribers.get_mut(channel_id) else {
            return 0;
        };
        slots.retain(|(_, tx)| tx.send(event.clone()).is_ok());
        let delivered = slots.len();
        if slots.is_empty() {
            guard.subscribers.remove(channel_id);
        }
        delivered
    }

    pub fn subscriber_count(&self, channel_id: &ChannelId) -> usize {
        lock(&self.inner)
            .subscribers
            .get(channel_id)
            .map_or(0, Vec::len)
    }
}

pub struct MessageSubscription {
    id: SubscriberId,
    channel_id: ChannelId,
    rx: mpsc::UnboundedReceiver<MessageEvent>,
    registry: Weak<Mutex<RegistryInner>>,
}

impl MessageSubscription {
    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    /// Next event for this channel; `None` once the registry is gone.
    pub async fn recv(&mut self) -> Option<MessageEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<MessageEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for MessageSubscription {
    fn drop(&mut self) {
        let Some(inner) = self.registry.upgrade() else {
            return;
        };
        let mut guard = lock(&inner);
        if let Some(slots) = guard.subscribers.get_mut(&self.channel_id) {
            slots.retain(|(id, _)| *id != self.id);
            if slots.is_empty() {
                guard.subscribers.remove(&self.channel_id);
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/listeners_tests.rs"]
mod tests;

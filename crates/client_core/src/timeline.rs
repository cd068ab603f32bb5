//! Message timeline for one channel and its grouping into display runs.
//!
//! The timeline is kept newest first, the order the API returns history
//! in. Groups come out newest group first, while the entries inside a
//! group read oldest first.

use rand::{distributions::Alphanumeric, Rng};
use shared::{
    domain::{Message, MessageId, UserId},
    protocol::MessageEvent,
};

/// Messages further apart than this never share a group.
pub const GROUP_WINDOW_SECS: i64 = 60;
pub const STREAM_TOKEN_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent {
    pub id: MessageId,
    pub content: String,
    pub created_at: i64,
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageGroup {
    pub created_by: UserId,
    pub replying_to: Option<MessageId>,
    pub content: Vec<MessageContent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    pub message: Message,
    pub pending: bool,
}

impl TimelineEntry {
    pub fn confirmed(message: Message) -> Self {
        Self {
            message,
            pending: false,
        }
    }

    fn to_content(&self) -> MessageContent {
        MessageContent {
            id: self.message.id.clone(),
            content: self.message.content.clone(),
            created_at: self.message.created_at,
            pending: self.pending,
        }
    }
}

/// Random correlation token attached to an outgoing message.
pub fn make_stream_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STREAM_TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn is_outside_window(a: i64, b: i64) -> bool {
    (a - b).abs() > GROUP_WINDOW_SECS
}

/// Groups a newest-first list of entries.
///
/// A new group starts when the entry is a reply, when its author differs
/// from the running group, when it is more than a minute away from the
/// entry last added to the running group, or when the running group is a
/// reply (the reply is the oldest entry of its group).
pub fn group_messages(entries: &[TimelineEntry]) -> Vec<MessageGroup> {
    let mut groups: Vec<MessageGroup> = Vec::new();
    let mut last_time: Option<i64> = None;

    for entry in entries {
        let message = &entry.message;
        let joins_running = match (groups.last(), last_time) {
            (Some(running), Some(last_time)) => {
                message.replying_to.is_none()
                    && running.replying_to.is_none()
                    && running.created_by == message.created_by
                    && !is_outside_window(last_time, message.created_at)
            }
            _ => false,
        };

        match groups.last_mut() {
            Some(running) if joins_running => running.content.insert(0, entry.to_content()),
            _ => groups.push(MessageGroup {
                created_by: message.created_by.clone(),
                replying_to: message.replying_to.clone(),
                content: vec![entry.to_content()],
            }),
        }
        last_time = Some(message.created_at);
    }

    groups
}

#[derive(Debug, Clone, Default)]
pub struct ChannelTimeline {
    entries: Vec<TimelineEntry>,
}

impl ChannelTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the timeline with fetched history (newest first). Pending
    /// entries the history does not already contain stay on top.
    pub fn load(&mut self, messages: Vec<Message>) {
        let pending: Vec<TimelineEntry> = self
            .entries
            .drain(..)
            .filter(|entry| {
                entry.pending
                    && !messages.iter().any(|message| {
                        message.id == entry.message.id
                            || (message.stream.is_some()
                                && message.stream == entry.message.stream)
                    })
            })
            .collect();
        self.entries = pending;
        self.entries.extend(messages.into_iter().map(TimelineEntry::confirmed));
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, message_id: &MessageId) -> bool {
        self.entries.iter().any(|entry| &entry.message.id == message_id)
    }

    /// Adds a locally sent message awaiting confirmation.
    pub fn push_pending(&mut self, message: Message) {
        self.entries.insert(
            0,
            TimelineEntry {
                message,
                pending: true,
            },
        );
    }

    /// Applies a confirmed creation. A message already in the timeline, or
    /// carrying the stream token of a pending entry, replaces that entry
    /// where it stands; anything else becomes the newest entry.
    pub fn confirm_or_insert(&mut self, message: Message) {
        let existing = self
            .entries
            .iter()
            .position(|entry| entry.message.id == message.id)
            .or_else(|| {
                message.stream.as_deref().and_then(|stream| {
                    self.entries.iter().position(|entry| {
                        entry.pending && entry.message.stream.as_deref() == Some(stream)
                    })
                })
            });

        match existing {
            Some(index) => {
                let entry = &mut self.entries[index];
                entry.message = message;
                entry.pending = false;
            }
            None => self.entries.insert(0, TimelineEntry::confirmed(message)),
        }
    }

    /// Returns whether the event changed the timeline.
    pub fn apply(&mut self, event: &MessageEvent) -> bool {
        match event {
            MessageEvent::Created(message) => {
                self.confirm_or_insert(message.clone());
                true
            }
            MessageEvent::Updated(update) => {
                let Some(entry) = self
                    .entries
                    .iter_mut()
                    .find(|entry| entry.message.id == update.id)
                else {
                    return false;
                };
                update.merge_into(&mut entry.message);
                true
            }
            MessageEvent::Deleted(delete) => {
                let before = self.entries.len();
                self.entries.retain(|entry| entry.message.id != delete.id);
                self.entries.len() != before
            }
            MessageEvent::Other { .. } => false,
        }
    }

    pub fn groups(&self) -> Vec<MessageGroup> {
        group_messages(&self.entries)
    }
}

#[cfg(test)]
#[path = "tests/timeline_tests.rs"]
mod tests;

use std::sync::Arc;

use shared::{
    domain::{ChannelId, GuildId, Message, MessageId, Permissions},
    protocol::{CreateMessageRequest, EditMessageRequest, MessageEvent},
};
use tracing::{debug, warn};

use crate::{
    error::HttpError,
    listeners::MessageSubscription,
    permissions::has_permission,
    session::Session,
    timeline::{make_stream_token, ChannelTimeline, MessageGroup},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewStatus {
    Loading,
    Loaded,
    AccessDenied,
    Failed(String),
}

/// State behind one open channel: its timeline and live subscription.
/// Dropping the view stops delivery for this channel.
pub struct ChannelView {
    session: Arc<Session>,
    guild_id: GuildId,
    channel_id: ChannelId,
    subscription: MessageSubscription,
    timeline: ChannelTimeline,
    status: ViewStatus,
}

impl ChannelView {
    /// Subscribes before fetching history so nothing created in between is
    /// missed; such events are applied on the next [`Self::next_event`] and
    /// replace the history copy of a message instead of repeating it.
    pub async fn open(session: Arc<Session>, guild_id: GuildId, channel_id: ChannelId) -> Self {
        let subscription = session.subscribe_messages(channel_id.clone());
        let mut view = Self {
            session,
            guild_id,
            channel_id,
            subscription,
            timeline: ChannelTimeline::new(),
            status: ViewStatus::Loading,
        };
        view.reload().await;
        view
    }

    /// Refetches history. Messages still pending that the server does not
    /// return yet are kept above it.
    pub async fn reload(&mut self) {
        self.status = ViewStatus::Loading;
        match self.session.http().get_messages(&self.channel_id).await {
            Ok(messages) => {
                debug!(channel_id = %self.channel_id, count = messages.len(), "session: history loaded");
                self.timeline.load(messages);
                self.status = ViewStatus::Loaded;
            }
            Err(err) => self.record_failure(&err),
        }
    }

    fn record_failure(&mut self, err: &HttpError) {
        if err.is_forbidden() {
            self.status = ViewStatus::AccessDenied;
        } else {
            warn!(channel_id = %self.channel_id, error = %err, "session: channel request failed");
            if self.status != ViewStatus::Loaded {
                self.status = ViewStatus::Failed(err.to_string());
            }
        }
    }

    pub fn guild_id(&self) -> &GuildId {
        &self.guild_id
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    pub fn status(&self) -> &ViewStatus {
        &self.status
    }

    pub fn timeline(&self) -> &ChannelTimeline {
        &self.timeline
    }

    pub fn groups(&self) -> Vec<MessageGroup> {
        self.timeline.groups()
    }

    /// Sends `text` as a new message. Blank input is ignored and yields
    /// `Ok(None)`. The created message stays pending until the gateway
    /// echoes it back with the same stream token.
    pub async fn send_message(
        &mut self,
        text: &str,
        replying_to: Option<MessageId>,
    ) -> Result<Option<Message>, HttpError> {
        let content = text.trim();
        if content.is_empty() {
            return Ok(None);
        }

        let request = CreateMessageRequest {
            content: content.to_string(),
            replying_to,
            stream: Some(make_stream_token()),
        };
        let mut created = match self
            .session
            .http()
            .create_message(&self.channel_id, &request)
            .await
        {
            Ok(created) => created,
            Err(err) => {
                self.record_failure(&err);
                return Err(err);
            }
        };

        if created.stream.is_none() {
            created.stream = request.stream;
        }
        if !self.timeline.contains(&created.id) {
            self.timeline.push_pending(created.clone());
        }
        Ok(Some(created))
    }

    pub async fn edit_message(
        &mut self,
        message_id: &MessageId,
        content: &str,
    ) -> Result<(), HttpError> {
        let body = EditMessageRequest {
            content: Some(content.trim().to_string()),
        };
        let result = self
            .session
            .http()
            .edit_message(&self.channel_id, message_id, &body)
            .await;
        if let Err(err) = &result {
            self.record_failure(err);
        }
        result
    }

    pub async fn delete_message(&mut self, message_id: &MessageId) -> Result<(), HttpError> {
        let result = self
            .session
            .http()
            .delete_message(&self.channel_id, message_id)
            .await;
        if let Err(err) = &result {
            self.record_failure(err);
        }
        result
    }

    /// Waits for the next event on this channel and applies it. `None` once
    /// the session is gone.
    pub async fn next_event(&mut self) -> Option<MessageEvent> {
        let event = self.subscription.recv().await?;
        self.timeline.apply(&event);
        Some(event)
    }

    /// Applies every event already queued without waiting. Returns how many
    /// were applied.
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.subscription.try_recv() {
            self.timeline.apply(&event);
            applied += 1;
        }
        applied
    }

    pub async fn can_delete_messages(&self) -> bool {
        let cache = self.session.cache();
        let cache = cache.read().await;
        let Some(guild) = cache.guild(&self.guild_id) else {
            return false;
        };
        let Some(member) = cache.current_member(&self.guild_id) else {
            return false;
        };
        let Some(channel) = guild.channel(&self.channel_id) else {
            return false;
        };
        has_permission(member, guild, Permissions::DELETE_MESSAGE, Some(channel))
    }
}

#[cfg(test)]
#[path = "tests/channel_view_tests.rs"]
mod tests;

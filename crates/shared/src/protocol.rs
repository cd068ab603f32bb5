use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{ChannelId, GuildSnapshot, Message, MessageId, PartialChannel, Presence, UserId},
    error::DecodeError,
};

/// Resource events: identify, ready, guilds, channels, messages.
pub const OP_DISPATCH: u8 = 0;
/// Presence events.
pub const OP_PRESENCE: u8 = 1;

pub const EVENT_IDENTIFY: &str = "IDENTIFY";
pub const EVENT_READY: &str = "READY";
pub const EVENT_GUILD_CREATE: &str = "GUILD_CREATE";
pub const EVENT_CHANNEL_CREATE: &str = "CHANNEL_CREATE";
pub const EVENT_CHANNEL_DELETE: &str = "CHANNEL_DELETE";
pub const EVENT_PRESENCE_UPDATE: &str = "PRESENCE_UPDATE";
pub const EVENT_MESSAGE_CREATE: &str = "MESSAGE_CREATE";
pub const EVENT_MESSAGE_UPDATE: &str = "MESSAGE_UPDATE";
pub const EVENT_MESSAGE_DELETE: &str = "MESSAGE_DELETE";
pub const MESSAGE_EVENT_PREFIX: &str = "MESSAGE_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub op: u8,
    pub t: String,
    pub d: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identify {
    pub token: String,
}

impl Envelope<Identify> {
    pub fn identify(token: impl Into<String>) -> Self {
        Self {
            op: OP_DISPATCH,
            t: EVENT_IDENTIFY.to_string(),
            d: Identify {
                token: token.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyEvent {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub guild_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageUpdate {
    pub id: MessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replying_to: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
}

impl MessageUpdate {
    /// Overwrites every field the update carries; absent fields keep their
    /// stored value.
    pub fn merge_into(&self, message: &mut Message) {
        if let Some(content) = &self.content {
            message.content = content.clone();
        }
        if let Some(replying_to) = &self.replying_to {
            message.replying_to = Some(replying_to.clone());
        }
        if let Some(created_by) = &self.created_by {
            message.created_by = created_by.clone();
        }
        if let Some(created_at) = self.created_at {
            message.created_at = created_at;
        }
        if let Some(stream) = &self.stream {
            message.stream = Some(stream.clone());
        }
        if let Some(channel_id) = &self.channel_id {
            message.channel_id = Some(channel_id.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDelete {
    pub id: MessageId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
}

/// Channel-scoped message traffic. Never applied to the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageEvent {
    Created(Message),
    Updated(MessageUpdate),
    Deleted(MessageDelete),
    /// A `MESSAGE_*` type this client has no dedicated handling for.
    Other {
        kind: String,
        channel_id: Option<ChannelId>,
        payload: Value,
    },
}

impl MessageEvent {
    pub fn kind(&self) -> &str {
        match self {
            MessageEvent::Created(_) => EVENT_MESSAGE_CREATE,
            MessageEvent::Updated(_) => EVENT_MESSAGE_UPDATE,
            MessageEvent::Deleted(_) => EVENT_MESSAGE_DELETE,
            MessageEvent::Other { kind, .. } => kind,
        }
    }

    pub fn channel_id(&self) -> Option<&ChannelId> {
        match self {
            MessageEvent::Created(message) => message.channel_id.as_ref(),
            MessageEvent::Updated(update) => update.channel_id.as_ref(),
            MessageEvent::Deleted(delete) => delete.channel_id.as_ref(),
            MessageEvent::Other { channel_id, .. } => channel_id.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    Ready(ReadyEvent),
    GuildCreate(GuildSnapshot),
    ChannelCreate(PartialChannel),
    ChannelDelete(PartialChannel),
    PresenceUpdate(Presence),
    Message(MessageEvent),
    Unknown { op: u8, t: String },
}

impl GatewayEvent {
    /// Decodes one text frame. Unrecognized `op`/`t` pairs come back as
    /// [`GatewayEvent::Unknown`]; only structurally broken frames fail.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let envelope: Envelope<Value> =
            serde_json::from_str(text).map_err(DecodeError::InvalidEnvelope)?;
        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: Envelope<Value>) -> Result<Self, DecodeError> {
        let Envelope { op, t, d } = envelope;
        let event = match (op, t.as_str()) {
            (OP_DISPATCH, EVENT_READY) => GatewayEvent::Ready(payload(&t, d)?),
            (OP_DISPATCH, EVENT_GUILD_CREATE) => GatewayEvent::GuildCreate(payload(&t, d)?),
            (OP_DISPATCH, EVENT_CHANNEL_CREATE) => GatewayEvent::ChannelCreate(payload(&t, d)?),
            (OP_DISPATCH, EVENT_CHANNEL_DELETE) => GatewayEvent::ChannelDelete(payload(&t, d)?),
            (OP_DISPATCH, EVENT_MESSAGE_CREATE) => {
                GatewayEvent::Message(MessageEvent::Created(payload(&t, d)?))
            }
            (OP_DISPATCH, EVENT_MESSAGE_UPDATE) => {
                GatewayEvent::Message(MessageEvent::Updated(payload(&t, d)?))
            }
            (OP_DISPATCH, EVENT_MESSAGE_DELETE) => {
                GatewayEvent::Message(MessageEvent::Deleted(payload(&t, d)?))
            }
            (OP_DISPATCH, kind) if kind.starts_with(MESSAGE_EVENT_PREFIX) => {
                let channel_id = d
                    .get("channelId")
                    .and_then(Value::as_str)
                    .map(ChannelId::from);
                GatewayEvent::Message(MessageEvent::Other {
                    kind: t,
                    channel_id,
                    payload: d,
                })
            }
            (OP_PRESENCE, EVENT_PRESENCE_UPDATE) => GatewayEvent::PresenceUpdate(payload(&t, d)?),
            _ => GatewayEvent::Unknown { op, t },
        };
        Ok(event)
    }
}

fn payload<T: DeserializeOwned>(t: &str, d: Value) -> Result<T, DecodeError> {
    serde_json::from_value(d).map_err(|source| DecodeError::InvalidPayload {
        t: t.to_string(),
        source,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replying_to: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditMessageRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChannelRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Body returned by the API alongside a non-2xx status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<Value>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            title: None,
            message: message.into(),
            extra_data: None,
        }
    }

    /// A `title` replaces the message and discards any extra data.
    pub fn into_parts(self) -> (String, Option<Value>) {
        match self.title {
            Some(title) => (title, None),
            None => (self.message, self.extra_data),
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid gateway envelope: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),
    #[error("invalid payload for {t}: {source}")]
    InvalidPayload {
        t: String,
        #[source]
        source: serde_json::Error,
    },
}

use serde_json::Value;
use thiserror::Error;

/// Failure of a request/response call.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request failed with status {status}: {message}")]
    Status {
        status: u16,
        message: String,
        extra_data: Option<Value>,
    },
    #[error("request transport failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl HttpError {
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            HttpError::Transport(err) => err.status().map(|status| status.as_u16()),
        }
    }

    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no stored credential; log in first")]
    MissingCredential,
    #[error("invalid gateway url: {0}")]
    InvalidGatewayUrl(String),
    #[error("credential storage failed: {0}")]
    TokenStore(String),
}

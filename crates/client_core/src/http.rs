use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{ChannelId, GuildId, Message, MessageId, PartialChannel},
    error::ErrorBody,
    protocol::{
        CreateChannelRequest, CreateMessageRequest, EditMessageRequest, LoginRequest,
        LoginResponse,
    },
};
use tracing::debug;

use crate::error::HttpError;

/// Request/response client for the REST API. Every call except `login`
/// carries the bearer credential.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    api_url: String,
    token: Option<String>,
}

impl HttpClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        let api_url: String = api_url.into();
        Self {
            http: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{path}", self.api_url))
            .header(CONTENT_TYPE, "application/json");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, HttpError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.json::<ErrorBody>().await.unwrap_or_else(|_| {
            ErrorBody::new(status.canonical_reason().unwrap_or("request failed"))
        });
        let (message, extra_data) = body.into_parts();
        debug!(status = status.as_u16(), %message, "http: request rejected");
        Err(HttpError::Status {
            status: status.as_u16(),
            message,
            extra_data,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, HttpError> {
        Ok(self.send(builder).await?.json().await?)
    }

    /// For calls whose success carries no payload (usually 204).
    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), HttpError> {
        let response = self.send(builder).await?;
        if response.status() != StatusCode::NO_CONTENT {
            debug!(status = response.status().as_u16(), "http: ignoring response body");
        }
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String, HttpError> {
        let builder = self
            .http
            .post(format!("{}/api/account/login", self.api_url))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            });
        let response: LoginResponse = self.send_json(builder).await?;
        Ok(response.token)
    }

    /// Channel history, newest first.
    pub async fn get_messages(&self, channel_id: &ChannelId) -> Result<Vec<Message>, HttpError> {
        self.send_json(self.request(Method::GET, &format!("/api/channels/{channel_id}/messages")))
            .await
    }

    pub async fn create_message(
        &self,
        channel_id: &ChannelId,
        body: &CreateMessageRequest,
    ) -> Result<Message, HttpError> {
        self.send_json(
            self.request(Method::POST, &format!("/api/channels/{channel_id}/messages"))
                .json(body),
        )
        .await
    }

    pub async fn edit_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        body: &EditMessageRequest,
    ) -> Result<(), HttpError> {
        self.send_empty(
            self.request(
                Method::PATCH,
                &format!("/api/channels/{channel_id}/messages/{message_id}"),
            )
            .json(body),
        )
        .await
    }

    pub async fn delete_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
    ) -> Result<(), HttpError> {
        self.send_empty(self.request(
            Method::DELETE,
            &format!("/api/channels/{channel_id}/messages/{message_id}"),
        ))
        .await
    }

    pub async fn create_channel(
        &self,
        guild_id: &GuildId,
        body: &CreateChannelRequest,
    ) -> Result<PartialChannel, HttpError> {
        self.send_json(
            self.request(Method::POST, &format!("/api/guilds/{guild_id}/channels"))
                .json(body),
        )
        .await
    }

    pub async fn delete_channel(&self, channel_id: &ChannelId) -> Result<(), HttpError> {
        self.send_empty(self.request(Method::DELETE, &format!("/api/channels/{channel_id}")))
            .await
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;

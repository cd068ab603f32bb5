use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use shared::domain::ChannelId;
use tokio::{
    sync::{broadcast, RwLock},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{info, warn};
use url::Url;

use crate::{
    cache::CacheStore,
    config::ClientSettings,
    error::SessionError,
    gateway::{Gateway, GatewayState},
    http::HttpClient,
    listeners::MessageSubscription,
    token_store::TokenStore,
    ClientEvent,
};

/// Exponential reconnect delay: starts at `initial`, doubles per failed
/// attempt, never exceeds `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    initial: Duration,
    max: Duration,
}

impl ReconnectPolicy {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
        }
    }

    pub fn initial(&self) -> Duration {
        self.initial
    }

    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

/// One authenticated client: credential, request client, gateway state and
/// cache. Everything the UI needs hangs off this object.
pub struct Session {
    settings: ClientSettings,
    token: String,
    http: HttpClient,
    gateway: Gateway,
    token_store: Arc<dyn TokenStore>,
}

impl Session {
    /// Builds a session from the stored credential. A missing credential is
    /// reported as [`SessionError::MissingCredential`] so the caller can
    /// route to login.
    pub async fn new(
        settings: ClientSettings,
        token_store: Arc<dyn TokenStore>,
    ) -> Result<Arc<Self>, SessionError> {
        let is_websocket = Url::parse(&settings.gateway_url)
            .map(|url| matches!(url.scheme(), "ws" | "wss"))
            .unwrap_or(false);
        if !is_websocket {
            return Err(SessionError::InvalidGatewayUrl(settings.gateway_url));
        }
        let token = token_store
            .load()
            .await
            .map_err(|err| SessionError::TokenStore(format!("{err:#}")))?
            .ok_or(SessionError::MissingCredential)?;
        let http = HttpClient::new(settings.api_url.clone()).with_token(token.clone());
        Ok(Arc::new(Self {
            settings,
            token,
            http,
            gateway: Gateway::new(),
            token_store,
        }))
    }

    /// Exchanges email and password for a credential, persists it and builds
    /// the session.
    pub async fn login(
        settings: ClientSettings,
        token_store: Arc<dyn TokenStore>,
        email: &str,
        password: &str,
    ) -> Result<Arc<Self>> {
        let token = HttpClient::new(settings.api_url.clone())
            .login(email, password)
            .await
            .context("login rejected")?;
        token_store
            .store(&token)
            .await
            .context("failed to persist credential")?;
        info!(email, "session: logged in");
        Ok(Self::new(settings, token_store).await?)
    }

    /// Forgets the stored credential. The running session keeps working
    /// until it is dropped.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.token_store
            .clear()
            .await
            .map_err(|err| SessionError::TokenStore(format!("{err:#}")))
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn cache(&self) -> Arc<RwLock<CacheStore>> {
        self.gateway.cache()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.gateway.subscribe_events()
    }

    pub fn subscribe_messages(&self, channel_id: ChannelId) -> MessageSubscription {
        self.gateway.subscribe_messages(channel_id)
    }

    /// Spawns the connection task. It reconnects forever; abort the handle
    /// to stop it.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let policy = session.settings.reconnect_policy();
            let mut delay = policy.initial();
            loop {
                match session.run_connection().await {
                    Ok(()) => warn!("session: gateway connection closed"),
                    Err(err) => {
                        warn!(error = %err, "session: gateway connection failed");
                        session.gateway.emit(ClientEvent::Error(format!("{err:#}")));
                    }
                }

                if session.gateway.state().await == GatewayState::Ready {
                    delay = policy.initial();
                }
                session.gateway.reset().await;

                info!(delay_ms = delay.as_millis() as u64, "session: reconnecting");
                tokio::time::sleep(delay).await;
                delay = policy.next_delay(delay);
            }
        })
    }

    /// One socket lifetime: identify first, then apply frames in arrival
    /// order until the server closes or the transport fails.
    async fn run_connection(&self) -> Result<()> {
        let gateway_url = self.settings.gateway_url.as_str();
        info!(gateway_url, "session: connecting");
        let (ws_stream, _) = connect_async(gateway_url)
            .await
            .with_context(|| format!("failed to connect websocket: {gateway_url}"))?;
        let (mut writer, mut reader) = ws_stream.split();

        let identify = self.gateway.on_open(&self.token).await?;
        writer
            .send(WsMessage::Text(identify))
            .await
            .context("failed to send identify")?;

        while let Some(frame) = reader.next().await {
            match frame.context("websocket receive failed")? {
                WsMessage::Text(text) => self.gateway.handle_text(&text).await,
                WsMessage::Close(_) => break,
                _ => {}
            }
        }
        Ok(())
    }

    /// Resolves once the gateway has finished hydrating.
    pub async fn wait_until_ready(&self) {
        let mut events = self.subscribe_events();
        loop {
            if self.gateway.state().await == GatewayState::Ready {
                return;
            }
            match events.recv().await {
                Ok(ClientEvent::Ready) => return,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use url::Url;

use crate::{error::SessionError, session::ReconnectPolicy};

pub const CONFIG_FILE: &str = "client.toml";
const GATEWAY_PATH: &str = "/api/websocket";
const GATEWAY_QUERY: &str = "format=json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_url: String,
    pub gateway_url: String,
    pub token_path: Option<PathBuf>,
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:4000".into(),
            gateway_url: "ws://localhost:4000/api/websocket?format=json".into(),
            token_path: None,
            reconnect_initial_ms: 500,
            reconnect_max_ms: 30_000,
        }
    }
}

impl ClientSettings {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            Duration::from_millis(self.reconnect_initial_ms),
            Duration::from_millis(self.reconnect_max_ms),
        )
    }
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(CONFIG_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat key/value file, then the environment. When only
/// the API url is configured, the gateway url is derived from it.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> ClientSettings {
    let mut settings = ClientSettings::default();
    let mut gateway_configured = false;

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("api_url") {
                settings.api_url = v.clone();
            }
            if let Some(v) = file_cfg.get("gateway_url") {
                settings.gateway_url = v.clone();
                gateway_configured = true;
            }
            if let Some(v) = file_cfg.get("token_path") {
                settings.token_path = Some(PathBuf::from(v));
            }
            if let Some(v) = file_cfg.get("reconnect_initial_ms").and_then(|v| v.parse().ok()) {
                settings.reconnect_initial_ms = v;
            }
            if let Some(v) = file_cfg.get("reconnect_max_ms").and_then(|v| v.parse().ok()) {
                settings.reconnect_max_ms = v;
            }
        }
    }

    if let Some(v) = env("API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = env("GATEWAY_URL") {
        settings.gateway_url = v;
        gateway_configured = true;
    }
    if let Some(v) = env("APP__GATEWAY_URL") {
        settings.gateway_url = v;
        gateway_configured = true;
    }

    if let Some(v) = env("APP__TOKEN_PATH") {
        settings.token_path = Some(PathBuf::from(v));
    }

    if let Some(v) = env("APP__RECONNECT_INITIAL_MS").and_then(|v| v.parse().ok()) {
        settings.reconnect_initial_ms = v;
    }
    if let Some(v) = env("APP__RECONNECT_MAX_MS").and_then(|v| v.parse().ok()) {
        settings.reconnect_max_ms = v;
    }

    if !gateway_configured && settings.api_url != ClientSettings::default().api_url {
        if let Ok(derived) = gateway_url_from_api(&settings.api_url) {
            settings.gateway_url = derived;
        }
    }

    settings
}

/// `http://host` becomes `ws://host/api/websocket?format=json`, `https`
/// becomes `wss`.
pub fn gateway_url_from_api(api_url: &str) -> Result<String, SessionError> {
    let invalid = || SessionError::InvalidGatewayUrl(api_url.to_string());
    let mut url = Url::parse(api_url).map_err(|_| invalid())?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        _ => return Err(invalid()),
    };
    url.set_scheme(scheme).map_err(|_| invalid())?;
    url.set_path(GATEWAY_PATH);
    url.set_query(Some(GATEWAY_QUERY));
    Ok(url.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

use super::*;

use std::{
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn no_env(_: &str) -> Option<String> {
    None
}

fn temp_config(contents: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("shattered_client_{suffix}.toml"));
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn missing_file_yields_defaults() {
    let settings = load_settings_from(Path::new("/definitely/not/here.toml"), no_env);
    assert_eq!(settings, ClientSettings::default());
}

#[test]
fn file_values_are_applied_and_env_wins() {
    let path = temp_config(
        r#"
api_url = "https://chat.example.com"
reconnect_initial_ms = "250"
token_path = "/tmp/token"
"#,
    );

    let settings = load_settings_from(&path, |key| match key {
        "APP__RECONNECT_MAX_MS" => Some("5000".to_string()),
        "APP__API_URL" => Some("https://override.example.com".to_string()),
        _ => None,
    });

    assert_eq!(settings.api_url, "https://override.example.com");
    assert_eq!(
        settings.gateway_url,
        "wss://override.example.com/api/websocket?format=json"
    );
    assert_eq!(settings.reconnect_initial_ms, 250);
    assert_eq!(settings.reconnect_max_ms, 5000);
    assert_eq!(settings.token_path, Some(PathBuf::from("/tmp/token")));

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn explicit_gateway_url_is_not_overwritten() {
    let settings = load_settings_from(Path::new("/definitely/not/here.toml"), |key| match key {
        "API_URL" => Some("http://10.0.0.2:4000".to_string()),
        "GATEWAY_URL" => Some("ws://10.0.0.3:9000/gw".to_string()),
        _ => None,
    });

    assert_eq!(settings.gateway_url, "ws://10.0.0.3:9000/gw");
}

#[test]
fn unparsable_numbers_keep_defaults() {
    let settings = load_settings_from(Path::new("/definitely/not/here.toml"), |key| match key {
        "APP__RECONNECT_INITIAL_MS" => Some("soon".to_string()),
        _ => None,
    });
    assert_eq!(settings.reconnect_initial_ms, 500);
}

#[test]
fn derives_gateway_url_from_api_url() {
    assert_eq!(
        gateway_url_from_api("http://localhost:4000").expect("derive"),
        "ws://localhost:4000/api/websocket?format=json"
    );
    assert_eq!(
        gateway_url_from_api("https://chat.example.com/").expect("derive"),
        "wss://chat.example.com/api/websocket?format=json"
    );
    assert!(gateway_url_from_api("ftp://example.com").is_err());
    assert!(gateway_url_from_api("not a url").is_err());
}

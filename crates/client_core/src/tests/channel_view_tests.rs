use super::*;

use axum::{
    extract::Path,
    http::StatusCode as AxumStatus,
    response::{IntoResponse, Response as AxumResponse},
    routing::get,
    Json, Router,
};
use serde_json::json;
use shared::{domain::UserId, protocol::GatewayEvent};
use tokio::net::TcpListener;

use crate::{
    config::ClientSettings,
    test_support::{channel, member, message, role, snapshot, GUILD},
    timeline::STREAM_TOKEN_LEN,
    token_store::MemoryTokenStore,
};

async fn list_messages(Path(channel_id): Path<String>) -> AxumResponse {
    match channel_id.as_str() {
        "forbidden" => (
            AxumStatus::FORBIDDEN,
            Json(json!({"message": "Missing access"})),
        )
            .into_response(),
        "broken" => (
            AxumStatus::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "database unavailable"})),
        )
            .into_response(),
        _ => Json(vec![message("2", "u1", 110), message("1", "u1", 100)]).into_response(),
    }
}

async fn create_message(
    Path(channel_id): Path<String>,
    Json(body): Json<CreateMessageRequest>,
) -> AxumResponse {
    if channel_id == "forbidden" {
        return AxumStatus::FORBIDDEN.into_response();
    }
    let mut created = message("10", "me", 200);
    created.content = body.content;
    created.replying_to = body.replying_to;
    created.stream = body.stream;
    Json(created).into_response()
}

async fn open_session() -> Arc<Session> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().route(
        "/api/channels/:channel_id/messages",
        get(list_messages).post(create_message),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let settings = ClientSettings {
        api_url: format!("http://{addr}"),
        ..ClientSettings::default()
    };
    Session::new(settings, Arc::new(MemoryTokenStore::with_token("secret")))
        .await
        .expect("session")
}

#[tokio::test]
async fn open_loads_history_and_groups_it() {
    let session = open_session().await;
    let view = ChannelView::open(session, GuildId::from(GUILD), ChannelId::from("c1")).await;

    assert_eq!(view.status(), &ViewStatus::Loaded);
    assert_eq!(view.timeline().len(), 2);
    let groups = view.groups();
    assert_eq!(groups.len(), 1);
    let ids: Vec<&str> = groups[0]
        .content
        .iter()
        .map(|content| content.id.as_str())
        .collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn forbidden_history_marks_access_denied() {
    let session = open_session().await;
    let view =
        ChannelView::open(session, GuildId::from(GUILD), ChannelId::from("forbidden")).await;

    assert_eq!(view.status(), &ViewStatus::AccessDenied);
    assert!(view.timeline().is_empty());
}

#[tokio::test]
async fn other_failures_keep_the_message() {
    let session = open_session().await;
    let view = ChannelView::open(session, GuildId::from(GUILD), ChannelId::from("broken")).await;

    match view.status() {
        ViewStatus::Failed(message) => assert!(message.contains("database unavailable")),
        other => panic!("unexpected status: {other:?}"),
    }
}

#[tokio::test]
async fn blank_input_is_not_sent() {
    let session = open_session().await;
    let mut view = ChannelView::open(session, GuildId::from(GUILD), ChannelId::from("c1")).await;

    let sent = view.send_message("   \n\t", None).await.expect("no error");

    assert!(sent.is_none());
    assert_eq!(view.timeline().len(), 2);
}

#[tokio::test]
async fn sent_message_is_pending_until_gateway_confirms() {
    let session = open_session().await;
    let mut view = ChannelView::open(
        Arc::clone(&session),
        GuildId::from(GUILD),
        ChannelId::from("c1"),
    )
    .await;

    let sent = view
        .send_message("  hello there  ", Some(MessageId::from("2")))
        .await
        .expect("sent")
        .expect("not blank");

    assert_eq!(sent.content, "hello there");
    assert_eq!(sent.replying_to, Some(MessageId::from("2")));
    let stream = sent.stream.clone().expect("stream token");
    assert_eq!(stream.len(), STREAM_TOKEN_LEN);
    assert!(stream.chars().all(|c| c.is_ascii_alphanumeric()));
    assert!(view.timeline().entries()[0].pending);

    session
        .gateway()
        .apply(GatewayEvent::Message(MessageEvent::Created(sent)))
        .await;
    let event = view.next_event().await.expect("event");

    assert_eq!(event.kind(), "MESSAGE_CREATE");
    assert_eq!(view.timeline().len(), 3);
    assert!(!view.timeline().entries()[0].pending);
    assert_eq!(view.timeline().entries()[0].message.id, MessageId::from("10"));
}

#[tokio::test]
async fn events_for_other_channels_are_not_applied() {
    let session = open_session().await;
    let mut view = ChannelView::open(
        Arc::clone(&session),
        GuildId::from(GUILD),
        ChannelId::from("c1"),
    )
    .await;

    let mut elsewhere = message("99", "u2", 300);
    elsewhere.channel_id = Some(ChannelId::from("c2"));
    session
        .gateway()
        .apply(GatewayEvent::Message(MessageEvent::Created(elsewhere)))
        .await;
    session
        .gateway()
        .apply(GatewayEvent::Message(MessageEvent::Created(message(
            "3", "u2", 120,
        ))))
        .await;

    assert_eq!(view.drain_events(), 1);
    assert_eq!(view.timeline().len(), 3);
    assert!(view.timeline().contains(&MessageId::from("3")));
}

#[tokio::test]
async fn creation_during_history_load_is_not_duplicated() {
    let session = open_session().await;
    let mut view = ChannelView::open(
        Arc::clone(&session),
        GuildId::from(GUILD),
        ChannelId::from("c1"),
    )
    .await;

    session
        .gateway()
        .apply(GatewayEvent::Message(MessageEvent::Created(message(
            "2", "u1", 110,
        ))))
        .await;
    view.reload().await;

    assert_eq!(view.drain_events(), 1);
    let ids: Vec<&str> = view
        .timeline()
        .entries()
        .iter()
        .map(|entry| entry.message.id.as_str())
        .collect();
    assert_eq!(ids, vec!["2", "1"]);
}

#[tokio::test]
async fn reload_keeps_unconfirmed_sends() {
    let session = open_session().await;
    let mut view = ChannelView::open(session, GuildId::from(GUILD), ChannelId::from("c1")).await;

    let sent = view
        .send_message("still sending", None)
        .await
        .expect("sent")
        .expect("not blank");
    view.reload().await;

    assert_eq!(view.status(), &ViewStatus::Loaded);
    assert_eq!(view.timeline().len(), 3);
    let first = &view.timeline().entries()[0];
    assert!(first.pending);
    assert_eq!(first.message.id, sent.id);
}

#[tokio::test]
async fn closing_the_view_unsubscribes() {
    let session = open_session().await;
    let view = ChannelView::open(
        Arc::clone(&session),
        GuildId::from(GUILD),
        ChannelId::from("c1"),
    )
    .await;
    let channel_id = ChannelId::from("c1");
    assert_eq!(session.gateway().listeners().subscriber_count(&channel_id), 1);

    drop(view);

    assert_eq!(session.gateway().listeners().subscriber_count(&channel_id), 0);
}

#[tokio::test]
async fn delete_permission_follows_cached_roles() {
    let session = open_session().await;
    let view = ChannelView::open(
        Arc::clone(&session),
        GuildId::from(GUILD),
        ChannelId::from("c1"),
    )
    .await;
    assert!(!view.can_delete_messages().await);

    let ready = json!({
        "op": 0,
        "t": "READY",
        "d": {"id": "me", "username": "me", "displayName": "Me", "guildCount": 1}
    });
    session.gateway().handle_text(&ready.to_string()).await;
    session
        .gateway()
        .apply(GatewayEvent::GuildCreate(snapshot(
            GUILD,
            vec![member("me", &["janitor"])],
            vec![channel("c1", None, 0)],
            vec![role("janitor", Permissions::DELETE_MESSAGE, 10)],
        )))
        .await;

    assert!(view.can_delete_messages().await);
    assert_eq!(
        session
            .cache()
            .read()
            .await
            .current_user()
            .map(|user| user.id.clone()),
        Some(UserId::from("me"))
    );
}

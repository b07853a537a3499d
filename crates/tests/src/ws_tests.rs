use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use crate::fixtures::test_app::TestApp;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(app: &TestApp, token: &str) -> WsClient {
    let (mut ws, _) = connect_async(app.ws_url(token))
        .await
        .expect("WebSocket handshake failed");

    // First frame is always the connected event.
    let hello = read_json(&mut ws).await;
    assert_eq!(hello["type"].as_str(), Some("connected"));
    ws
}

async fn read_json(ws: &mut WsClient) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("Timed out waiting for WS message")
            .expect("WS stream closed")
            .expect("WS read error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("WS frame was not JSON");
        }
    }
}

async fn send_json(ws: &mut WsClient, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

#[tokio::test]
async fn connection_without_valid_token_is_refused() {
    let app = TestApp::spawn().await;

    let result = connect_async(app.ws_url("not-a-jwt")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn dm_send_acks_sender_and_reaches_subscribers() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("wsdm").await;

    // Create the chat over HTTP first.
    let resp = app
        .auth_post("/api/chats", &seeded.owner.access_token)
        .json(&serde_json::json!({
            "room_id": seeded.room_id,
            "participant_id": seeded.tenant.id,
        }))
        .send()
        .await
        .unwrap();
    let chat: Value = resp.json().await.unwrap();
    let chat_id = chat["data"]["id"].as_str().unwrap().to_string();

    let mut owner_ws = connect(&app, &seeded.owner.access_token).await;
    let mut tenant_ws = connect(&app, &seeded.tenant.access_token).await;

    for ws in [&mut owner_ws, &mut tenant_ws] {
        send_json(
            ws,
            serde_json::json!({
                "type": "join-chat",
                "ack": 1,
                "data": { "chat_id": chat_id },
            }),
        )
        .await;
        let ack = read_json(ws).await;
        assert_eq!(ack["type"].as_str(), Some("ack"));
        assert_eq!(ack["ok"].as_bool(), Some(true));
    }

    send_json(
        &mut owner_ws,
        serde_json::json!({
            "type": "send-dm-message",
            "ack": 2,
            "data": { "chat_id": chat_id, "content": "hello over ws" },
        }),
    )
    .await;

    // Sender gets the persisted message back in the ack, not as a broadcast.
    let ack = read_json(&mut owner_ws).await;
    assert_eq!(ack["type"].as_str(), Some("ack"));
    assert_eq!(ack["ack"].as_u64(), Some(2));
    assert_eq!(ack["ok"].as_bool(), Some(true));
    assert_eq!(
        ack["data"]["message"]["content"].as_str(),
        Some("hello over ws")
    );

    // The counterpart gets the chat broadcast (full message) and the
    // personal notify (lightweight preview).
    let first = read_json(&mut tenant_ws).await;
    let second = read_json(&mut tenant_ws).await;
    for event in [&first, &second] {
        match event["type"].as_str().unwrap() {
            "dm:new-message" => {
                assert_eq!(
                    event["data"]["message"]["content"].as_str(),
                    Some("hello over ws")
                );
            }
            "dm:notify" => {
                let preview = &event["data"]["preview"];
                assert_eq!(preview["content"].as_str(), Some("hello over ws"));
                assert_eq!(
                    preview["sender_id"].as_str(),
                    Some(seeded.owner.id.as_str())
                );
                assert!(preview["timestamp"].is_string());
                assert!(event["data"].get("message").is_none());
            }
            other => panic!("Unexpected event type: {other}"),
        }
    }
    assert_ne!(first["type"], second["type"]);
}

#[tokio::test]
async fn dm_errors_answer_in_band_without_disconnecting() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("wserr").await;

    let mut ws = connect(&app, &seeded.owner.access_token).await;

    send_json(
        &mut ws,
        serde_json::json!({
            "type": "send-dm-message",
            "ack": 7,
            "data": {
                "chat_id": bson::oid::ObjectId::new().to_hex(),
                "content": "into the void",
            },
        }),
    )
    .await;

    let ack = read_json(&mut ws).await;
    assert_eq!(ack["ack"].as_u64(), Some(7));
    assert_eq!(ack["ok"].as_bool(), Some(false));
    assert!(ack["error"].is_string());

    // The socket is still usable afterwards.
    send_json(
        &mut ws,
        serde_json::json!({
            "type": "join-chat",
            "ack": 8,
            "data": { "chat_id": bson::oid::ObjectId::new().to_hex() },
        }),
    )
    .await;
    let ack = read_json(&mut ws).await;
    assert_eq!(ack["ok"].as_bool(), Some(true));
}

#[tokio::test]
async fn unknown_message_type_is_rejected_not_coerced() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("wskind").await;

    let resp = app
        .auth_post("/api/chats", &seeded.owner.access_token)
        .json(&serde_json::json!({
            "room_id": seeded.room_id,
            "participant_id": seeded.tenant.id,
        }))
        .send()
        .await
        .unwrap();
    let chat: Value = resp.json().await.unwrap();
    let chat_id = chat["data"]["id"].as_str().unwrap().to_string();

    let mut ws = connect(&app, &seeded.owner.access_token).await;

    send_json(
        &mut ws,
        serde_json::json!({
            "type": "send-dm-message",
            "ack": 3,
            "data": {
                "chat_id": chat_id,
                "content": "hello",
                "message_type": "carrier-pigeon",
            },
        }),
    )
    .await;

    let ack = read_json(&mut ws).await;
    assert_eq!(ack["ack"].as_u64(), Some(3));
    assert_eq!(ack["ok"].as_bool(), Some(false));
}

#[tokio::test]
async fn room_chat_join_is_membership_gated() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("wsgate").await;
    let stranger = app
        .register_user("ws@gate.test", "wsgate_user", "Gate Crasher", "Gate123!")
        .await;

    let mut ws = connect(&app, &stranger.access_token).await;

    send_json(
        &mut ws,
        serde_json::json!({
            "type": "join-room-chat",
            "ack": 1,
            "data": { "room_id": seeded.room_id },
        }),
    )
    .await;

    let ack = read_json(&mut ws).await;
    assert_eq!(ack["ok"].as_bool(), Some(false));
}

#[tokio::test]
async fn room_broadcast_includes_the_sender() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_room("wsroom").await;

    let mut owner_ws = connect(&app, &seeded.owner.access_token).await;
    let mut tenant_ws = connect(&app, &seeded.tenant.access_token).await;

    for (ws, _) in [(&mut owner_ws, "owner"), (&mut tenant_ws, "tenant")] {
        send_json(
            ws,
            serde_json::json!({
                "type": "join-room-chat",
                "ack": 1,
                "data": { "room_id": seeded.room_id },
            }),
        )
        .await;
        let ack = read_json(ws).await;
        assert_eq!(ack["ok"].as_bool(), Some(true));
    }

    send_json(
        &mut owner_ws,
        serde_json::json!({
            "type": "send-room-message",
            "ack": 2,
            "data": { "room_id": seeded.room_id, "content": "house meeting at 8" },
        }),
    )
    .await;

    // The sender's own connection receives the broadcast too, plus the ack.
    let first = read_json(&mut owner_ws).await;
    let second = read_json(&mut owner_ws).await;
    let mut types = vec![
        first["type"].as_str().unwrap().to_string(),
        second["type"].as_str().unwrap().to_string(),
    ];
    types.sort();
    assert_eq!(types, vec!["ack", "room:new-message"]);

    let event = read_json(&mut tenant_ws).await;
    assert_eq!(event["type"].as_str(), Some("room:new-message"));
    assert_eq!(
        event["data"]["message"]["content"].as_str(),
        Some("house meeting at 8")
    );
}

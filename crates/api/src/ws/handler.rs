use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use bson::oid::ObjectId;
use flatmate_db::models::MessageKind;
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    routes::{
        chat::{message_json, sender_json},
        room_chat::room_message_json,
    },
    state::AppState,
};

use super::{
    dispatcher,
    session::ChannelKey,
};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: String,
}

pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    // Verify JWT before accepting the WebSocket
    let claims = match state.auth.verify_access_token(&params.token) {
        Ok(c) => c,
        Err(_) => {
            return Response::builder()
                .status(401)
                .body("Unauthorized".into())
                .unwrap();
        }
    };

    let user_id = match ObjectId::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => {
            return Response::builder()
                .status(400)
                .body("Invalid user ID".into())
                .unwrap();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: ObjectId) {
    let connection_id = Uuid::new_v4().to_string();
    info!(?user_id, %connection_id, "WebSocket connected");

    let (sender, mut receiver) = socket.split();
    let sender = Arc::new(Mutex::new(sender));

    state
        .channels
        .add_connection(connection_id.clone(), sender.clone());
    // Every connection listens on its user's personal channel for the
    // lifetime of the socket.
    state
        .channels
        .join(ChannelKey::User(user_id), &connection_id);

    let connected = serde_json::json!({
        "type": "connected",
        "data": { "user_id": user_id.to_hex() },
    });
    dispatcher::send_to_connection(&state.channels, &connection_id, &connected).await;

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_client_message(&state, user_id, &connection_id, &text).await;
            }
            Ok(Message::Close(_)) => {
                break;
            }
            Err(e) => {
                warn!(?user_id, %connection_id, %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    state.channels.remove_connection(&connection_id);
    info!(?user_id, %connection_id, "WebSocket disconnected");
}

async fn handle_client_message(
    state: &AppState,
    user_id: ObjectId,
    connection_id: &str,
    text: &str,
) {
    let parsed: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return,
    };

    let msg_type = parsed.get("type").and_then(|t| t.as_str()).unwrap_or("");
    let ack = parsed.get("ack").cloned().unwrap_or(serde_json::Value::Null);
    let data = parsed.get("data");

    debug!(?user_id, %connection_id, msg_type, "WS message received");

    match msg_type {
        "join-chat" => {
            handle_join_chat(state, connection_id, data, ack).await;
        }
        "leave-chat" => {
            if let Some(chat_id) = data_object_id(data, "chat_id") {
                state
                    .channels
                    .leave(&ChannelKey::Chat(chat_id), connection_id);
            }
        }
        "send-dm-message" => {
            handle_send_dm(state, user_id, connection_id, data, ack).await;
        }
        "join-room-chat" => {
            handle_join_room_chat(state, user_id, connection_id, data, ack).await;
        }
        "leave-room-chat" => {
            if let Some(room_id) = data_object_id(data, "room_id") {
                state
                    .channels
                    .leave(&ChannelKey::Room(room_id), connection_id);
            }
        }
        "send-room-message" => {
            handle_send_room_message(state, user_id, connection_id, data, ack).await;
        }
        _ => {
            debug!(?user_id, msg_type, "Unknown WS message type");
        }
    }
}

fn data_object_id(data: Option<&serde_json::Value>, field: &str) -> Option<ObjectId> {
    data.and_then(|d| d.get(field))
        .and_then(|v| v.as_str())
        .and_then(|s| ObjectId::parse_str(s).ok())
}

fn data_string(data: Option<&serde_json::Value>, field: &str) -> Option<String> {
    data.and_then(|d| d.get(field))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Absent means text; a present but unrecognized kind is a client error,
/// not a silent fallback.
fn data_message_kind(data: Option<&serde_json::Value>) -> Option<MessageKind> {
    match data.and_then(|d| d.get("message_type")) {
        None => Some(MessageKind::default()),
        Some(v) => serde_json::from_value(v.clone()).ok(),
    }
}

async fn ack_ok(
    state: &AppState,
    connection_id: &str,
    ack: serde_json::Value,
    data: serde_json::Value,
) {
    let reply = serde_json::json!({
        "type": "ack",
        "ack": ack,
        "ok": true,
        "data": data,
    });
    dispatcher::send_to_connection(&state.channels, connection_id, &reply).await;
}

/// Failures are answered in-band; the socket stays open.
async fn ack_err(state: &AppState, connection_id: &str, ack: serde_json::Value, error: &str) {
    let reply = serde_json::json!({
        "type": "ack",
        "ack": ack,
        "ok": false,
        "error": error,
    });
    dispatcher::send_to_connection(&state.channels, connection_id, &reply).await;
}

/// Subscribes to a direct chat's channel. Join is unauthenticated beyond
/// the connection's JWT: sends into the chat still go through the service
/// layer's participant check, so a non-participant can subscribe but
/// receives nothing and can write nothing.
async fn handle_join_chat(
    state: &AppState,
    connection_id: &str,
    data: Option<&serde_json::Value>,
    ack: serde_json::Value,
) {
    let Some(chat_id) = data_object_id(data, "chat_id") else {
        ack_err(state, connection_id, ack, "Invalid chat_id").await;
        return;
    };

    state
        .channels
        .join(ChannelKey::Chat(chat_id), connection_id);

    ack_ok(
        state,
        connection_id,
        ack,
        serde_json::json!({ "chat_id": chat_id.to_hex() }),
    )
    .await;
}

async fn handle_send_dm(
    state: &AppState,
    user_id: ObjectId,
    connection_id: &str,
    data: Option<&serde_json::Value>,
    ack: serde_json::Value,
) {
    let Some(chat_id) = data_object_id(data, "chat_id") else {
        ack_err(state, connection_id, ack, "Invalid chat_id").await;
        return;
    };
    let content = data_string(data, "content").unwrap_or_default();
    let Some(message_type) = data_message_kind(data) else {
        ack_err(state, connection_id, ack, "Invalid message_type").await;
        return;
    };
    let file_url = data_string(data, "file_url");

    let sent = match state
        .chat
        .send_direct_message(chat_id, user_id, content, message_type, file_url)
        .await
    {
        Ok(sent) => sent,
        Err(e) => {
            ack_err(state, connection_id, ack, &e.to_string()).await;
            return;
        }
    };

    let mut message = message_json(&sent.message);
    message["sender"] = sender_json(&sent.sender);

    // Other subscribers of the chat get the message; the sending
    // connection gets it back in the ack only.
    let event = serde_json::json!({
        "type": "dm:new-message",
        "data": {
            "chat_id": chat_id.to_hex(),
            "message": message,
        },
    });
    dispatcher::broadcast_except(
        &state.channels,
        &ChannelKey::Chat(chat_id),
        connection_id,
        &event,
    )
    .await;

    // Counterpart notification on the personal channel, so unread badges
    // update even when the chat itself is not open. Carries a lightweight
    // preview rather than the full message.
    let notify = serde_json::json!({
        "type": "dm:notify",
        "data": {
            "chat_id": chat_id.to_hex(),
            "preview": {
                "content": sent.message.content,
                "sender_id": sent.message.sender_id.to_hex(),
                "timestamp": sent.message.created_at.try_to_rfc3339_string().unwrap_or_default(),
            },
        },
    });
    dispatcher::broadcast(
        &state.channels,
        &ChannelKey::User(sent.counterpart_id),
        &notify,
    )
    .await;

    ack_ok(
        state,
        connection_id,
        ack,
        serde_json::json!({
            "chat_id": chat_id.to_hex(),
            "message": message,
        }),
    )
    .await;
}

/// Subscribes to a room chat's channel. Unlike direct chats, membership is
/// checked against the live room fact before subscribing.
async fn handle_join_room_chat(
    state: &AppState,
    user_id: ObjectId,
    connection_id: &str,
    data: Option<&serde_json::Value>,
    ack: serde_json::Value,
) {
    let Some(room_id) = data_object_id(data, "room_id") else {
        ack_err(state, connection_id, ack, "Invalid room_id").await;
        return;
    };

    if let Err(e) = state.chat.open_room_chat(user_id, room_id).await {
        ack_err(state, connection_id, ack, &e.to_string()).await;
        return;
    }

    state
        .channels
        .join(ChannelKey::Room(room_id), connection_id);

    ack_ok(
        state,
        connection_id,
        ack,
        serde_json::json!({ "room_id": room_id.to_hex() }),
    )
    .await;
}

async fn handle_send_room_message(
    state: &AppState,
    user_id: ObjectId,
    connection_id: &str,
    data: Option<&serde_json::Value>,
    ack: serde_json::Value,
) {
    let Some(room_id) = data_object_id(data, "room_id") else {
        ack_err(state, connection_id, ack, "Invalid room_id").await;
        return;
    };
    let content = data_string(data, "content").unwrap_or_default();
    let Some(message_type) = data_message_kind(data) else {
        ack_err(state, connection_id, ack, "Invalid message_type").await;
        return;
    };
    let file_url = data_string(data, "file_url");

    let sent = match state
        .chat
        .send_room_message(room_id, user_id, content, message_type, file_url)
        .await
    {
        Ok(sent) => sent,
        Err(e) => {
            ack_err(state, connection_id, ack, &e.to_string()).await;
            return;
        }
    };

    let mut message = room_message_json(&sent.message);
    message["sender"] = sender_json(&sent.sender);

    // Room broadcasts include the sender's own connections, so every open
    // tab of the room converges on the same log.
    let event = serde_json::json!({
        "type": "room:new-message",
        "data": {
            "room_id": room_id.to_hex(),
            "chat_id": sent.chat_id.to_hex(),
            "message": message,
        },
    });
    dispatcher::broadcast(&state.channels, &ChannelKey::Room(room_id), &event).await;

    ack_ok(
        state,
        connection_id,
        ack,
        serde_json::json!({
            "room_id": room_id.to_hex(),
            "chat_id": sent.chat_id.to_hex(),
            "message": message,
        }),
    )
    .await;
}

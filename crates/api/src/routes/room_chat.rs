use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use flatmate_db::models::{RoomChat, RoomMessage};
use flatmate_services::messaging::log::DEFAULT_PAGE_LIMIT;
use serde_json::{Value, json};

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

use super::chat::{PageQuery, SendMessageRequest, parse_object_id, sender_json};

fn rfc3339(dt: bson::DateTime) -> String {
    dt.try_to_rfc3339_string().unwrap_or_default()
}

pub(crate) fn room_message_json(message: &RoomMessage) -> Value {
    json!({
        "id": message.id.to_hex(),
        "sender_id": message.sender_id.to_hex(),
        "content": message.content,
        "message_type": message.message_type,
        "file_url": message.file_url,
        "created_at": rfc3339(message.created_at),
    })
}

fn room_chat_json(chat: &RoomChat, with_messages: bool) -> Value {
    let mut body = json!({
        "id": chat.id.map(|id| id.to_hex()),
        "room_id": chat.room_id.to_hex(),
        "participants": chat.participants.iter().map(|p| p.to_hex()).collect::<Vec<_>>(),
        "last_message": chat.last_message.as_ref().map(|last| json!({
            "content": last.content,
            "sender_id": last.sender_id.to_hex(),
            "timestamp": rfc3339(last.timestamp),
        })),
        "read_by": chat.read_by.iter().map(|r| json!({
            "user_id": r.user_id.to_hex(),
            "read_at": rfc3339(r.read_at),
        })).collect::<Vec<_>>(),
        "created_at": rfc3339(chat.created_at),
        "updated_at": rfc3339(chat.updated_at),
    });
    if with_messages {
        body["messages"] = Value::Array(chat.messages.iter().map(room_message_json).collect());
    }
    body
}

/// GET /api/room-chats/{room_id} — fetch-or-create the room's group chat.
pub async fn get_room_chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let room_id = parse_object_id(&room_id, "room id")?;
    let chat = state.chat.open_room_chat(auth.user_id, room_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": room_chat_json(&chat, true),
    })))
}

/// POST /api/room-chats/{room_id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let room_id = parse_object_id(&room_id, "room id")?;
    let sent = state
        .chat
        .send_room_message(
            room_id,
            auth.user_id,
            body.content.unwrap_or_default(),
            body.message_type,
            body.file_url,
        )
        .await?;

    let mut data = room_message_json(&sent.message);
    data["sender"] = sender_json(&sent.sender);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": data,
        })),
    ))
}

/// GET /api/room-chats/{room_id}/messages?page&limit
pub async fn get_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let room_id = parse_object_id(&room_id, "room id")?;
    let page = state
        .chat
        .paginate_room_messages(
            room_id,
            auth.user_id,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        )
        .await?;

    let data: Vec<Value> = page.items.iter().map(room_message_json).collect();

    let mut pagination = json!({});
    if page.has_next {
        pagination["next"] = json!({ "page": page.page + 1, "limit": page.limit });
    }
    if page.has_prev {
        pagination["prev"] = json!({ "page": page.page - 1, "limit": page.limit });
    }

    Ok(Json(json!({
        "success": true,
        "count": data.len(),
        "total": page.total,
        "pagination": pagination,
        "data": data,
    })))
}

/// GET /api/room-chats/{room_id}/unread — cursor-based unread count.
pub async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let room_id = parse_object_id(&room_id, "room id")?;
    let unread = state.chat.room_unread(room_id, auth.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "unread": unread,
    })))
}

/// PUT /api/room-chats/{room_id}/read — advance the caller's read cursor.
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let room_id = parse_object_id(&room_id, "room id")?;
    state.chat.mark_room_read(room_id, auth.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Room chat marked as read",
    })))
}

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use bson::oid::ObjectId;
use flatmate_db::models::{DirectChat, DirectMessage, LastMessage, MessageKind, ReadReceipt};
use flatmate_services::messaging::{
    log::{DEFAULT_PAGE_LIMIT, MessagePage},
    service::SenderInfo,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub room_id: Option<String>,
    pub participant_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: Option<String>,
    #[serde(default)]
    pub message_type: MessageKind,
    pub file_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub(crate) fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {what}")))
}

fn rfc3339(dt: bson::DateTime) -> String {
    dt.try_to_rfc3339_string().unwrap_or_default()
}

pub(crate) fn message_json(message: &DirectMessage) -> Value {
    json!({
        "id": message.id.to_hex(),
        "sender_id": message.sender_id.to_hex(),
        "content": message.content,
        "message_type": message.message_type,
        "file_url": message.file_url,
        "is_read": message.is_read,
        "read_at": message.read_at.map(rfc3339),
        "created_at": rfc3339(message.created_at),
    })
}

pub(crate) fn sender_json(sender: &SenderInfo) -> Value {
    json!({
        "id": sender.id.to_hex(),
        "display_name": sender.display_name,
        "avatar": sender.avatar,
    })
}

fn last_message_json(last: &LastMessage) -> Value {
    json!({
        "content": last.content,
        "sender_id": last.sender_id.to_hex(),
        "timestamp": rfc3339(last.timestamp),
    })
}

fn read_receipt_json(receipt: &ReadReceipt) -> Value {
    json!({
        "user_id": receipt.user_id.to_hex(),
        "read_at": rfc3339(receipt.read_at),
    })
}

fn chat_json(chat: &DirectChat, unread_count: Option<usize>, with_messages: bool) -> Value {
    let mut body = json!({
        "id": chat.id.map(|id| id.to_hex()),
        "room_id": chat.room_id.to_hex(),
        "participants": chat.participants.iter().map(|p| p.to_hex()).collect::<Vec<_>>(),
        "last_message": chat.last_message.as_ref().map(last_message_json),
        "read_by": chat.read_by.iter().map(read_receipt_json).collect::<Vec<_>>(),
        "is_active": chat.is_active,
        "created_at": rfc3339(chat.created_at),
        "updated_at": rfc3339(chat.updated_at),
    });
    if let Some(count) = unread_count {
        body["unread_count"] = json!(count);
    }
    if with_messages {
        body["messages"] = Value::Array(chat.messages.iter().map(message_json).collect());
    }
    body
}

#[derive(Debug, Serialize)]
struct PageLink {
    page: u64,
    limit: u64,
}

fn pagination_json<M>(page: &MessagePage<M>) -> Value {
    let mut body = json!({});
    if page.has_next {
        body["next"] = json!(PageLink {
            page: page.page + 1,
            limit: page.limit,
        });
    }
    if page.has_prev {
        body["prev"] = json!(PageLink {
            page: page.page - 1,
            limit: page.limit,
        });
    }
    body
}

/// GET /api/chats — the caller's active chats with unread counts.
pub async fn list_chats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let summaries = state.chat.list_my_chats(auth.user_id).await?;
    let data: Vec<Value> = summaries
        .iter()
        .map(|s| chat_json(&s.chat, Some(s.unread_count), false))
        .collect();

    Ok(Json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

/// POST /api/chats — create-or-get the direct chat with another user
/// about a room.
pub async fn create_chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateChatRequest>,
) -> Result<Json<Value>, ApiError> {
    let room_id = body
        .room_id
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("room_id is required".to_string()))?;
    let participant_id = body
        .participant_id
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("participant_id is required".to_string()))?;

    let room_id = parse_object_id(room_id, "room_id")?;
    let participant_id = parse_object_id(participant_id, "participant_id")?;

    let chat = state
        .chat
        .open_direct_chat(auth.user_id, room_id, participant_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": chat_json(&chat, None, true),
    })))
}

/// GET /api/chats/{id} — full chat; fetching marks it read for the caller.
pub async fn get_chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let chat_id = parse_object_id(&id, "chat id")?;
    let chat = state.chat.get_direct_chat(chat_id, auth.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": chat_json(&chat, None, true),
    })))
}

/// POST /api/chats/{id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let chat_id = parse_object_id(&id, "chat id")?;
    let sent = state
        .chat
        .send_direct_message(
            chat_id,
            auth.user_id,
            body.content.unwrap_or_default(),
            body.message_type,
            body.file_url,
        )
        .await?;

    let mut data = message_json(&sent.message);
    data["sender"] = sender_json(&sent.sender);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": data,
        })),
    ))
}

/// GET /api/chats/{id}/messages?page&limit — end-anchored pages, oldest
/// first within each page.
pub async fn get_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let chat_id = parse_object_id(&id, "chat id")?;
    let page = state
        .chat
        .paginate_direct_messages(
            chat_id,
            auth.user_id,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        )
        .await?;

    let data: Vec<Value> = page.items.iter().map(message_json).collect();

    Ok(Json(json!({
        "success": true,
        "count": data.len(),
        "total": page.total,
        "pagination": pagination_json(&page),
        "data": data,
    })))
}

/// PUT /api/chats/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let chat_id = parse_object_id(&id, "chat id")?;
    state.chat.mark_direct_read(chat_id, auth.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Messages marked as read",
    })))
}

/// DELETE /api/chats/{id} — soft delete; the chat drops out of listings.
pub async fn delete_chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let chat_id = parse_object_id(&id, "chat id")?;
    state
        .chat
        .deactivate_direct_chat(chat_id, auth.user_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Chat deleted",
    })))
}

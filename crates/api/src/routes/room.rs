use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use flatmate_db::models::Room;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

use super::chat::parse_object_id;

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub title: String,
    pub description: String,
    pub capacity: Option<u32>,
}

fn rfc3339(dt: bson::DateTime) -> String {
    dt.try_to_rfc3339_string().unwrap_or_default()
}

pub(crate) fn room_json(room: &Room) -> Value {
    json!({
        "id": room.id.map(|id| id.to_hex()),
        "title": room.title,
        "description": room.description,
        "owner_id": room.owner_id.to_hex(),
        "capacity": room.capacity,
        "tenant_ids": room.tenant_ids.iter().map(|t| t.to_hex()).collect::<Vec<_>>(),
        "status": room.status,
        "is_active": room.is_active,
        "created_at": rfc3339(room.created_at),
        "updated_at": rfc3339(room.updated_at),
    })
}

/// POST /api/rooms
pub async fn create_room(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if body.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }

    let room = state
        .rooms
        .create(
            auth.user_id,
            body.title,
            body.description,
            body.capacity.unwrap_or(1),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": room_json(&room),
        })),
    ))
}

/// GET /api/rooms/{id}
pub async fn get_room(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let room_id = parse_object_id(&id, "room id")?;
    let room = state
        .rooms
        .find_by_id(room_id)
        .await
        .map_err(|_| ApiError::NotFound("Room not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "data": room_json(&room),
    })))
}

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use flatmate_db::models::{RentalRequest, RequestStatus};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

use super::chat::parse_object_id;

#[derive(Debug, Deserialize)]
pub struct CreateRequestRequest {
    pub room_id: String,
    pub message: Option<String>,
}

fn rfc3339(dt: bson::DateTime) -> String {
    dt.try_to_rfc3339_string().unwrap_or_default()
}

fn request_json(request: &RentalRequest) -> Value {
    json!({
        "id": request.id.map(|id| id.to_hex()),
        "room_id": request.room_id.to_hex(),
        "requester_id": request.requester_id.to_hex(),
        "owner_id": request.owner_id.to_hex(),
        "message": request.message,
        "status": request.status,
        "created_at": rfc3339(request.created_at),
        "updated_at": rfc3339(request.updated_at),
    })
}

/// POST /api/requests — ask to join a room.
pub async fn create_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateRequestRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let room_id = parse_object_id(&body.room_id, "room_id")?;
    let room = state
        .rooms
        .find_by_id(room_id)
        .await
        .map_err(|_| ApiError::NotFound("Room not found".to_string()))?;

    if room.owner_id == auth.user_id {
        return Err(ApiError::BadRequest(
            "Cannot request your own room".to_string(),
        ));
    }

    let request = state
        .requests
        .create(room_id, auth.user_id, room.owner_id, body.message)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": request_json(&request),
        })),
    ))
}

/// PUT /api/requests/{id}/accept — owner only. Adds the requester as a
/// tenant and bootstraps the chats best-effort.
pub async fn accept_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let request_id = parse_object_id(&id, "request id")?;
    let request = state
        .requests
        .base
        .find_by_id(request_id)
        .await
        .map_err(|_| ApiError::NotFound("Request not found".to_string()))?;

    if request.owner_id != auth.user_id {
        return Err(ApiError::Forbidden(
            "Only the room owner can accept requests".to_string(),
        ));
    }
    if request.status != RequestStatus::Pending {
        return Err(ApiError::BadRequest(
            "Request is no longer pending".to_string(),
        ));
    }

    state
        .requests
        .set_status(request_id, RequestStatus::Accepted)
        .await?;
    state
        .rooms
        .add_tenant(request.room_id, request.requester_id)
        .await?;

    // Re-read so the chat bootstrap sees the updated tenant set.
    let room = state
        .rooms
        .find_by_id(request.room_id)
        .await
        .map_err(|_| ApiError::NotFound("Room not found".to_string()))?;
    state
        .chat
        .ensure_chats_on_acceptance(&room, request.requester_id)
        .await;

    let request = state.requests.base.find_by_id(request_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": request_json(&request),
    })))
}

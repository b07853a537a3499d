use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// A rental request. Kept minimal: the messaging core cares about exactly
/// one fact, that acceptance adds a tenant and creates chats best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalRequest {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub room_id: ObjectId,
    pub requester_id: ObjectId,
    pub owner_id: ObjectId,
    pub message: Option<String>,
    #[serde(default)]
    pub status: RequestStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl RentalRequest {
    pub const COLLECTION: &'static str = "rental_requests";
}

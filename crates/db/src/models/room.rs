use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// A room listing. The messaging core only reads the membership fact
/// (owner + tenants); everything else belongs to the listing surface and
/// may change between calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: String,
    pub owner_id: ObjectId,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default)]
    pub tenant_ids: Vec<ObjectId>,
    #[serde(default)]
    pub status: RoomStatus,
    #[serde(default = "bool_true")]
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    #[default]
    Available,
    Occupied,
    Pending,
    Inactive,
}

impl Room {
    pub const COLLECTION: &'static str = "rooms";

    /// Live membership fact: the owner plus the current tenant set.
    pub fn is_member(&self, user_id: ObjectId) -> bool {
        self.owner_id == user_id || self.tenant_ids.contains(&user_id)
    }
}

fn default_capacity() -> u32 {
    1
}

fn bool_true() -> bool {
    true
}

use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

use super::message::{LastMessage, ReadReceipt, RoomMessage};

/// The group conversation for one room; exactly one per room, never deleted.
///
/// `participants` is the membership snapshot taken at creation time and is
/// never resynced. Authorization always goes through the live Room fact, so
/// a tenant added later has access while being absent from this list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomChat {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub room_id: ObjectId,
    #[serde(default)]
    pub participants: Vec<ObjectId>,
    #[serde(default)]
    pub messages: Vec<RoomMessage>,
    pub last_message: Option<LastMessage>,
    #[serde(default)]
    pub read_by: Vec<ReadReceipt>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl RoomChat {
    pub const COLLECTION: &'static str = "room_chats";

    /// The user's read cursor, or `None` if they have never read.
    pub fn read_cursor(&self, user_id: ObjectId) -> Option<DateTime> {
        self.read_by
            .iter()
            .find(|r| r.user_id == user_id)
            .map(|r| r.read_at)
    }
}

use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

use super::message::{DirectMessage, LastMessage, ReadReceipt};

/// A 1:1 conversation between two users, scoped to one room. The same two
/// users get a separate chat per room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectChat {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub room_id: ObjectId,
    /// Exactly two distinct user ids, stored sorted so the pair is canonical.
    pub participants: Vec<ObjectId>,
    /// Canonical "minHex:maxHex" key; unique per room among active chats.
    pub pair_key: String,
    #[serde(default)]
    pub messages: Vec<DirectMessage>,
    pub last_message: Option<LastMessage>,
    #[serde(default)]
    pub read_by: Vec<ReadReceipt>,
    #[serde(default = "bool_true")]
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl DirectChat {
    pub const COLLECTION: &'static str = "direct_chats";

    pub fn pair_key(a: ObjectId, b: ObjectId) -> String {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        format!("{}:{}", lo.to_hex(), hi.to_hex())
    }

    pub fn is_participant(&self, user_id: ObjectId) -> bool {
        self.participants.contains(&user_id)
    }

    /// The other side of the conversation, if `user_id` is a participant.
    pub fn counterpart_of(&self, user_id: ObjectId) -> Option<ObjectId> {
        if !self.is_participant(user_id) {
            return None;
        }
        self.participants.iter().copied().find(|p| *p != user_id)
    }
}

fn bool_true() -> bool {
    true
}

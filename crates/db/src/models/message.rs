use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
}

/// A message embedded in a direct chat. Carries the legacy per-message
/// read flag that the direct-chat read policy mutates in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectMessage {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub sender_id: ObjectId,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageKind,
    pub file_url: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    pub read_at: Option<DateTime>,
    pub created_at: DateTime,
}

/// A message embedded in a room chat. Deliberately has no per-message
/// read flag: group read state lives only in the per-user cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomMessage {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub sender_id: ObjectId,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageKind,
    pub file_url: Option<String>,
    pub created_at: DateTime,
}

/// Denormalized cache of the final message, recomputed on every append.
/// Drives conversation-list sorting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub sender_id: ObjectId,
    pub timestamp: DateTime,
}

/// One read cursor per user who has read the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub user_id: ObjectId,
    pub read_at: DateTime,
}

impl DirectMessage {
    pub fn new(
        sender_id: ObjectId,
        content: String,
        message_type: MessageKind,
        file_url: Option<String>,
    ) -> Self {
        Self {
            id: ObjectId::new(),
            sender_id,
            content,
            message_type,
            file_url,
            is_read: false,
            read_at: None,
            created_at: DateTime::now(),
        }
    }
}

impl RoomMessage {
    pub fn new(
        sender_id: ObjectId,
        content: String,
        message_type: MessageKind,
        file_url: Option<String>,
    ) -> Self {
        Self {
            id: ObjectId::new(),
            sender_id,
            content,
            message_type,
            file_url,
            created_at: DateTime::now(),
        }
    }
}

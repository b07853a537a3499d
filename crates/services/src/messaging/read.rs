//! Unread derivation. Two deliberately divergent policies: direct chats
//! keep a legacy per-message `is_read` flag that mark-read mutates in
//! place, group chats keep one immutable message log and derive unread
//! state from a per-user cursor. Both are pure functions of the
//! conversation document; the mutation side lives in the DAOs.

use bson::{DateTime, oid::ObjectId};
use flatmate_db::models::{DirectChat, RoomChat};

pub trait ReadTracker {
    type Conversation;

    fn unread_count(conversation: &Self::Conversation, user_id: ObjectId) -> usize;
}

/// Per-message flag policy for direct chats.
pub struct DirectRead;

impl ReadTracker for DirectRead {
    type Conversation = DirectChat;

    fn unread_count(chat: &DirectChat, user_id: ObjectId) -> usize {
        chat.messages
            .iter()
            .filter(|m| m.sender_id != user_id && !m.is_read)
            .count()
    }
}

/// Per-user cursor policy for room chats. A user who has never read has an
/// epoch-zero cursor and therefore sees the entire history as unread.
pub struct GroupRead;

impl ReadTracker for GroupRead {
    type Conversation = RoomChat;

    fn unread_count(chat: &RoomChat, user_id: ObjectId) -> usize {
        let cursor = chat
            .read_cursor(user_id)
            .unwrap_or_else(|| DateTime::from_millis(0));
        chat.messages
            .iter()
            .filter(|m| m.sender_id != user_id && m.created_at > cursor)
            .count()
    }
}

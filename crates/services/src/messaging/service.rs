//! Authorization-gated chat operations, the synchronous source of truth
//! behind both the HTTP surface and the realtime gateway.
//!
//! Direct-chat access is gated on the chat's participant pair. Room-chat
//! access is re-derived from the *current* Room membership fact on every
//! call — never from the RoomChat's stored participant snapshot — so a
//! newly added tenant gains access immediately.

use std::sync::Arc;

use bson::oid::ObjectId;
use flatmate_db::models::{
    DirectChat, DirectMessage, MessageKind, Room, RoomChat, RoomMessage, User,
};
use tracing::warn;

use crate::dao::{
    DirectChatDao, RoomChatDao, RoomDao, UserDao,
    base::DaoError,
};

use super::{
    ChatError, ChatResult,
    log::{self, MessagePage},
    read::{DirectRead, GroupRead, ReadTracker},
};

/// Display info for the author of a message, hydrated from the user store.
#[derive(Debug, Clone)]
pub struct SenderInfo {
    pub id: ObjectId,
    pub display_name: String,
    pub avatar: Option<String>,
}

impl From<&User> for SenderInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.unwrap_or_default(),
            display_name: user.display_name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// A direct chat annotated with the caller's unread count.
#[derive(Debug, Clone)]
pub struct ChatSummary {
    pub chat: DirectChat,
    pub unread_count: usize,
}

/// A persisted direct message plus the routing facts the realtime layer
/// needs for fan-out.
#[derive(Debug, Clone)]
pub struct SentDirectMessage {
    pub chat_id: ObjectId,
    pub message: DirectMessage,
    pub sender: SenderInfo,
    pub counterpart_id: ObjectId,
}

#[derive(Debug, Clone)]
pub struct SentRoomMessage {
    pub room_id: ObjectId,
    pub chat_id: ObjectId,
    pub message: RoomMessage,
    pub sender: SenderInfo,
}

pub struct ChatService {
    users: Arc<UserDao>,
    rooms: Arc<RoomDao>,
    direct_chats: Arc<DirectChatDao>,
    room_chats: Arc<RoomChatDao>,
}

impl ChatService {
    pub fn new(
        users: Arc<UserDao>,
        rooms: Arc<RoomDao>,
        direct_chats: Arc<DirectChatDao>,
        room_chats: Arc<RoomChatDao>,
    ) -> Self {
        Self {
            users,
            rooms,
            direct_chats,
            room_chats,
        }
    }

    // --- Direct chats ---

    /// The caller's active chats, most recent activity first, each with
    /// their unread count.
    pub async fn list_my_chats(&self, user_id: ObjectId) -> ChatResult<Vec<ChatSummary>> {
        let chats = self.direct_chats.list_for_user(user_id).await?;
        Ok(chats
            .into_iter()
            .map(|chat| {
                let unread_count = DirectRead::unread_count(&chat, user_id);
                ChatSummary { chat, unread_count }
            })
            .collect())
    }

    /// Create-or-get the direct chat between the caller and `counterpart_id`
    /// about `room_id`.
    pub async fn open_direct_chat(
        &self,
        user_id: ObjectId,
        room_id: ObjectId,
        counterpart_id: ObjectId,
    ) -> ChatResult<DirectChat> {
        if user_id == counterpart_id {
            return Err(ChatError::InvalidOperation(
                "Cannot create chat with yourself".to_string(),
            ));
        }

        self.rooms
            .find_by_id(room_id)
            .await
            .map_err(|e| not_found(e, "Room not found"))?;
        self.users
            .base
            .find_by_id(counterpart_id)
            .await
            .map_err(|e| not_found(e, "Participant not found"))?;

        Ok(self
            .direct_chats
            .find_or_create(room_id, user_id, counterpart_id)
            .await?)
    }

    /// Fetches a chat the caller participates in. Fetching implicitly
    /// consumes the caller's unread state (direct-chat read policy).
    pub async fn get_direct_chat(
        &self,
        chat_id: ObjectId,
        user_id: ObjectId,
    ) -> ChatResult<DirectChat> {
        self.direct_chat_for(chat_id, user_id).await?;
        self.direct_chats.mark_read(chat_id, user_id).await?;
        Ok(self.direct_chats.find_by_id(chat_id).await?)
    }

    pub async fn send_direct_message(
        &self,
        chat_id: ObjectId,
        user_id: ObjectId,
        content: String,
        message_type: MessageKind,
        file_url: Option<String>,
    ) -> ChatResult<SentDirectMessage> {
        let chat = self.direct_chat_for(chat_id, user_id).await?;
        log::validate_message(&content, file_url.as_deref())?;

        let message = DirectMessage::new(
            user_id,
            content.trim().to_string(),
            message_type,
            file_url,
        );
        self.direct_chats.append_message(chat_id, &message).await?;

        let sender = self.sender_info(user_id).await?;
        let counterpart_id = chat
            .counterpart_of(user_id)
            .ok_or_else(|| ChatError::Forbidden("Not a participant".to_string()))?;

        Ok(SentDirectMessage {
            chat_id,
            message,
            sender,
            counterpart_id,
        })
    }

    pub async fn paginate_direct_messages(
        &self,
        chat_id: ObjectId,
        user_id: ObjectId,
        page: u64,
        limit: u64,
    ) -> ChatResult<MessagePage<DirectMessage>> {
        let chat = self.direct_chat_for(chat_id, user_id).await?;
        Ok(log::paginate(&chat.messages, page, limit))
    }

    pub async fn mark_direct_read(
        &self,
        chat_id: ObjectId,
        user_id: ObjectId,
    ) -> ChatResult<()> {
        self.direct_chat_for(chat_id, user_id).await?;
        Ok(self.direct_chats.mark_read(chat_id, user_id).await?)
    }

    pub async fn deactivate_direct_chat(
        &self,
        chat_id: ObjectId,
        user_id: ObjectId,
    ) -> ChatResult<()> {
        self.direct_chat_for(chat_id, user_id).await?;
        self.direct_chats.deactivate(chat_id).await?;
        Ok(())
    }

    // --- Room chats ---

    /// Fetch-or-create the group chat for a room the caller belongs to.
    pub async fn open_room_chat(
        &self,
        user_id: ObjectId,
        room_id: ObjectId,
    ) -> ChatResult<RoomChat> {
        let room = self.room_member_for(room_id, user_id).await?;
        Ok(self
            .room_chats
            .find_or_create(room_id, room.owner_id, &room.tenant_ids)
            .await?)
    }

    pub async fn send_room_message(
        &self,
        room_id: ObjectId,
        user_id: ObjectId,
        content: String,
        message_type: MessageKind,
        file_url: Option<String>,
    ) -> ChatResult<SentRoomMessage> {
        let room = self.room_member_for(room_id, user_id).await?;
        log::validate_message(&content, file_url.as_deref())?;

        let chat = self
            .room_chats
            .find_or_create(room_id, room.owner_id, &room.tenant_ids)
            .await?;
        let chat_id = chat.id.ok_or(ChatError::Dao(DaoError::NotFound))?;

        let message = RoomMessage::new(
            user_id,
            content.trim().to_string(),
            message_type,
            file_url,
        );
        self.room_chats.append_message(chat_id, &message).await?;

        let sender = self.sender_info(user_id).await?;

        Ok(SentRoomMessage {
            room_id,
            chat_id,
            message,
            sender,
        })
    }

    pub async fn paginate_room_messages(
        &self,
        room_id: ObjectId,
        user_id: ObjectId,
        page: u64,
        limit: u64,
    ) -> ChatResult<MessagePage<RoomMessage>> {
        self.room_member_for(room_id, user_id).await?;
        match self.room_chats.find_by_room(room_id).await? {
            Some(chat) => Ok(log::paginate(&chat.messages, page, limit)),
            None => Ok(log::paginate(&[], page, limit)),
        }
    }

    pub async fn mark_room_read(&self, room_id: ObjectId, user_id: ObjectId) -> ChatResult<()> {
        self.room_member_for(room_id, user_id).await?;
        if let Some(chat) = self.room_chats.find_by_room(room_id).await? {
            let chat_id = chat.id.ok_or(ChatError::Dao(DaoError::NotFound))?;
            self.room_chats.mark_read(chat_id, user_id).await?;
        }
        Ok(())
    }

    pub async fn room_unread(&self, room_id: ObjectId, user_id: ObjectId) -> ChatResult<usize> {
        self.room_member_for(room_id, user_id).await?;
        Ok(self
            .room_chats
            .find_by_room(room_id)
            .await?
            .map(|chat| GroupRead::unread_count(&chat, user_id))
            .unwrap_or(0))
    }

    /// Best-effort chat bootstrap when a rental request is accepted: the
    /// owner/tenant direct chat and the room's group chat. Failures are
    /// logged, never surfaced, and never retried — both chats are created
    /// lazily on first access anyway.
    pub async fn ensure_chats_on_acceptance(&self, room: &Room, requester_id: ObjectId) {
        let Some(room_id) = room.id else { return };

        if let Err(e) = self
            .direct_chats
            .find_or_create(room_id, room.owner_id, requester_id)
            .await
        {
            warn!(%room_id, %e, "Failed to create direct chat on request acceptance");
        }

        if let Err(e) = self
            .room_chats
            .find_or_create(room_id, room.owner_id, &room.tenant_ids)
            .await
        {
            warn!(%room_id, %e, "Failed to create room chat on request acceptance");
        }
    }

    // --- Internal helpers ---

    async fn direct_chat_for(
        &self,
        chat_id: ObjectId,
        user_id: ObjectId,
    ) -> ChatResult<DirectChat> {
        let chat = self
            .direct_chats
            .find_by_id(chat_id)
            .await
            .map_err(|e| not_found(e, "Chat not found"))?;
        if !chat.is_participant(user_id) {
            return Err(ChatError::Forbidden(
                "Not authorized to access this chat".to_string(),
            ));
        }
        Ok(chat)
    }

    async fn room_member_for(&self, room_id: ObjectId, user_id: ObjectId) -> ChatResult<Room> {
        let room = self
            .rooms
            .find_by_id(room_id)
            .await
            .map_err(|e| not_found(e, "Room not found"))?;
        if !room.is_member(user_id) {
            return Err(ChatError::Forbidden(
                "Not authorized to access this room chat".to_string(),
            ));
        }
        Ok(room)
    }

    async fn sender_info(&self, user_id: ObjectId) -> ChatResult<SenderInfo> {
        let user = self
            .users
            .base
            .find_by_id(user_id)
            .await
            .map_err(|e| not_found(e, "User not found"))?;
        Ok(SenderInfo::from(&user))
    }
}

fn not_found(err: DaoError, message: &str) -> ChatError {
    match err {
        DaoError::NotFound => ChatError::NotFound(message.to_string()),
        other => ChatError::from(other),
    }
}

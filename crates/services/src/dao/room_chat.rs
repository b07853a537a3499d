use bson::{DateTime, doc, oid::ObjectId};
use flatmate_db::models::{RoomChat, RoomMessage};
use mongodb::Database;
use tracing::debug;

use super::base::{BaseDao, DaoError, DaoResult};

/// Store for per-room group conversations; exactly one per room, enforced
/// by the unique `room_id` index.
pub struct RoomChatDao {
    pub base: BaseDao<RoomChat>,
}

impl RoomChatDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, RoomChat::COLLECTION),
        }
    }

    /// Looks up the room's chat, creating it lazily with the membership
    /// snapshot (owner + tenants at creation time). Losers of a concurrent
    /// creation race re-fetch the winner.
    pub async fn find_or_create(
        &self,
        room_id: ObjectId,
        owner_id: ObjectId,
        tenant_ids: &[ObjectId],
    ) -> DaoResult<RoomChat> {
        let filter = doc! { "room_id": room_id };

        if let Some(chat) = self.base.find_one(filter.clone()).await? {
            return Ok(chat);
        }

        let mut participants = Vec::with_capacity(tenant_ids.len() + 1);
        participants.push(owner_id);
        participants.extend_from_slice(tenant_ids);

        let now = DateTime::now();
        let chat = RoomChat {
            id: None,
            room_id,
            participants,
            messages: Vec::new(),
            last_message: None,
            read_by: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        match self.base.insert_one(&chat).await {
            Ok(id) => self.base.find_by_id(id).await,
            Err(DaoError::DuplicateKey(_)) => {
                debug!(%room_id, "Lost room-chat creation race, re-fetching winner");
                self.base.find_one(filter).await?.ok_or(DaoError::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn find_by_room(&self, room_id: ObjectId) -> DaoResult<Option<RoomChat>> {
        self.base.find_one(doc! { "room_id": room_id }).await
    }

    /// Appends a message and refreshes `last_message` atomically. Unlike
    /// direct chats, `read_by` is left alone: group read state is a per-user
    /// cursor advanced only by an explicit mark-read.
    pub async fn append_message(
        &self,
        chat_id: ObjectId,
        message: &RoomMessage,
    ) -> DaoResult<RoomChat> {
        let message_bson = bson::to_bson(message).map_err(bson::ser::Error::from)?;
        self.base
            .find_one_and_update(
                doc! { "_id": chat_id },
                doc! {
                    "$push": { "messages": message_bson },
                    "$set": {
                        "last_message": {
                            "content": &message.content,
                            "sender_id": message.sender_id,
                            "timestamp": message.created_at,
                        },
                    },
                },
            )
            .await
    }

    /// Group read policy: advance the user's cursor only; messages are
    /// never mutated.
    pub async fn mark_read(&self, chat_id: ObjectId, user_id: ObjectId) -> DaoResult<()> {
        let now = DateTime::now();

        let updated = self
            .base
            .collection()
            .update_one(
                doc! { "_id": chat_id, "read_by.user_id": user_id },
                doc! { "$set": { "read_by.$.read_at": now, "updated_at": now } },
            )
            .await?;

        if updated.matched_count == 0 {
            self.base
                .collection()
                .update_one(
                    doc! { "_id": chat_id, "read_by.user_id": { "$ne": user_id } },
                    doc! {
                        "$push": { "read_by": { "user_id": user_id, "read_at": now } },
                        "$set": { "updated_at": now },
                    },
                )
                .await?;
        }

        Ok(())
    }
}

use bson::{DateTime, doc, oid::ObjectId};
use flatmate_db::models::{DirectChat, DirectMessage};
use mongodb::Database;
use tracing::debug;

use super::base::{BaseDao, DaoError, DaoResult};

/// Store for 1:1 conversations. Enforces the one-active-chat-per
/// (room, unordered pair) invariant through the `pair_key` unique index.
pub struct DirectChatDao {
    pub base: BaseDao<DirectChat>,
}

impl DirectChatDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, DirectChat::COLLECTION),
        }
    }

    /// Looks up the active chat for (room, {a, b}), creating it when absent.
    /// A concurrent creator losing the insert race on the unique index falls
    /// back to re-fetching the winner's document.
    pub async fn find_or_create(
        &self,
        room_id: ObjectId,
        a: ObjectId,
        b: ObjectId,
    ) -> DaoResult<DirectChat> {
        if a == b {
            return Err(DaoError::Validation(
                "Chat requires two distinct participants".to_string(),
            ));
        }

        let pair_key = DirectChat::pair_key(a, b);
        let filter = doc! { "room_id": room_id, "pair_key": &pair_key, "is_active": true };

        if let Some(chat) = self.base.find_one(filter.clone()).await? {
            return Ok(chat);
        }

        let mut participants = vec![a, b];
        participants.sort_by_key(|id| id.bytes());

        let now = DateTime::now();
        let chat = DirectChat {
            id: None,
            room_id,
            participants,
            pair_key,
            messages: Vec::new(),
            last_message: None,
            read_by: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        match self.base.insert_one(&chat).await {
            Ok(id) => self.base.find_by_id(id).await,
            Err(DaoError::DuplicateKey(_)) => {
                debug!(%room_id, "Lost direct-chat creation race, re-fetching winner");
                self.base.find_one(filter).await?.ok_or(DaoError::NotFound)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn find_by_id(&self, chat_id: ObjectId) -> DaoResult<DirectChat> {
        self.base.find_by_id(chat_id).await
    }

    /// Active chats the user participates in, most recent activity first.
    pub async fn list_for_user(&self, user_id: ObjectId) -> DaoResult<Vec<DirectChat>> {
        self.base
            .find_many(
                doc! { "participants": user_id, "is_active": true },
                Some(doc! { "last_message.timestamp": -1 }),
            )
            .await
    }

    /// Appends a message, refreshing the `last_message` cache and resetting
    /// `read_by` to the sender alone, in one atomic document update. Sending
    /// implicitly marks the sender read and clears the counterpart's receipt
    /// (legacy reset-on-send policy).
    pub async fn append_message(
        &self,
        chat_id: ObjectId,
        message: &DirectMessage,
    ) -> DaoResult<DirectChat> {
        let message_bson = bson::to_bson(message).map_err(bson::ser::Error::from)?;
        self.base
            .find_one_and_update(
                doc! { "_id": chat_id, "is_active": true },
                doc! {
                    "$push": { "messages": message_bson },
                    "$set": {
                        "last_message": {
                            "content": &message.content,
                            "sender_id": message.sender_id,
                            "timestamp": message.created_at,
                        },
                        "read_by": [
                            { "user_id": message.sender_id, "read_at": message.created_at },
                        ],
                    },
                },
            )
            .await
    }

    /// Direct-chat read policy: flip the per-message flag on every unread
    /// message from the other participant (no-op when none remain), then
    /// advance the reader's receipt.
    pub async fn mark_read(&self, chat_id: ObjectId, user_id: ObjectId) -> DaoResult<()> {
        let now = DateTime::now();

        self.base
            .update_one_filtered(
                doc! { "_id": chat_id },
                doc! { "$set": {
                    "messages.$[m].is_read": true,
                    "messages.$[m].read_at": now,
                } },
                vec![doc! { "m.sender_id": { "$ne": user_id }, "m.is_read": false }],
            )
            .await?;

        self.upsert_receipt(chat_id, user_id, now).await
    }

    /// Soft delete; find-or-create only ever matches active chats, so a
    /// deactivated chat is never revived.
    pub async fn deactivate(&self, chat_id: ObjectId) -> DaoResult<bool> {
        self.base
            .update_by_id(chat_id, doc! { "$set": { "is_active": false } })
            .await
    }

    async fn upsert_receipt(
        &self,
        chat_id: ObjectId,
        user_id: ObjectId,
        now: DateTime,
    ) -> DaoResult<()> {
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

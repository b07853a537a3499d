use bson::{DateTime, doc, oid::ObjectId};
use flatmate_db::models::{Room, RoomStatus};
use mongodb::Database;

use super::base::{BaseDao, DaoResult};

pub struct RoomDao {
    pub base: BaseDao<Room>,
}

impl RoomDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Room::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        owner_id: ObjectId,
        title: String,
        description: String,
        capacity: u32,
    ) -> DaoResult<Room> {
        let now = DateTime::now();
        let room = Room {
            id: None,
            title,
            description,
            owner_id,
            capacity,
            tenant_ids: Vec::new(),
            status: RoomStatus::Available,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&room).await?;
        self.base.find_by_id(id).await
    }

    /// Re-reads the live membership fact. Chat authorization always goes
    /// through this, never through a conversation's stored participant list.
    pub async fn find_by_id(&self, room_id: ObjectId) -> DaoResult<Room> {
        self.base.find_by_id(room_id).await
    }

    /// Adds a tenant to the room, keeping the set free of duplicates.
    pub async fn add_tenant(&self, room_id: ObjectId, user_id: ObjectId) -> DaoResult<bool> {
        self.base
            .update_by_id(room_id, doc! { "$addToSet": { "tenant_ids": user_id } })
            .await
    }
}

use bson::{DateTime, doc, oid::ObjectId};
use flatmate_db::models::{RentalRequest, RequestStatus};
use mongodb::Database;

use super::base::{BaseDao, DaoError, DaoResult};

pub struct RequestDao {
    pub base: BaseDao<RentalRequest>,
}

impl RequestDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, RentalRequest::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        room_id: ObjectId,
        requester_id: ObjectId,
        owner_id: ObjectId,
        message: Option<String>,
    ) -> DaoResult<RentalRequest> {
        // One open request per (room, requester)
        let existing = self
            .base
            .find_one(doc! {
                "room_id": room_id,
                "requester_id": requester_id,
                "status": { "$in": ["pending", "accepted"] },
            })
            .await?;
        if existing.is_some() {
            return Err(DaoError::Validation(
                "You have already requested this room".to_string(),
            ));
        }

        let now = DateTime::now();
        let request = RentalRequest {
            id: None,
            room_id,
            requester_id,
            owner_id,
            message,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&request).await?;
        self.base.find_by_id(id).await
    }

    pub async fn set_status(
        &self,
        request_id: ObjectId,
        status: RequestStatus,
    ) -> DaoResult<bool> {
        let status = bson::to_bson(&status).map_err(bson::ser::Error::from)?;
        self.base
            .update_by_id(request_id, doc! { "$set": { "status": status } })
            .await
    }
}

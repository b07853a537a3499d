use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Users
    create_indexes(
        db,
        "users",
        vec![
            index_unique(bson::doc! { "email": 1 }),
            index_unique(bson::doc! { "username": 1 }),
        ],
    )
    .await?;

    // Rooms
    create_indexes(
        db,
        "rooms",
        vec![
            index(bson::doc! { "owner_id": 1 }),
            index(bson::doc! { "status": 1, "is_active": 1 }),
            index(bson::doc! { "tenant_ids": 1 }),
        ],
    )
    .await?;

    // Rental Requests
    create_indexes(
        db,
        "rental_requests",
        vec![
            index(bson::doc! { "room_id": 1, "requester_id": 1, "status": 1 }),
            index(bson::doc! { "owner_id": 1, "status": 1, "created_at": -1 }),
        ],
    )
    .await?;

    // Direct Chats. The pair uniqueness cannot ride on the participants
    // array (multikey), so it lives on the canonical pair_key. The partial
    // filter scopes uniqueness to active chats: a deactivated chat must not
    // block a fresh one for the same (room, pair).
    create_indexes(
        db,
        "direct_chats",
        vec![
            index_unique_partial(
                bson::doc! { "room_id": 1, "pair_key": 1 },
                bson::doc! { "is_active": true },
            ),
            index(bson::doc! { "participants": 1, "is_active": 1 }),
            index(bson::doc! { "last_message.timestamp": -1 }),
        ],
    )
    .await?;

    // Room Chats
    create_indexes(
        db,
        "room_chats",
        vec![index_unique(bson::doc! { "room_id": 1 })],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn index_unique_partial(keys: bson::Document, filter: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(filter)
                .build(),
        )
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}

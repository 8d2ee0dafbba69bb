use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

use crate::models::{
    ChatMessage, Comment, Conversation, Follower, Gift, GlobalAnnouncement, Post,
    PrivateMessage, Room, StoredFile, User, UserProfile,
};

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Users
    create_indexes(
        db,
        User::COLLECTION,
        vec![
            index_unique(bson::doc! { "email": 1 }),
            index_unique(bson::doc! { "username": 1 }),
        ],
    )
    .await?;

    // Profiles: one per user, display ids are shareable and must not collide
    create_indexes(
        db,
        UserProfile::COLLECTION,
        vec![
            index_unique(bson::doc! { "user_id": 1 }),
            index_unique(bson::doc! { "display_id": 1 }),
            index(bson::doc! { "name": "text" }),
        ],
    )
    .await?;

    // Rooms
    create_indexes(
        db,
        Room::COLLECTION,
        vec![
            index(bson::doc! { "owner_id": 1 }),
            index(bson::doc! { "created_at": -1 }),
        ],
    )
    .await?;

    // Room chat
    create_indexes(
        db,
        ChatMessage::COLLECTION,
        vec![index(bson::doc! { "room_id": 1, "created_at": -1, "_id": -1 })],
    )
    .await?;

    // Gift catalog
    create_indexes(
        db,
        Gift::COLLECTION,
        vec![index_unique(bson::doc! { "name": 1 })],
    )
    .await?;

    create_indexes(
        db,
        GlobalAnnouncement::COLLECTION,
        vec![index(bson::doc! { "created_at": -1 })],
    )
    .await?;

    // Direct messages
    create_indexes(
        db,
        Conversation::COLLECTION,
        vec![
            index_unique(bson::doc! { "participant_key": 1 }),
            index(bson::doc! { "participants": 1, "last_message_at": -1 }),
        ],
    )
    .await?;

    create_indexes(
        db,
        PrivateMessage::COLLECTION,
        vec![index(bson::doc! { "conversation_id": 1, "created_at": 1 })],
    )
    .await?;

    // Feed
    create_indexes(
        db,
        Post::COLLECTION,
        vec![
            index(bson::doc! { "author_id": 1, "created_at": -1 }),
            index(bson::doc! { "created_at": -1 }),
        ],
    )
    .await?;

    create_indexes(
        db,
        Comment::COLLECTION,
        vec![index(bson::doc! { "post_id": 1, "created_at": -1 })],
    )
    .await?;

    // Follower graph
    create_indexes(
        db,
        Follower::COLLECTION,
        vec![
            index_unique(bson::doc! { "follower_id": 1, "following_id": 1 }),
            index(bson::doc! { "following_id": 1 }),
        ],
    )
    .await?;

    // Blob metadata
    create_indexes(
        db,
        StoredFile::COLLECTION,
        vec![
            index_unique(bson::doc! { "upload_token": 1 }),
            index(bson::doc! { "sha256": 1 }),
        ],
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

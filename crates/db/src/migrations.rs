//! One-shot data fixes applied at start-up. Every step is idempotent.

use bson::doc;
use mongodb::Database;
use tracing::info;

use crate::models::Room;

pub async fn run(db: &Database) -> Result<(), mongodb::error::Error> {
    migrate_room_owner(db).await?;
    backfill_room_version(db).await?;
    Ok(())
}

/// Early rooms recorded their owner as `creator_id`. Rename it so the model
/// only ever reads `owner_id`.
async fn migrate_room_owner(db: &Database) -> Result<(), mongodb::error::Error> {
    let result = db
        .collection::<bson::Document>(Room::COLLECTION)
        .update_many(
            doc! {
                "owner_id": { "$exists": false },
                "creator_id": { "$exists": true },
            },
            doc! { "$rename": { "creator_id": "owner_id" } },
        )
        .await?;

    if result.modified_count > 0 {
        info!(rooms = result.modified_count, "Migrated legacy room owners");
    }
    Ok(())
}

/// Room writes are conditional on `version`; documents written before the
/// field existed would never match that filter.
async fn backfill_room_version(db: &Database) -> Result<(), mongodb::error::Error> {
    let result = db
        .collection::<bson::Document>(Room::COLLECTION)
        .update_many(
            doc! { "version": { "$exists": false } },
            doc! { "$set": { "version": 0_i64 } },
        )
        .await?;

    if result.modified_count > 0 {
        info!(rooms = result.modified_count, "Backfilled room versions");
    }
    Ok(())
}

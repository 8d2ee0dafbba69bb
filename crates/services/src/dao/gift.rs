use bson::doc;
use mongodb::Database;
use tracing::info;
use voxroom_db::models::{Gift, GiftMediaType, GlobalAnnouncement};

use super::base::{BaseDao, DaoResult};

/// Catalog written on first start: (name, kind, media url, price).
const DEFAULT_CATALOG: &[(&str, GiftMediaType, &str, i64)] = &[
    ("Rose", GiftMediaType::Png, "/gifts/rose.png", 1),
    ("Heart", GiftMediaType::Png, "/gifts/heart.png", 10),
    ("Microphone", GiftMediaType::Png, "/gifts/microphone.png", 50),
    ("Crown", GiftMediaType::Png, "/gifts/crown.png", 200),
    ("Fireworks", GiftMediaType::Mp4, "/gifts/fireworks.mp4", 500),
    ("Sports Car", GiftMediaType::Mp4, "/gifts/sports-car.mp4", 1000),
    ("Castle", GiftMediaType::Mp4, "/gifts/castle.mp4", 5000),
];

pub struct GiftDao {
    pub base: BaseDao<Gift>,
    announcements: BaseDao<GlobalAnnouncement>,
}

impl GiftDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Gift::COLLECTION),
            announcements: BaseDao::new(db, GlobalAnnouncement::COLLECTION),
        }
    }

    pub async fn list(&self) -> DaoResult<Vec<Gift>> {
        self.base
            .find_many(doc! {}, Some(doc! { "price": 1, "name": 1 }))
            .await
    }

    pub async fn latest_announcement(&self) -> DaoResult<Option<GlobalAnnouncement>> {
        Ok(self
            .announcements
            .find_limited(doc! {}, doc! { "created_at": -1, "_id": -1 }, 1)
            .await?
            .pop())
    }

    /// Fills an empty catalog. Returns how many gifts were written.
    pub async fn seed_defaults(&self) -> DaoResult<usize> {
        if self.base.count(doc! {}).await? > 0 {
            return Ok(0);
        }

        let gifts: Vec<Gift> = DEFAULT_CATALOG
            .iter()
            .map(|(name, media_type, url, price)| Gift {
                id: None,
                name: (*name).to_string(),
                media_type: *media_type,
                url: (*url).to_string(),
                price: *price,
            })
            .collect();
        let result = self.base.collection().insert_many(&gifts).await?;
        info!(count = result.inserted_ids.len(), "Seeded gift catalog");
        Ok(result.inserted_ids.len())
    }
}

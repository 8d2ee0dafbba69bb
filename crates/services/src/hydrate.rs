use std::collections::HashMap;

use bson::{doc, oid::ObjectId};
use mongodb::Database;
use voxroom_db::models::{User, UserProfile};

use crate::dao::base::{BaseDao, DaoResult};

/// The public face of a user as shown next to seats, chat lines, posts and
/// comments.
#[derive(Debug, Clone)]
pub struct UserCard {
    pub user_id: ObjectId,
    pub name: String,
    pub avatar: Option<String>,
    pub display_id: Option<String>,
    pub level: Option<i32>,
    pub is_vip: bool,
    pub image_url: Option<String>,
    pub frame_url: Option<String>,
}

/// Joins accounts with their profiles and resolves stored image ids to URLs.
pub struct Hydrator {
    users: BaseDao<User>,
    profiles: BaseDao<UserProfile>,
    public_base_url: String,
}

impl Hydrator {
    pub fn new(db: &Database, public_base_url: &str) -> Self {
        Self {
            users: BaseDao::new(db, User::COLLECTION),
            profiles: BaseDao::new(db, UserProfile::COLLECTION),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn file_url(&self, id: Option<ObjectId>) -> Option<String> {
        id.map(|id| format!("{}/api/storage/{}", self.public_base_url, id.to_hex()))
    }

    /// Cards for every id that resolves to an account or a profile. The
    /// profile name wins over the account name.
    pub async fn cards(&self, ids: &[ObjectId]) -> DaoResult<HashMap<ObjectId, UserCard>> {
        let mut unique: Vec<ObjectId> = ids.to_vec();
        unique.sort();
        unique.dedup();
        if unique.is_empty() {
            return Ok(HashMap::new());
        }

        let users = self
            .users
            .find_many(doc! { "_id": { "$in": unique.clone() } }, None)
            .await?;
        let mut profiles: HashMap<ObjectId, UserProfile> = self
            .profiles
            .find_many(doc! { "user_id": { "$in": unique.clone() } }, None)
            .await?
            .into_iter()
            .map(|p| (p.user_id, p))
            .collect();

        let mut cards = HashMap::with_capacity(unique.len());
        for user in users {
            let Some(user_id) = user.id else { continue };
            let profile = profiles.remove(&user_id);
            cards.insert(user_id, self.card_from(user_id, Some(&user), profile.as_ref()));
        }
        // Profiles whose account document is gone still get a card
        for (user_id, profile) in profiles {
            cards.insert(user_id, self.card_from(user_id, None, Some(&profile)));
        }
        Ok(cards)
    }

    pub async fn card(&self, id: ObjectId) -> DaoResult<Option<UserCard>> {
        Ok(self.cards(&[id]).await?.remove(&id))
    }

    fn card_from(
        &self,
        user_id: ObjectId,
        user: Option<&User>,
        profile: Option<&UserProfile>,
    ) -> UserCard {
        let name = profile
            .map(|p| p.name.clone())
            .or_else(|| user.map(|u| u.display_name.clone()))
            .unwrap_or_default();

        UserCard {
            user_id,
            name,
            avatar: user.and_then(|u| u.avatar.clone()),
            display_id: profile.map(|p| p.display_id.clone()),
            level: profile.map(|p| p.level),
            is_vip: profile.is_some_and(|p| p.is_vip),
            image_url: self.file_url(profile.and_then(|p| p.image_id)),
            frame_url: profile.and_then(|p| p.frame_url.clone()),
        }
    }
}

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::Database;
use tracing::{info, warn};
use voxroom_config::EconomySettings;
use voxroom_db::models::{Gender, Post, User, UserProfile};

use super::base::{BaseDao, DaoError, DaoResult};
use super::follower::FollowerDao;
use crate::hydrate::{Hydrator, UserCard};

const DISPLAY_ID_LEN: usize = 6;
const DISPLAY_ID_ATTEMPTS: usize = 8;
const DISPLAY_ID_ALPHABET: [char; 36] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];
const SEARCH_LIMIT: i64 = 5;

pub fn generate_display_id() -> String {
    nanoid::nanoid!(DISPLAY_ID_LEN, &DISPLAY_ID_ALPHABET)
}

#[derive(Debug, Clone)]
pub struct CompleteProfile {
    pub name: String,
    pub gender: Gender,
    pub birth_date: String,
    pub country: String,
    pub image_id: Option<ObjectId>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub country: Option<String>,
    pub image_id: Option<ObjectId>,
    pub background_image_id: Option<ObjectId>,
    pub frame_url: Option<String>,
}

/// A profile joined with its account and resolved image URLs.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub profile: UserProfile,
    pub name: String,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub image_url: Option<String>,
    pub background_image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProfilePage {
    pub view: ProfileView,
    pub posts: Vec<Post>,
    pub followers: u64,
    pub following: u64,
    pub is_following: bool,
}

#[derive(Debug, Clone)]
pub struct PopupInfo {
    pub user_id: ObjectId,
    pub name: String,
    pub display_id: String,
    pub level: i32,
    pub is_vip: bool,
    pub image_url: Option<String>,
    pub is_following: bool,
}

pub struct ProfileDao {
    pub base: BaseDao<UserProfile>,
    users: BaseDao<User>,
    posts: BaseDao<Post>,
    followers: FollowerDao,
    hydrator: Hydrator,
    economy: EconomySettings,
}

impl ProfileDao {
    pub fn new(db: &Database, economy: EconomySettings, public_base_url: &str) -> Self {
        Self {
            base: BaseDao::new(db, UserProfile::COLLECTION),
            users: BaseDao::new(db, User::COLLECTION),
            posts: BaseDao::new(db, Post::COLLECTION),
            followers: FollowerDao::new(db),
            hydrator: Hydrator::new(db, public_base_url),
            economy,
        }
    }

    pub async fn find_by_user(&self, user_id: ObjectId) -> DaoResult<Option<UserProfile>> {
        self.base.find_one(doc! { "user_id": user_id }).await
    }

    /// Creates the caller's single profile with a fresh display id and the
    /// starting balance, then mirrors the chosen name onto the account.
    pub async fn complete(&self, user_id: ObjectId, input: CompleteProfile) -> DaoResult<UserProfile> {
        if self.find_by_user(user_id).await?.is_some() {
            return Err(DaoError::Conflict("Profile already completed".to_string()));
        }

        let now = DateTime::now();
        let mut profile = UserProfile {
            id: None,
            user_id,
            display_id: String::new(),
            name: input.name,
            gender: input.gender,
            birth_date: input.birth_date,
            country: input.country,
            image_id: input.image_id,
            background_image_id: None,
            level: self.economy.starting_level,
            coins: self.economy.starting_coins,
            is_vip: false,
            frame_url: None,
            created_at: now,
            updated_at: now,
        };

        for attempt in 1..=DISPLAY_ID_ATTEMPTS {
            profile.display_id = generate_display_id();
            match self.base.insert_one(&profile).await {
                Ok(id) => {
                    profile.id = Some(id);
                    self.users
                        .update_by_id(user_id, doc! { "$set": { "display_name": &profile.name } })
                        .await?;
                    info!(%user_id, display_id = %profile.display_id, "Profile completed");
                    return Ok(profile);
                }
                Err(DaoError::DuplicateKey(_)) => {
                    // Either a concurrent completion for the same user or a
                    // display id collision
                    if self.find_by_user(user_id).await?.is_some() {
                        return Err(DaoError::Conflict("Profile already completed".to_string()));
                    }
                    warn!(attempt, "Display id collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(DaoError::Conflict(
            "Could not allocate a unique display id".to_string(),
        ))
    }

    pub async fn update(&self, user_id: ObjectId, patch: ProfileUpdate) -> DaoResult<UserProfile> {
        let mut set = Document::new();
        if let Some(name) = &patch.name {
            set.insert("name", name.as_str());
        }
        if let Some(country) = patch.country {
            set.insert("country", country);
        }
        if let Some(image_id) = patch.image_id {
            set.insert("image_id", image_id);
        }
        if let Some(background_image_id) = patch.background_image_id {
            set.insert("background_image_id", background_image_id);
        }
        if let Some(frame_url) = patch.frame_url {
            set.insert("frame_url", frame_url);
        }

        if !set.is_empty() {
            let matched = self
                .base
                .update_one(doc! { "user_id": user_id }, doc! { "$set": set })
                .await?;
            if !matched {
                return Err(DaoError::Missing("Profile"));
            }
        }
        if let Some(name) = &patch.name {
            self.users
                .update_by_id(user_id, doc! { "$set": { "display_name": name.as_str() } })
                .await?;
        }

        self.find_by_user(user_id)
            .await?
            .ok_or(DaoError::Missing("Profile"))
    }

    /// The caller's own profile, or `None` before it has been completed.
    pub async fn own_profile(&self, user_id: ObjectId) -> DaoResult<Option<ProfileView>> {
        self.view(user_id).await
    }

    /// Someone's profile joined with their account. `None` when either the
    /// account or the profile is missing.
    pub async fn profile(&self, user_id: ObjectId) -> DaoResult<Option<ProfileView>> {
        let view = self.view(user_id).await?;
        Ok(view.filter(|v| v.email.is_some()))
    }

    pub async fn page(
        &self,
        user_id: ObjectId,
        viewer: Option<ObjectId>,
    ) -> DaoResult<Option<ProfilePage>> {
        let Some(view) = self.profile(user_id).await? else {
            return Ok(None);
        };

        let posts = self
            .posts
            .find_many(doc! { "author_id": user_id }, Some(doc! { "created_at": -1 }))
            .await?;
        let followers = self.followers.count_followers(user_id).await?;
        let following = self.followers.count_following(user_id).await?;
        let is_following = match viewer {
            Some(viewer) => self.followers.is_following(viewer, user_id).await?,
            None => false,
        };

        Ok(Some(ProfilePage {
            view,
            posts,
            followers,
            following,
            is_following,
        }))
    }

    pub async fn popup(
        &self,
        user_id: ObjectId,
        viewer: Option<ObjectId>,
    ) -> DaoResult<Option<PopupInfo>> {
        let Some(profile) = self.find_by_user(user_id).await? else {
            return Ok(None);
        };
        let is_following = match viewer {
            Some(viewer) => self.followers.is_following(viewer, user_id).await?,
            None => false,
        };

        Ok(Some(PopupInfo {
            user_id,
            image_url: self.hydrator.file_url(profile.image_id),
            name: profile.name,
            display_id: profile.display_id,
            level: profile.level,
            is_vip: profile.is_vip,
            is_following,
        }))
    }

    /// Up to five name matches plus an exact display-id match.
    pub async fn search(&self, query: &str) -> DaoResult<Vec<UserCard>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches = self
            .base
            .find_limited(
                doc! { "$text": { "$search": query } },
                doc! { "created_at": -1 },
                SEARCH_LIMIT,
            )
            .await?;
        if let Some(exact) = self
            .base
            .find_one(doc! { "display_id": query.to_uppercase() })
            .await?
        {
            if !matches.iter().any(|p| p.user_id == exact.user_id) {
                matches.push(exact);
            }
        }

        let ids: Vec<ObjectId> = matches.iter().map(|p| p.user_id).collect();
        let mut cards = self.hydrator.cards(&ids).await?;
        Ok(ids.iter().filter_map(|id| cards.remove(id)).collect())
    }

    async fn view(&self, user_id: ObjectId) -> DaoResult<Option<ProfileView>> {
        let Some(profile) = self.find_by_user(user_id).await? else {
            return Ok(None);
        };
        let user = self.users.get(user_id).await?;

        Ok(Some(ProfileView {
            name: profile.name.clone(),
            email: user.as_ref().map(|u| u.email.clone()),
            avatar: user.and_then(|u| u.avatar),
            image_url: self.hydrator.file_url(profile.image_id),
            background_image_url: self.hydrator.file_url(profile.background_image_id),
            profile,
        }))
    }
}

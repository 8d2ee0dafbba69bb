use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use tracing::debug;
use voxroom_db::models::{Follower, User};

use super::base::{BaseDao, DaoError, DaoResult};

pub struct FollowerDao {
    pub base: BaseDao<Follower>,
    users: BaseDao<User>,
}

impl FollowerDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Follower::COLLECTION),
            users: BaseDao::new(db, User::COLLECTION),
        }
    }

    /// Idempotent. Returns whether a new edge was written.
    pub async fn follow(&self, follower_id: ObjectId, following_id: ObjectId) -> DaoResult<bool> {
        if follower_id == following_id {
            return Err(DaoError::InvalidArgument(
                "You cannot follow yourself".to_string(),
            ));
        }
        if self.users.count(doc! { "_id": following_id }).await? == 0 {
            return Err(DaoError::Missing("User"));
        }

        let edge = Follower {
            id: None,
            follower_id,
            following_id,
            created_at: DateTime::now(),
        };
        match self.base.insert_one(&edge).await {
            Ok(_) => {
                debug!(%follower_id, %following_id, "Follow edge created");
                Ok(true)
            }
            Err(DaoError::DuplicateKey(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Idempotent. Returns whether an edge was removed.
    pub async fn unfollow(&self, follower_id: ObjectId, following_id: ObjectId) -> DaoResult<bool> {
        let deleted = self
            .base
            .hard_delete(doc! { "follower_id": follower_id, "following_id": following_id })
            .await?;
        Ok(deleted > 0)
    }

    pub async fn is_following(
        &self,
        follower_id: ObjectId,
        following_id: ObjectId,
    ) -> DaoResult<bool> {
        let count = self
            .base
            .count(doc! { "follower_id": follower_id, "following_id": following_id })
            .await?;
        Ok(count > 0)
    }

    pub async fn count_followers(&self, user_id: ObjectId) -> DaoResult<u64> {
        self.base.count(doc! { "following_id": user_id }).await
    }

    pub async fn count_following(&self, user_id: ObjectId) -> DaoResult<u64> {
        self.base.count(doc! { "follower_id": user_id }).await
    }
}

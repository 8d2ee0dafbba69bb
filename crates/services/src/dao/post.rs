use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use std::collections::HashMap;
use tracing::debug;
use voxroom_db::models::{Comment, Post, ReactionChange, ReactionKind};

use super::base::{BaseDao, DaoError, DaoResult};
use crate::hydrate::{Hydrator, UserCard};

#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: Comment,
    pub author: Option<UserCard>,
}

#[derive(Debug, Clone)]
pub struct PostView {
    pub post: Post,
    pub author: Option<UserCard>,
    pub image_url: Option<String>,
    pub comments: Vec<CommentView>,
    pub comment_count: usize,
}

pub struct PostDao {
    pub base: BaseDao<Post>,
    comments: BaseDao<Comment>,
    hydrator: Hydrator,
    max_cas_retries: u32,
}

impl PostDao {
    pub fn new(db: &Database, max_cas_retries: u32, public_base_url: &str) -> Self {
        Self {
            base: BaseDao::new(db, Post::COLLECTION),
            comments: BaseDao::new(db, Comment::COLLECTION),
            hydrator: Hydrator::new(db, public_base_url),
            max_cas_retries,
        }
    }

    pub async fn create(
        &self,
        author_id: ObjectId,
        text: String,
        image_id: Option<ObjectId>,
    ) -> DaoResult<Post> {
        let now = DateTime::now();
        let mut post = Post {
            id: None,
            author_id,
            text,
            image_id,
            reactions: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        post.id = Some(self.base.insert_one(&post).await?);
        Ok(post)
    }

    /// The whole feed, newest first, with authors and comments attached.
    pub async fn list(&self) -> DaoResult<Vec<PostView>> {
        let posts = self
            .base
            .find_many(doc! {}, Some(doc! { "created_at": -1, "_id": -1 }))
            .await?;
        let post_ids: Vec<ObjectId> = posts.iter().filter_map(|p| p.id).collect();
        let comments = if post_ids.is_empty() {
            Vec::new()
        } else {
            self.comments
                .find_many(
                    doc! { "post_id": { "$in": post_ids } },
                    Some(doc! { "created_at": -1, "_id": -1 }),
                )
                .await?
        };

        let mut author_ids: Vec<ObjectId> = posts.iter().map(|p| p.author_id).collect();
        author_ids.extend(comments.iter().map(|c| c.author_id));
        let cards = self.hydrator.cards(&author_ids).await?;

        let mut by_post: HashMap<ObjectId, Vec<CommentView>> = HashMap::new();
        for comment in comments {
            by_post.entry(comment.post_id).or_default().push(CommentView {
                author: cards.get(&comment.author_id).cloned(),
                comment,
            });
        }

        Ok(posts
            .into_iter()
            .map(|post| {
                let comments = post
                    .id
                    .and_then(|id| by_post.remove(&id))
                    .unwrap_or_default();
                PostView {
                    author: cards.get(&post.author_id).cloned(),
                    image_url: self.hydrator.file_url(post.image_id),
                    comment_count: comments.len(),
                    comments,
                    post,
                }
            })
            .collect())
    }

    /// Comments on a post, newest first.
    pub async fn comments(&self, post_id: ObjectId) -> DaoResult<Vec<CommentView>> {
        let comments = self
            .comments
            .find_many(
                doc! { "post_id": post_id },
                Some(doc! { "created_at": -1, "_id": -1 }),
            )
            .await?;
        let ids: Vec<ObjectId> = comments.iter().map(|c| c.author_id).collect();
        let cards = self.hydrator.cards(&ids).await?;
        Ok(comments
            .into_iter()
            .map(|comment| CommentView {
                author: cards.get(&comment.author_id).cloned(),
                comment,
            })
            .collect())
    }

    pub async fn comment(
        &self,
        post_id: ObjectId,
        author_id: ObjectId,
        text: String,
    ) -> DaoResult<Comment> {
        if self.base.count(doc! { "_id": post_id }).await? == 0 {
            return Err(DaoError::Missing("Post"));
        }
        let mut comment = Comment {
            id: None,
            post_id,
            author_id,
            text,
            created_at: DateTime::now(),
        };
        comment.id = Some(self.comments.insert_one(&comment).await?);
        Ok(comment)
    }

    /// Toggles the caller's reaction. The write only lands if the reaction
    /// list is still the one the toggle was computed from.
    pub async fn react(
        &self,
        post_id: ObjectId,
        user_id: ObjectId,
        kind: ReactionKind,
    ) -> DaoResult<(Post, ReactionChange)> {
        for attempt in 0..=self.max_cas_retries {
            let mut post = self
                .base
                .get(post_id)
                .await?
                .ok_or(DaoError::Missing("Post"))?;
            let before = bson::to_bson(&post.reactions)?;
            let change = post.toggle_reaction(user_id, kind);
            let after = bson::to_bson(&post.reactions)?;

            let matched = self
                .base
                .update_one(
                    doc! { "_id": post_id, "reactions": before },
                    doc! { "$set": { "reactions": after } },
                )
                .await?;
            if matched {
                return Ok((post, change));
            }
            debug!(%post_id, attempt, "Reactions changed concurrently, retrying");
        }

        Err(DaoError::Conflict(
            "The post changed while reacting, please try again".to_string(),
        ))
    }
}

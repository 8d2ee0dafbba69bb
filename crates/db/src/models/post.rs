use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub author_id: ObjectId,
    pub text: String,
    pub image_id: Option<ObjectId>,
    /// At most one entry per user.
    #[serde(default)]
    pub reactions: Vec<PostReaction>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostReaction {
    pub user_id: ObjectId,
    #[serde(rename = "type")]
    pub kind: ReactionKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Love,
    Laugh,
    Sad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    Added,
    Replaced,
    Removed,
}

impl Post {
    pub const COLLECTION: &'static str = "posts";

    /// Same kind twice removes the caller's reaction, a different kind
    /// replaces it.
    pub fn toggle_reaction(&mut self, user_id: ObjectId, kind: ReactionKind) -> ReactionChange {
        match self.reactions.iter().position(|r| r.user_id == user_id) {
            Some(i) if self.reactions[i].kind == kind => {
                self.reactions.remove(i);
                ReactionChange::Removed
            }
            Some(i) => {
                self.reactions[i].kind = kind;
                ReactionChange::Replaced
            }
            None => {
                self.reactions.push(PostReaction { user_id, kind });
                ReactionChange::Added
            }
        }
    }

    pub fn reaction_of(&self, user_id: ObjectId) -> Option<ReactionKind> {
        self.reactions
            .iter()
            .find(|r| r.user_id == user_id)
            .map(|r| r.kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub post_id: ObjectId,
    pub author_id: ObjectId,
    pub text: String,
    pub created_at: DateTime,
}

impl Comment {
    pub const COLLECTION: &'static str = "comments";
}

use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Directed edge: `follower_id` follows `following_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follower {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub follower_id: ObjectId,
    pub following_id: ObjectId,
    pub created_at: DateTime,
}

impl Follower {
    pub const COLLECTION: &'static str = "followers";
}

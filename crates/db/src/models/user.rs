use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// An account issued by the identity provider. Name and avatar are mutable,
/// the id never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl User {
    pub const COLLECTION: &'static str = "users";
}

use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    /// Short shareable code, distinct from the document id.
    pub display_id: String,
    pub name: String,
    pub gender: Gender,
    pub birth_date: String,
    pub country: String,
    pub image_id: Option<ObjectId>,
    pub background_image_id: Option<ObjectId>,
    #[serde(default = "default_level")]
    pub level: i32,
    #[serde(default)]
    pub coins: i64,
    #[serde(default)]
    pub is_vip: bool,
    pub frame_url: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

fn default_level() -> i32 {
    1
}

impl UserProfile {
    pub const COLLECTION: &'static str = "user_profiles";

    /// Name used in system announcements, with the VIP marker when applicable.
    pub fn announced_name(&self) -> String {
        if self.is_vip {
            format!("VIP {}", self.name)
        } else {
            self.name.clone()
        }
    }
}

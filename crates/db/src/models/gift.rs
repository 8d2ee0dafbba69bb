use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gift {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(rename = "type")]
    pub media_type: GiftMediaType,
    pub url: String,
    pub price: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GiftMediaType {
    Png,
    Mp4,
}

impl Gift {
    pub const COLLECTION: &'static str = "gifts";
}

/// Append-only feed entry: "sender sent gift to recipient in room".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalAnnouncement {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub sender_name: String,
    pub recipient_name: String,
    pub gift_name: String,
    pub room_name: String,
    pub created_at: DateTime,
}

impl GlobalAnnouncement {
    pub const COLLECTION: &'static str = "global_announcements";
}

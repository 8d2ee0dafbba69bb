use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// A room-scoped chat entry. System messages have no author; gift sends
/// carry `gift_id` and optionally the user the gift was addressed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub room_id: ObjectId,
    pub author_id: Option<ObjectId>,
    pub text: Option<String>,
    pub gift_id: Option<ObjectId>,
    /// `None` means the whole room.
    pub recipient_id: Option<ObjectId>,
    #[serde(default)]
    pub is_system_message: bool,
    pub created_at: DateTime,
}

impl ChatMessage {
    pub const COLLECTION: &'static str = "chat_messages";

    pub fn text(room_id: ObjectId, author_id: ObjectId, text: String) -> Self {
        Self {
            id: None,
            room_id,
            author_id: Some(author_id),
            text: Some(text),
            gift_id: None,
            recipient_id: None,
            is_system_message: false,
            created_at: DateTime::now(),
        }
    }

    pub fn system(room_id: ObjectId, text: String) -> Self {
        Self {
            id: None,
            room_id,
            author_id: None,
            text: Some(text),
            gift_id: None,
            recipient_id: None,
            is_system_message: true,
            created_at: DateTime::now(),
        }
    }

    pub fn gift(
        room_id: ObjectId,
        author_id: ObjectId,
        gift_id: ObjectId,
        recipient_id: Option<ObjectId>,
    ) -> Self {
        Self {
            id: None,
            room_id,
            author_id: Some(author_id),
            text: None,
            gift_id: Some(gift_id),
            recipient_id,
            is_system_message: false,
            created_at: DateTime::now(),
        }
    }
}

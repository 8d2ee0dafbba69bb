use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// A two-person thread. `participants` is kept sorted and `participant_key`
/// is derived from it, so one pair maps to exactly one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub participants: Vec<ObjectId>,
    pub participant_key: String,
    pub last_message_at: Option<DateTime>,
    pub created_at: DateTime,
}

impl Conversation {
    pub const COLLECTION: &'static str = "conversations";

    pub fn between(a: ObjectId, b: ObjectId) -> Self {
        let participants = sorted_pair(a, b).to_vec();
        Self {
            id: None,
            participant_key: participant_key(a, b),
            participants,
            last_message_at: None,
            created_at: DateTime::now(),
        }
    }

    pub fn includes(&self, user_id: ObjectId) -> bool {
        self.participants.contains(&user_id)
    }

    pub fn other_participant(&self, user_id: ObjectId) -> Option<ObjectId> {
        self.participants.iter().copied().find(|p| *p != user_id)
    }
}

pub fn sorted_pair(a: ObjectId, b: ObjectId) -> [ObjectId; 2] {
    let mut pair = [a, b];
    pair.sort();
    pair
}

pub fn participant_key(a: ObjectId, b: ObjectId) -> String {
    let [first, second] = sorted_pair(a, b);
    format!("{}:{}", first.to_hex(), second.to_hex())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateMessage {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub conversation_id: ObjectId,
    pub author_id: ObjectId,
    pub text: String,
    pub created_at: DateTime,
}

impl PrivateMessage {
    pub const COLLECTION: &'static str = "private_messages";
}

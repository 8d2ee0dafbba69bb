use bson::{DateTime, oid::ObjectId};
use serde::Serialize;
use voxroom_services::UserCard;

use crate::error::ApiError;

pub fn parse_id(raw: &str, field: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {field}")))
}

pub fn parse_optional_id(raw: Option<&str>, field: &str) -> Result<Option<ObjectId>, ApiError> {
    raw.filter(|s| !s.is_empty())
        .map(|s| parse_id(s, field))
        .transpose()
}

pub fn hex(id: Option<ObjectId>) -> String {
    id.map(|i| i.to_hex()).unwrap_or_default()
}

pub fn timestamp(dt: DateTime) -> String {
    dt.try_to_rfc3339_string().unwrap_or_default()
}

#[derive(Debug, Clone, Serialize)]
pub struct UserCardResponse {
    pub user_id: String,
    pub name: String,
    pub avatar: Option<String>,
    pub display_id: Option<String>,
    pub level: Option<i32>,
    pub is_vip: bool,
    pub image_url: Option<String>,
    pub frame_url: Option<String>,
}

impl From<UserCard> for UserCardResponse {
    fn from(card: UserCard) -> Self {
        Self {
            user_id: card.user_id.to_hex(),
            name: card.name,
            avatar: card.avatar,
            display_id: card.display_id,
            level: card.level,
            is_vip: card.is_vip,
            image_url: card.image_url,
            frame_url: card.frame_url,
        }
    }
}

use axum::{Json, extract::State};
use serde::Serialize;
use voxroom_db::models::{Gift, GiftMediaType, GlobalAnnouncement};

use super::common::{hex, timestamp};
use crate::{error::ApiError, state::AppState};

#[derive(Debug, Clone, Serialize)]
pub struct GiftResponse {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub media_type: GiftMediaType,
    pub url: String,
    pub price: i64,
}

impl From<Gift> for GiftResponse {
    fn from(gift: Gift) -> Self {
        Self {
            id: hex(gift.id),
            name: gift.name,
            media_type: gift.media_type,
            url: gift.url,
            price: gift.price,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnouncementResponse {
    pub id: String,
    pub sender_name: String,
    pub recipient_name: String,
    pub gift_name: String,
    pub room_name: String,
    pub created_at: String,
}

impl From<GlobalAnnouncement> for AnnouncementResponse {
    fn from(a: GlobalAnnouncement) -> Self {
        Self {
            id: hex(a.id),
            sender_name: a.sender_name,
            recipient_name: a.recipient_name,
            gift_name: a.gift_name,
            room_name: a.room_name,
            created_at: timestamp(a.created_at),
        }
    }
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<GiftResponse>>, ApiError> {
    let gifts = state.gifts.list().await?;
    Ok(Json(gifts.into_iter().map(GiftResponse::from).collect()))
}

pub async fn latest_announcement(
    State(state): State<AppState>,
) -> Result<Json<Option<AnnouncementResponse>>, ApiError> {
    let latest = state.gifts.latest_announcement().await?;
    Ok(Json(latest.map(AnnouncementResponse::from)))
}

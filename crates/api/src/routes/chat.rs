use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use validator::Validate;
use voxroom_services::dao::chat::ChatEntry;

use super::common::{UserCardResponse, hex, parse_id, parse_optional_id, timestamp};
use super::gift::GiftResponse;
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState, ws::events};

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 500))]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SendGiftRequest {
    pub gift_id: String,
    pub recipient_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessageResponse {
    pub id: String,
    pub room_id: String,
    pub author_id: Option<String>,
    pub text: Option<String>,
    pub gift_id: Option<String>,
    pub recipient_id: Option<String>,
    pub is_system_message: bool,
    pub created_at: String,
    pub author: Option<UserCardResponse>,
    pub gift: Option<GiftResponse>,
}

impl From<ChatEntry> for ChatMessageResponse {
    fn from(entry: ChatEntry) -> Self {
        let message = entry.message;
        Self {
            id: hex(message.id),
            room_id: message.room_id.to_hex(),
            author_id: message.author_id.map(|id| id.to_hex()),
            text: message.text,
            gift_id: message.gift_id.map(|id| id.to_hex()),
            recipient_id: message.recipient_id.map(|id| id.to_hex()),
            is_system_message: message.is_system_message,
            created_at: timestamp(message.created_at),
            author: entry.author.map(UserCardResponse::from),
            gift: entry.gift.map(GiftResponse::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GiftSentResponse {
    pub message: ChatMessageResponse,
    pub balance: i64,
}

pub async fn list(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<ChatMessageResponse>>, ApiError> {
    let rid = parse_id(&room_id, "room_id")?;
    let entries = state.chat.list(rid).await?;
    Ok(Json(
        entries.into_iter().map(ChatMessageResponse::from).collect(),
    ))
}

pub async fn send(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<ChatMessageResponse>, ApiError> {
    body.validate()?;
    let text = body.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::Validation("Message cannot be empty".to_string()));
    }

    let rid = parse_id(&room_id, "room_id")?;
    let message = state.chat.send(rid, auth.user_id, text).await?;
    let entries = state.chat.hydrate(vec![message]).await?;
    events::chat_entries(&state, rid, &entries).await;

    entries
        .into_iter()
        .next()
        .map(|entry| Json(ChatMessageResponse::from(entry)))
        .ok_or_else(|| ApiError::Internal("Message was not hydrated".to_string()))
}

pub async fn send_gift(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<String>,
    Json(body): Json<SendGiftRequest>,
) -> Result<Json<GiftSentResponse>, ApiError> {
    let rid = parse_id(&room_id, "room_id")?;
    let gift_id = parse_id(&body.gift_id, "gift_id")?;
    let recipient_id = parse_optional_id(body.recipient_id.as_deref(), "recipient_id")?;

    let sent = state
        .chat
        .send_gift(rid, auth.user_id, gift_id, recipient_id)
        .await?;

    let entries = state.chat.hydrate(vec![sent.message]).await?;
    events::chat_entries(&state, rid, &entries).await;
    events::announcement(&state, &sent.announcement).await;

    let message = entries
        .into_iter()
        .next()
        .map(ChatMessageResponse::from)
        .ok_or_else(|| ApiError::Internal("Message was not hydrated".to_string()))?;
    Ok(Json(GiftSentResponse {
        message,
        balance: sent.balance,
    }))
}

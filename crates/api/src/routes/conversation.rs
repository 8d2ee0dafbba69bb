use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use validator::Validate;
use voxroom_db::models::{Conversation, PrivateMessage};
use voxroom_services::UserCard;

use super::common::{UserCardResponse, hex, parse_id, timestamp};
use crate::{
    error::ApiError,
    extractors::auth::{AuthUser, MaybeAuthUser},
    state::AppState,
    ws::events,
};

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub participant_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendPrivateMessageRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub id: String,
    pub participants: Vec<String>,
    pub last_message_at: Option<String>,
    pub created_at: String,
}

impl From<&Conversation> for ConversationResponse {
    fn from(c: &Conversation) -> Self {
        Self {
            id: hex(c.id),
            participants: c.participants.iter().map(|id| id.to_hex()).collect(),
            last_message_at: c.last_message_at.map(timestamp),
            created_at: timestamp(c.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationSummaryResponse {
    #[serde(flatten)]
    pub conversation: ConversationResponse,
    pub other: Option<UserCardResponse>,
    pub last_message: Option<PrivateMessageResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrivateMessageResponse {
    pub id: String,
    pub conversation_id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: String,
    pub author: Option<UserCardResponse>,
}

fn message_response(message: PrivateMessage, author: Option<UserCard>) -> PrivateMessageResponse {
    PrivateMessageResponse {
        id: hex(message.id),
        conversation_id: message.conversation_id.to_hex(),
        author_id: message.author_id.to_hex(),
        text: message.text,
        created_at: timestamp(message.created_at),
        author: author.map(UserCardResponse::from),
    }
}

/// The caller's conversations, most recent activity first. Anonymous
/// callers get an empty list.
pub async fn list(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
) -> Result<Json<Vec<ConversationSummaryResponse>>, ApiError> {
    let Some(user_id) = auth.user_id() else {
        return Ok(Json(Vec::new()));
    };

    let summaries = state.conversations.list_for(user_id).await?;
    Ok(Json(
        summaries
            .into_iter()
            .map(|s| ConversationSummaryResponse {
                conversation: ConversationResponse::from(&s.conversation),
                other: s.other.map(UserCardResponse::from),
                last_message: s.last_message.map(|m| message_response(m, None)),
            })
            .collect(),
    ))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateConversationRequest>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let participant = parse_id(&body.participant_id, "participant_id")?;
    let conversation = state
        .conversations
        .get_or_create(auth.user_id, participant)
        .await?;
    Ok(Json(ConversationResponse::from(&conversation)))
}

pub async fn messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<PrivateMessageResponse>>, ApiError> {
    let cid = parse_id(&conversation_id, "conversation_id")?;
    let messages = state.conversations.messages(cid, auth.user_id).await?;
    let authors = state.conversations.hydrate_authors(&messages).await?;

    Ok(Json(
        messages
            .into_iter()
            .map(|m| {
                let author = authors.get(&m.author_id).cloned();
                message_response(m, author)
            })
            .collect(),
    ))
}

pub async fn send(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(conversation_id): Path<String>,
    Json(body): Json<SendPrivateMessageRequest>,
) -> Result<Json<PrivateMessageResponse>, ApiError> {
    body.validate()?;
    let cid = parse_id(&conversation_id, "conversation_id")?;
    let (conversation, message) = state
        .conversations
        .send(cid, auth.user_id, body.text)
        .await?;

    let author = state.hydrator.card(auth.user_id).await?;
    let response = message_response(message, author);
    events::private_message(&state, &conversation, &response).await;

    Ok(Json(response))
}

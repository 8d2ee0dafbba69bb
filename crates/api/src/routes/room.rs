use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use validator::Validate;
use voxroom_db::models::Room;

use super::common::{UserCardResponse, hex, parse_id, timestamp};
use crate::{
    error::ApiError,
    extractors::auth::{AuthUser, MaybeAuthUser},
    state::AppState,
    ws::events,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoomRequest {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct TakeSeatRequest {
    pub seat_index: i64,
}

#[derive(Debug, Deserialize)]
pub struct SpeakingRequest {
    pub is_speaking: bool,
}

#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BanRequest {
    pub user_id: String,
    #[validate(range(min = 1))]
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BanResponse {
    pub user_id: String,
    pub banned_until: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomResponse {
    pub id: String,
    pub name: String,
    pub image: String,
    pub display_id: String,
    pub owner_id: String,
    pub seats: Vec<Option<String>>,
    pub admins: Vec<String>,
    pub banned_users: Vec<BanResponse>,
    pub speaking_seat_index: Option<usize>,
    pub locked_seats: Vec<bool>,
    pub version: i64,
    pub created_at: String,
}

impl From<&Room> for RoomResponse {
    fn from(room: &Room) -> Self {
        Self {
            id: hex(room.id),
            name: room.name.clone(),
            image: room.image.clone(),
            display_id: room.display_id.clone(),
            owner_id: room.owner_id.to_hex(),
            seats: room.seats.iter().map(|s| s.map(|id| id.to_hex())).collect(),
            admins: room.admins.iter().map(|id| id.to_hex()).collect(),
            banned_users: room
                .banned_users
                .iter()
                .map(|b| BanResponse {
                    user_id: b.user_id.to_hex(),
                    banned_until: timestamp(b.banned_until),
                })
                .collect(),
            speaking_seat_index: room.speaking_seat_index,
            locked_seats: room.locked_seats.to_vec(),
            version: room.version,
            created_at: timestamp(room.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoomSummaryResponse {
    #[serde(flatten)]
    pub room: RoomResponse,
    pub owner_name: String,
    pub occupied_seats: usize,
}

/// The room with every seat resolved to the user sitting in it.
#[derive(Debug, Serialize)]
pub struct RoomDetailResponse {
    #[serde(flatten)]
    pub room: RoomResponse,
    pub seat_users: Vec<Option<UserCardResponse>>,
}

#[derive(Debug, Serialize)]
pub struct LeaveSeatResponse {
    pub seat_index: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SpeakingResponse {
    pub changed: bool,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<RoomSummaryResponse>>, ApiError> {
    let rooms = state.rooms.list().await?;
    Ok(Json(
        rooms
            .into_iter()
            .map(|summary| RoomSummaryResponse {
                occupied_seats: summary.room.occupied_seats(),
                room: RoomResponse::from(&summary.room),
                owner_name: summary.owner_name,
            })
            .collect(),
    ))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateRoomRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    body.validate()?;
    let room = state
        .rooms
        .create(auth.user_id, body.name.trim().to_string(), body.image)
        .await?;
    Ok(Json(RoomResponse::from(&room)))
}

pub async fn search_users(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<UserCardResponse>>, ApiError> {
    let cards = state.profiles.search(&params.q).await?;
    Ok(Json(cards.into_iter().map(UserCardResponse::from).collect()))
}

pub async fn get(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailResponse>, ApiError> {
    let rid = parse_id(&room_id, "room_id")?;
    let detail = state.rooms.get(rid).await?;
    Ok(Json(RoomDetailResponse {
        room: RoomResponse::from(&detail.room),
        seat_users: detail
            .seats
            .into_iter()
            .map(|card| card.map(UserCardResponse::from))
            .collect(),
    }))
}

pub async fn take_seat(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<String>,
    Json(body): Json<TakeSeatRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let rid = parse_id(&room_id, "room_id")?;
    let change = state
        .rooms
        .take_seat(rid, auth.user_id, body.seat_index)
        .await?;

    events::room_updated(&state, &change.room).await;
    events::chat_messages(&state, rid, change.messages).await;

    Ok(Json(RoomResponse::from(&change.room)))
}

pub async fn leave_seat(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<LeaveSeatResponse>, ApiError> {
    let rid = parse_id(&room_id, "room_id")?;
    let change = state.rooms.leave_seat(rid, auth.user_id).await?;

    let seat_index = match change {
        Some(change) => {
            events::room_updated(&state, &change.room).await;
            Some(change.outcome)
        }
        None => None,
    };
    Ok(Json(LeaveSeatResponse { seat_index }))
}

/// Anonymous callers are ignored rather than rejected.
pub async fn speaking(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
    Path(room_id): Path<String>,
    Json(body): Json<SpeakingRequest>,
) -> Result<Json<SpeakingResponse>, ApiError> {
    let Some(user_id) = auth.user_id() else {
        return Ok(Json(SpeakingResponse { changed: false }));
    };
    let rid = parse_id(&room_id, "room_id")?;
    let room = state
        .rooms
        .set_speaking(rid, user_id, body.is_speaking)
        .await?;

    if let Some(ref room) = room {
        events::room_updated(&state, room).await;
    }
    Ok(Json(SpeakingResponse {
        changed: room.is_some(),
    }))
}

pub async fn appoint_admin(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<String>,
    Json(body): Json<TargetRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let rid = parse_id(&room_id, "room_id")?;
    let target = parse_id(&body.user_id, "user_id")?;
    let change = state.rooms.appoint_admin(rid, auth.user_id, target).await?;

    if change.outcome {
        events::room_updated(&state, &change.room).await;
    }
    Ok(Json(RoomResponse::from(&change.room)))
}

pub async fn remove_admin(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<String>,
    Json(body): Json<TargetRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let rid = parse_id(&room_id, "room_id")?;
    let target = parse_id(&body.user_id, "user_id")?;
    let change = state.rooms.remove_admin(rid, auth.user_id, target).await?;

    if change.outcome {
        events::room_updated(&state, &change.room).await;
    }
    Ok(Json(RoomResponse::from(&change.room)))
}

pub async fn kick(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<String>,
    Json(body): Json<TargetRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let rid = parse_id(&room_id, "room_id")?;
    let target = parse_id(&body.user_id, "user_id")?;
    let change = state.rooms.kick(rid, auth.user_id, target).await?;

    if change.outcome.is_some() {
        events::room_updated(&state, &change.room).await;
    }
    events::chat_messages(&state, rid, change.messages).await;

    Ok(Json(RoomResponse::from(&change.room)))
}

pub async fn ban(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<String>,
    Json(body): Json<BanRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    body.validate()?;
    let rid = parse_id(&room_id, "room_id")?;
    let target = parse_id(&body.user_id, "user_id")?;
    let change = state
        .rooms
        .ban(rid, auth.user_id, target, body.duration_minutes)
        .await?;

    events::room_updated(&state, &change.room).await;
    events::chat_messages(&state, rid, change.messages).await;

    Ok(Json(RoomResponse::from(&change.room)))
}

pub async fn unban(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<String>,
    Json(body): Json<TargetRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let rid = parse_id(&room_id, "room_id")?;
    let target = parse_id(&body.user_id, "user_id")?;
    let change = state.rooms.unban(rid, auth.user_id, target).await?;

    if change.outcome {
        events::room_updated(&state, &change.room).await;
    }
    Ok(Json(RoomResponse::from(&change.room)))
}

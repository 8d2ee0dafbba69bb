use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use validator::Validate;
use voxroom_db::models::Gender;
use voxroom_services::dao::profile::{
    CompleteProfile, PopupInfo, ProfilePage, ProfileUpdate, ProfileView,
};

use super::common::{parse_id, parse_optional_id, timestamp};
use super::post::PostResponse;
use crate::{
    error::ApiError,
    extractors::auth::{AuthUser, MaybeAuthUser},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CompleteProfileRequest {
    #[validate(length(min = 1, max = 32))]
    pub name: String,
    pub gender: Gender,
    #[validate(length(min = 1, max = 32))]
    pub birth_date: String,
    #[validate(length(min = 1, max = 64))]
    pub country: String,
    pub image_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 32))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub country: Option<String>,
    pub image_id: Option<String>,
    pub background_image_id: Option<String>,
    #[validate(url)]
    pub frame_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: String,
    pub display_id: String,
    pub name: String,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub gender: Gender,
    pub birth_date: String,
    pub country: String,
    pub image_url: Option<String>,
    pub background_image_url: Option<String>,
    pub level: i32,
    pub coins: i64,
    pub is_vip: bool,
    pub frame_url: Option<String>,
    pub created_at: String,
}

impl From<ProfileView> for ProfileResponse {
    fn from(view: ProfileView) -> Self {
        let p = view.profile;
        Self {
            user_id: p.user_id.to_hex(),
            display_id: p.display_id,
            name: view.name,
            email: view.email,
            avatar: view.avatar,
            gender: p.gender,
            birth_date: p.birth_date,
            country: p.country,
            image_url: view.image_url,
            background_image_url: view.background_image_url,
            level: p.level,
            coins: p.coins,
            is_vip: p.is_vip,
            frame_url: p.frame_url,
            created_at: timestamp(p.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfilePageResponse {
    pub profile: ProfileResponse,
    pub posts: Vec<PostResponse>,
    pub followers: u64,
    pub following: u64,
    pub is_following: bool,
}

impl From<ProfilePage> for ProfilePageResponse {
    fn from(page: ProfilePage) -> Self {
        Self {
            profile: ProfileResponse::from(page.view),
            posts: page.posts.iter().map(PostResponse::from).collect(),
            followers: page.followers,
            following: page.following,
            is_following: page.is_following,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PopupResponse {
    pub user_id: String,
    pub name: String,
    pub display_id: String,
    pub level: i32,
    pub is_vip: bool,
    pub image_url: Option<String>,
    pub is_following: bool,
}

impl From<PopupInfo> for PopupResponse {
    fn from(info: PopupInfo) -> Self {
        Self {
            user_id: info.user_id.to_hex(),
            name: info.name,
            display_id: info.display_id,
            level: info.level,
            is_vip: info.is_vip,
            image_url: info.image_url,
            is_following: info.is_following,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FollowResponse {
    pub following: bool,
    pub changed: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadUrlResponse {
    pub upload_url: String,
    pub expires_at: String,
}

/// The caller's own profile, `null` for anonymous callers and until it has
/// been completed.
pub async fn own_profile(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
) -> Result<Json<Option<ProfileResponse>>, ApiError> {
    let Some(user_id) = auth.user_id() else {
        return Ok(Json(None));
    };
    let view = state.profiles.own_profile(user_id).await?;
    Ok(Json(view.map(ProfileResponse::from)))
}

pub async fn complete_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CompleteProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    body.validate()?;
    let image_id = parse_optional_id(body.image_id.as_deref(), "image_id")?;
    state
        .profiles
        .complete(
            auth.user_id,
            CompleteProfile {
                name: body.name.trim().to_string(),
                gender: body.gender,
                birth_date: body.birth_date,
                country: body.country,
                image_id,
            },
        )
        .await?;

    own_view(&state, &auth).await
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    body.validate()?;
    let patch = ProfileUpdate {
        name: body.name.map(|n| n.trim().to_string()),
        country: body.country,
        image_id: parse_optional_id(body.image_id.as_deref(), "image_id")?,
        background_image_id: parse_optional_id(
            body.background_image_id.as_deref(),
            "background_image_id",
        )?,
        frame_url: body.frame_url,
    };
    state.profiles.update(auth.user_id, patch).await?;

    own_view(&state, &auth).await
}

pub async fn profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Option<ProfileResponse>>, ApiError> {
    let uid = parse_id(&user_id, "user_id")?;
    let view = state.profiles.profile(uid).await?;
    Ok(Json(view.map(ProfileResponse::from)))
}

pub async fn page(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<Option<ProfilePageResponse>>, ApiError> {
    let uid = parse_id(&user_id, "user_id")?;
    let page = state.profiles.page(uid, auth.user_id()).await?;
    Ok(Json(page.map(ProfilePageResponse::from)))
}

pub async fn popup(
    State(state): State<AppState>,
    auth: MaybeAuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<Option<PopupResponse>>, ApiError> {
    let uid = parse_id(&user_id, "user_id")?;
    let info = state.profiles.popup(uid, auth.user_id()).await?;
    Ok(Json(info.map(PopupResponse::from)))
}

pub async fn follow(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<FollowResponse>, ApiError> {
    let uid = parse_id(&user_id, "user_id")?;
    let changed = state.followers.follow(auth.user_id, uid).await?;
    Ok(Json(FollowResponse {
        following: true,
        changed,
    }))
}

pub async fn unfollow(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<FollowResponse>, ApiError> {
    let uid = parse_id(&user_id, "user_id")?;
    let changed = state.followers.unfollow(auth.user_id, uid).await?;
    Ok(Json(FollowResponse {
        following: false,
        changed,
    }))
}

/// Hands out a single-use URL the client POSTs raw bytes to.
pub async fn generate_upload_url(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UploadUrlResponse>, ApiError> {
    let file = state
        .files
        .create_upload(auth.user_id, state.settings.storage.upload_url_ttl_secs)
        .await?;

    let base = state.settings.app.public_base_url.trim_end_matches('/');
    Ok(Json(UploadUrlResponse {
        upload_url: format!("{base}/api/storage/upload/{}", file.upload_token),
        expires_at: timestamp(file.upload_expires_at),
    }))
}

async fn own_view(state: &AppState, auth: &AuthUser) -> Result<Json<ProfileResponse>, ApiError> {
    state
        .profiles
        .own_profile(auth.user_id)
        .await?
        .map(|view| Json(ProfileResponse::from(view)))
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))
}

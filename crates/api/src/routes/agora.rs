use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use validator::Validate;
use voxroom_services::media::build_rtc_token;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, max = 64))]
    pub channel_name: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub app_id: String,
    pub channel_name: String,
    pub uid: String,
    pub expires_at: u64,
}

/// Join-and-publish token for the caller on `channel_name` (a room id).
pub async fn token(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    body.validate()?;
    let issued = build_rtc_token(
        &state.settings.agora,
        &body.channel_name,
        &auth.user_id.to_hex(),
    )?;

    Ok(Json(TokenResponse {
        token: issued.token,
        app_id: issued.app_id,
        channel_name: issued.channel_name,
        uid: issued.uid,
        expires_at: issued.expires_at,
    }))
}

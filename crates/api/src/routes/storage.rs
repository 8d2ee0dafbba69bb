use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, header},
};
use serde::Serialize;

use super::common::{hex, parse_id};
use crate::{error::ApiError, state::AppState};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub storage_id: String,
}

/// Stores the request body behind a single-use upload token. The token is
/// the credential, so no session is required.
pub async fn upload(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    state.files.pending_upload(&token).await?;

    if body.is_empty() {
        return Err(ApiError::BadRequest("Upload body is empty".to_string()));
    }
    if body.len() > state.settings.storage.max_upload_bytes {
        return Err(ApiError::BadRequest("Upload is too large".to_string()));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let key = state.blobs.put(&body).await?;
    let file = state
        .files
        .complete_upload(&token, key, content_type, body.len() as u64)
        .await?;

    Ok(Json(UploadResponse {
        storage_id: hex(file.id),
    }))
}

pub async fn download(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<(HeaderMap, Bytes), ApiError> {
    let fid = parse_id(&file_id, "file_id")?;
    let file = state.files.find_ready(fid).await?;
    let key = file
        .sha256
        .ok_or_else(|| ApiError::NotFound("File not found".to_string()))?;
    let bytes = state.blobs.read(&key).await?;

    let mut headers = HeaderMap::new();
    let content_type = file
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    Ok((headers, Bytes::from(bytes)))
}

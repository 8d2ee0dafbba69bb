use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use validator::Validate;
use voxroom_db::models::{Post, ReactionChange, ReactionKind};
use voxroom_services::dao::post::{CommentView, PostView};

use super::common::{UserCardResponse, hex, parse_id, parse_optional_id, timestamp};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    pub image_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ReactRequest {
    #[serde(rename = "type")]
    pub kind: ReactionKind,
}

#[derive(Debug, Serialize)]
pub struct ReactionResponse {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: ReactionKind,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: String,
    pub author_id: String,
    pub text: String,
    pub image_id: Option<String>,
    pub reactions: Vec<ReactionResponse>,
    pub created_at: String,
}

impl From<&Post> for PostResponse {
    fn from(post: &Post) -> Self {
        Self {
            id: hex(post.id),
            author_id: post.author_id.to_hex(),
            text: post.text.clone(),
            image_id: post.image_id.map(|id| id.to_hex()),
            reactions: post
                .reactions
                .iter()
                .map(|r| ReactionResponse {
                    user_id: r.user_id.to_hex(),
                    kind: r.kind,
                })
                .collect(),
            created_at: timestamp(post.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: String,
    pub author: Option<UserCardResponse>,
}

impl From<CommentView> for CommentResponse {
    fn from(view: CommentView) -> Self {
        let c = view.comment;
        Self {
            id: hex(c.id),
            post_id: c.post_id.to_hex(),
            author_id: c.author_id.to_hex(),
            text: c.text,
            created_at: timestamp(c.created_at),
            author: view.author.map(UserCardResponse::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostViewResponse {
    #[serde(flatten)]
    pub post: PostResponse,
    pub author: Option<UserCardResponse>,
    pub image_url: Option<String>,
    pub comments: Vec<CommentResponse>,
    pub comment_count: usize,
}

impl From<PostView> for PostViewResponse {
    fn from(view: PostView) -> Self {
        Self {
            post: PostResponse::from(&view.post),
            author: view.author.map(UserCardResponse::from),
            image_url: view.image_url,
            comments: view.comments.into_iter().map(CommentResponse::from).collect(),
            comment_count: view.comment_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReactResponse {
    pub post: PostResponse,
    /// `added`, `replaced` or `removed`.
    pub change: &'static str,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<PostViewResponse>>, ApiError> {
    let posts = state.posts.list().await?;
    Ok(Json(posts.into_iter().map(PostViewResponse::from).collect()))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreatePostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    body.validate()?;
    let image_id = parse_optional_id(body.image_id.as_deref(), "image_id")?;
    let post = state.posts.create(auth.user_id, body.text, image_id).await?;
    Ok(Json(PostResponse::from(&post)))
}

pub async fn comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let pid = parse_id(&post_id, "post_id")?;
    let comments = state.posts.comments(pid).await?;
    Ok(Json(comments.into_iter().map(CommentResponse::from).collect()))
}

pub async fn comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
    Json(body): Json<CommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    body.validate()?;
    let pid = parse_id(&post_id, "post_id")?;
    let comment = state.posts.comment(pid, auth.user_id, body.text).await?;
    let author = state.hydrator.card(auth.user_id).await?;
    Ok(Json(CommentResponse::from(CommentView { comment, author })))
}

pub async fn react(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(post_id): Path<String>,
    Json(body): Json<ReactRequest>,
) -> Result<Json<ReactResponse>, ApiError> {
    let pid = parse_id(&post_id, "post_id")?;
    let (post, change) = state.posts.react(pid, auth.user_id, body.kind).await?;
    let change = match change {
        ReactionChange::Added => "added",
        ReactionChange::Replaced => "replaced",
        ReactionChange::Removed => "removed",
    };
    Ok(Json(ReactResponse {
        post: PostResponse::from(&post),
        change,
    }))
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;
use validator::ValidationErrors;
use voxroom_db::models::RoomRuleError;
use voxroom_services::auth::AuthError;
use voxroom_services::dao::base::DaoError;
use voxroom_services::media::TokenError;
use voxroom_services::storage::StorageError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Banned(String),
    Conflict(String),
    InsufficientFunds(String),
    Unavailable(String),
    Internal(String),
    Validation(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::Banned(msg) => (StatusCode::FORBIDDEN, "banned", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::InsufficientFunds(msg) => {
                (StatusCode::PAYMENT_REQUIRED, "insufficient_funds", msg)
            }
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg),
            ApiError::Internal(msg) => {
                error!(%msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
            }
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, "validation", msg),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DaoError> for ApiError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            DaoError::Missing(what) => ApiError::NotFound(format!("{what} not found")),
            DaoError::DuplicateKey(msg) => ApiError::Conflict(msg),
            DaoError::Conflict(msg) => ApiError::Conflict(msg),
            DaoError::Forbidden(msg) => ApiError::Forbidden(msg),
            DaoError::Validation(msg) => ApiError::Validation(msg),
            DaoError::InvalidArgument(msg) => ApiError::BadRequest(msg),
            DaoError::InsufficientFunds { .. } => {
                ApiError::InsufficientFunds("Not enough coins".to_string())
            }
            DaoError::Room(e) => e.into(),
            DaoError::Mongo(e) => ApiError::Internal(e.to_string()),
            DaoError::BsonSer(e) => ApiError::Internal(e.to_string()),
            DaoError::BsonDe(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<RoomRuleError> for ApiError {
    fn from(err: RoomRuleError) -> Self {
        let msg = err.to_string();
        match err {
            RoomRuleError::Banned { .. } => ApiError::Banned(msg),
            RoomRuleError::InvalidSeat(_) => ApiError::BadRequest(msg),
            RoomRuleError::SeatTaken(_) => ApiError::Conflict(msg),
            RoomRuleError::NotOwner
            | RoomRuleError::NotModerator
            | RoomRuleError::TargetIsOwner => ApiError::Forbidden(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            AuthError::TokenExpired => ApiError::Unauthorized("Token expired".to_string()),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
            AuthError::HashError(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::NotConfigured => ApiError::Unavailable(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => ApiError::NotFound("File not found".to_string()),
            StorageError::InvalidKey => ApiError::BadRequest(err.to_string()),
            StorageError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(err: ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}

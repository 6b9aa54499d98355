use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use uuid::Uuid;

use crate::models::candidate::BlockNotice;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Candidate already applied to this process")]
    DuplicateApplication,

    #[error("Round {0} has already been submitted")]
    RoundAlreadySubmitted(Uuid),

    #[error("Required field \"{question}\" has no answer")]
    IncompleteSubmission { field_id: Uuid, question: String },

    #[error("Unrecognised timeline format: {0}")]
    InvalidTimelineFormat(String),

    #[error("Round {0} already has a timeline")]
    TimelineAlreadySet(Uuid),

    #[error("Block duration must be between 1 and 720 hours, got {0}")]
    InvalidBlockDuration(i64),

    #[error("Account is blocked: {}", .0.reason)]
    AccountBlocked(BlockNotice),

    #[error("Consistency error: {0}")]
    Consistency(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let message = self.to_string();
        let (status, body) = match self {
            Error::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "bad_request", "message": message }),
            ),
            Error::Validation(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation_error", "message": message }),
            ),
            Error::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "unauthorized", "message": message }),
            ),
            Error::Forbidden(_) => (
                StatusCode::FORBIDDEN,
                json!({ "error": "forbidden", "message": message }),
            ),
            Error::NotFound(_) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "not_found", "message": message }),
            ),
            Error::Conflict(_) => (
                StatusCode::CONFLICT,
                json!({ "error": "conflict", "message": message }),
            ),
            Error::DuplicateApplication => (
                StatusCode::CONFLICT,
                json!({ "error": "duplicate_application", "message": message }),
            ),
            Error::RoundAlreadySubmitted(round_id) => (
                StatusCode::CONFLICT,
                json!({ "error": "round_already_submitted", "message": message, "roundId": round_id }),
            ),
            Error::IncompleteSubmission { field_id, .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "incomplete_submission", "message": message, "fieldId": field_id }),
            ),
            Error::InvalidTimelineFormat(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "invalid_timeline_format", "message": message }),
            ),
            Error::TimelineAlreadySet(round_id) => (
                StatusCode::CONFLICT,
                json!({ "error": "timeline_already_set", "message": message, "roundId": round_id }),
            ),
            Error::InvalidBlockDuration(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "invalid_block_duration", "message": message }),
            ),
            Error::AccountBlocked(notice) => (
                StatusCode::FORBIDDEN,
                json!({
                    "error": "account_blocked",
                    "message": message,
                    "reason": notice.reason,
                    "blockedUntil": notice.blocked_until,
                    "hoursRemaining": notice.hours_remaining,
                    "minutesRemaining": notice.minutes_remaining,
                }),
            ),
            Error::Consistency(_) => {
                tracing::error!(error = %message, "partial update left records out of sync");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "consistency_error", "message": message }),
                )
            }
            other => {
                tracing::error!(error = ?other, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "internal_error", "message": "An unexpected error occurred" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}

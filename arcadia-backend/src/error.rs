use arcadia_db::DbError;
use argon2::password_hash;
use axum::{
  Json,
  extract::multipart::MultipartError,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::content_filter::Rejection;
use crate::media::MediaError;
use crate::validation::ValidationError;

/// API error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
  pub success: bool,
  pub error: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<String>,
}

impl ErrorResponse {
  pub fn new(error: impl Into<String>) -> Self {
    Self {
      success: false,
      error: error.into(),
      details: None,
    }
  }

  pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
    Self {
      success: false,
      error: error.into(),
      details: Some(details.into()),
    }
  }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
  Validation(ValidationError),
  ContentRejected(Rejection),
  Unauthorized(&'static str),
  Forbidden(&'static str),
  NotFound(&'static str),
  Conflict(&'static str),
  Database(DbError),
  Storage(MediaError),
  PasswordHash(password_hash::Error),
  PayloadTooLarge,
}

const INTERNAL_MESSAGE: &str = "An internal error occurred. Please try again later.";

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      AppError::Validation(err) => {
        tracing::warn!(validation_error = %err, "Validation failed");
        (StatusCode::BAD_REQUEST, ErrorResponse::new(err.to_string()))
      }
      AppError::ContentRejected(rejection) => {
        tracing::warn!(%rejection, "Upload failed the content check");
        (
          StatusCode::UNPROCESSABLE_ENTITY,
          ErrorResponse::with_details("The game file failed the content check", rejection.to_string()),
        )
      }
      AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ErrorResponse::new(msg)),
      AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorResponse::new(msg)),
      AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new(msg)),
      AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::new(msg)),
      AppError::PayloadTooLarge => (
        StatusCode::PAYLOAD_TOO_LARGE,
        ErrorResponse::new("The upload is too large"),
      ),
      AppError::PasswordHash(err) => {
        tracing::error!(error = %err, "Password hashing failed");
        (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(INTERNAL_MESSAGE))
      }
      AppError::Database(db_err) => {
        // Return user-friendly error to client
        let (status, message) = match db_err {
          DbError::GameNotFound => (StatusCode::NOT_FOUND, "Game not found"),
          DbError::UserNotFound => (StatusCode::NOT_FOUND, "User not found"),
          DbError::UsernameTaken => (StatusCode::CONFLICT, "Username is already taken"),
          DbError::Io { .. } | DbError::Serialize { .. } => {
            // Don't expose paths or serializer messages
            tracing::error!(?db_err, "Internal database error");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
          }
        };
        (status, ErrorResponse::new(message))
      }
      AppError::Storage(media_err) => match media_err {
        MediaError::AlreadyExists(path) => {
          tracing::warn!(%path, "Upload name collision");
          (
            StatusCode::CONFLICT,
            ErrorResponse::new("A file with this name was just uploaded. Please try again."),
          )
        }
        other => {
          tracing::error!(error = ?other, "Media storage error");
          (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(INTERNAL_MESSAGE))
        }
      },
    };

    (status, Json(body)).into_response()
  }
}

impl From<DbError> for AppError {
  fn from(err: DbError) -> Self {
    AppError::Database(err)
  }
}

impl From<ValidationError> for AppError {
  fn from(err: ValidationError) -> Self {
    AppError::Validation(err)
  }
}

impl From<Rejection> for AppError {
  fn from(rejection: Rejection) -> Self {
    AppError::ContentRejected(rejection)
  }
}

impl From<MediaError> for AppError {
  fn from(err: MediaError) -> Self {
    AppError::Storage(err)
  }
}

impl From<password_hash::Error> for AppError {
  fn from(err: password_hash::Error) -> Self {
    AppError::PasswordHash(err)
  }
}

/// A body cut short by the request size limit is reported as such, not as bad form data.
impl From<MultipartError> for AppError {
  fn from(err: MultipartError) -> Self {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
      tracing::warn!(error = %err, "Multipart body over the size limit");
      return AppError::PayloadTooLarge;
    }
    tracing::warn!(error = %err, "Malformed multipart body");
    AppError::Validation(ValidationError::MalformedForm)
  }
}

// marketplace/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  /// The write was understood but conflicts with current row state
  /// (e.g. donating more than a campaign still needs).
  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Remote Store Transport Error: {0}")]
  Http(#[from] reqwest::Error),

  /// The hosted store answered, but rejected the request.
  #[error("Remote Store Rejected Request ({status}): {message}")]
  Remote { status: u16, message: String },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  /// Short text suitable for the notification banner.
  pub fn user_message(&self) -> String {
    match self {
      AppError::Validation(m) | AppError::NotFound(m) | AppError::Conflict(m) | AppError::Auth(m) => m.clone(),
      AppError::Remote { status, .. } => format!("The store rejected the request (HTTP {}).", status),
      AppError::Http(_) | AppError::Sqlx(_) => "Could not reach the store. Please try again.".to_string(),
      AppError::Config(_) | AppError::Internal(_) => "Something went wrong. Please try again.".to_string(),
    }
  }
}

// Decoding helpers return anyhow::Result; fold those into Internal.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    if err.is::<reqwest::Error>() {
      if let Ok(req_err) = err.downcast::<reqwest::Error>() {
        return AppError::Http(req_err);
      }
      return AppError::Internal("unrecognised transport error".to_string());
    }
    AppError::Internal(format!("{:#}", err))
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::Auth(m) => HttpResponse::Unauthorized().json(json!({"error": m})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::Conflict(m) => HttpResponse::Conflict().json(json!({"error": m})),
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
      AppError::Http(e) => {
        HttpResponse::BadGateway().json(json!({"error": "Remote store unreachable", "detail": e.to_string()}))
      }
      AppError::Remote { status, message } => {
        HttpResponse::BadGateway().json(json!({"error": "Remote store rejected the request", "status": status, "detail": message}))
      }
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{auth::services::CredentialError, users::services::RelationshipError};

/// Error returned by every handler; rendered as `{"message": ...}`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    // Duplicates are reported as 400, not 409.
    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(e) = &self {
            error!(error = ?e, "internal error");
        }
        let status = self.status();
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<CredentialError> for AppError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::InvalidInput(msg) => AppError::InvalidInput(msg),
            CredentialError::DuplicateEmail => AppError::Conflict(e.to_string()),
            CredentialError::InvalidCredentials => AppError::Unauthenticated(e.to_string()),
            CredentialError::UserNotFound => AppError::NotFound(e.to_string()),
            CredentialError::Store(inner) => AppError::Internal(inner),
        }
    }
}

impl From<RelationshipError> for AppError {
    fn from(e: RelationshipError) -> Self {
        match e {
            RelationshipError::InvalidInput(msg) => AppError::InvalidInput(msg),
            RelationshipError::SelfRequest
            | RelationshipError::AlreadyFriends
            | RelationshipError::RequestExists => AppError::Conflict(e.to_string()),
            RelationshipError::RecipientNotFound | RelationshipError::NotFound => {
                AppError::NotFound(e.to_string())
            }
            RelationshipError::Forbidden => AppError::Forbidden(e.to_string()),
            RelationshipError::Store(inner) => AppError::Internal(inner),
        }
    }
}

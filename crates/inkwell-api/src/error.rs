use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use inkwell_crypto::TokenError;
use inkwell_db::StoreError;
use inkwell_types::ValidationError;
use inkwell_types::api::ErrorResponse;

/// Every failure a handler can report. The `Display` text is what the client
/// sees in the `error` field of the JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{}", constraint_message(.field))]
    Constraint { field: String },
    #[error("Password is incorrect")]
    IncorrectPassword,
    /// Missing, invalid or expired token.
    #[error("Unauthorized")]
    Unauthenticated,
    /// Valid token, but not the owner of the resource.
    #[error("Unauthorized")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Request body missing, not JSON, or the wrong shape.
    #[error("{0}")]
    InvalidBody(String),
    /// Path segment that does not parse as an id.
    #[error("{0}")]
    InvalidPath(String),
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

fn constraint_message(field: &str) -> &'static str {
    match field {
        "username" => "Username is already taken",
        "email" => "Email is already taken",
        "title" => "Title is already taken",
        "author_id" => "Author does not exist",
        "posts" => "User still has posts",
        _ => "Incorrect details",
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::Constraint { .. }
            | ApiError::IncorrectPassword
            | ApiError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated | ApiError::Forbidden => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConstraintViolation { field } => ApiError::Constraint { field },
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidPath(rejection.body_text())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(_) => ApiError::Internal(err.into()),
            TokenError::Invalid | TokenError::Expired | TokenError::Malformed => {
                ApiError::Unauthenticated
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            error!("Internal error: {:#}", e);
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

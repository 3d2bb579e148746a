use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::auth::store::StoreError;

pub const LOGIN_PATH: &str = "/login";
pub const ONBOARDING_PATH: &str = "/onboarding";

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No session, or a malformed, unknown or expired one.
    #[error("authentication required")]
    Unauthenticated,

    #[error("email address not verified")]
    EmailNotVerified,

    #[error("verification link expired or already used")]
    InvalidVerificationToken,

    #[error("email already verified")]
    AlreadyVerified,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0} already taken")]
    AlreadyTaken(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("storage failure: {0}")]
    Persistence(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(field) => AuthError::AlreadyTaken(field),
            StoreError::Unavailable(msg) => AuthError::Persistence(msg),
        }
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Unauthenticated | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::EmailNotVerified => StatusCode::FORBIDDEN,
            AuthError::InvalidVerificationToken | AuthError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AuthError::AlreadyVerified | AuthError::AlreadyTaken(_) => StatusCode::CONFLICT,
            AuthError::Persistence(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Where the client should send the user next, if anywhere.
    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            AuthError::Unauthenticated => Some(LOGIN_PATH),
            AuthError::EmailNotVerified => Some(ONBOARDING_PATH),
            _ => None,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "Something went wrong".to_string()
        } else {
            self.to_string()
        };
        let body = match self.redirect() {
            Some(to) => json!({ "error": message, "redirect": to }),
            None => json!({ "error": message }),
        };
        (status, Json(body)).into_response()
    }
}

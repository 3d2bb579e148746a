use std::convert::Infallible;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::{cookies, error::AuthError, middleware::SlidingRefresh, repo_types::User};
use crate::state::AppState;

/// Session token from the request cookie, if any. Never rejects.
pub struct SessionToken(pub Option<String>);

#[async_trait]
impl FromRequestParts<AppState> for SessionToken {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(SessionToken(cookies::session_token(
            &parts.headers,
            &state.cookies.name,
        )))
    }
}

/// A caller with a valid session, verified or not.
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = cookies::session_token(&parts.headers, &state.cookies.name)
            .ok_or(AuthError::Unauthenticated)?;
        let user = state.auth.validate_session(&token).await?;
        if let Some(refresh) = parts.extensions.get::<SlidingRefresh>() {
            refresh.mark(&token);
        }
        Ok(CurrentUser { user, token })
    }
}

/// A caller with a valid session and a verified email.
pub struct VerifiedUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for VerifiedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser { user, .. } = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_verified() {
            return Err(AuthError::EmailNotVerified);
        }
        Ok(VerifiedUser(user))
    }
}

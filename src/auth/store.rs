use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, Session, User};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique key (username, email or session token) is already taken.
    #[error("{0} already taken")]
    Conflict(&'static str),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                let field = match db.constraint() {
                    Some("users_username_key") => "username",
                    Some("users_email_key") => "email",
                    Some("sessions_pkey") => "token",
                    _ => "key",
                };
                return StoreError::Conflict(field);
            }
        }
        StoreError::Unavailable(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage boundary for users and sessions.
///
/// Implementations must make [`AuthStore::consume_verification_token`] and
/// [`AuthStore::rotate_verification_token`] single atomic conditional updates.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User>;
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Set `email_verified_at` and clear the token, only if `token` is the
    /// stored one and the user is still unverified. Returns whether it applied.
    async fn consume_verification_token(
        &self,
        user_id: Uuid,
        token: &str,
        verified_at: OffsetDateTime,
    ) -> StoreResult<bool>;

    /// Replace the verification token of a still-unverified user.
    async fn rotate_verification_token(&self, user_id: Uuid, token: &str) -> StoreResult<bool>;

    /// Fails with [`StoreError::Conflict`] when the token already exists.
    async fn insert_session(&self, session: &Session) -> StoreResult<()>;
    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>>;
    async fn touch_session(&self, token: &str, at: OffsetDateTime) -> StoreResult<()>;
    async fn delete_session(&self, token: &str) -> StoreResult<()>;
    async fn delete_user_sessions(&self, user_id: Uuid) -> StoreResult<u64>;
    /// Delete sessions last refreshed before `cutoff`.
    async fn delete_sessions_before(&self, cutoff: OffsetDateTime) -> StoreResult<u64>;
}

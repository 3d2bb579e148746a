use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub email_verified_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>, // cleared once the email is verified
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

/// Values needed to insert a user; id and timestamps come from storage.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub verification_token: String,
}

/// Session record keyed by its opaque token.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
    /// Equal to `created_at` unless sliding expiry moved it forward.
    pub refreshed_at: OffsetDateTime,
}

impl Session {
    /// Saturates at the largest representable instant instead of overflowing.
    pub fn expires_at(&self, ttl: time::Duration) -> OffsetDateTime {
        self.refreshed_at
            .checked_add(ttl)
            .unwrap_or_else(|| time::PrimitiveDateTime::MAX.assume_utc())
    }
}

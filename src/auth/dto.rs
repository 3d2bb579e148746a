use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{authority::AuthStatus, repo_types::User};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request body for login; `login` is an email or a username.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

/// Request body for the link sent by email.
#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub user_id: Uuid,
    pub token: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            verified: u.is_verified(),
            id: u.id,
            username: u.username,
            email: u.email,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: PublicUser,
    pub verification_sent: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: PublicUser,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Anonymous,
    PendingVerification,
    Verified,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: StatusKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
}

impl From<AuthStatus> for StatusResponse {
    fn from(s: AuthStatus) -> Self {
        match s {
            AuthStatus::Anonymous => Self {
                status: StatusKind::Anonymous,
                user: None,
            },
            AuthStatus::PendingVerification(u) => Self {
                status: StatusKind::PendingVerification,
                user: Some(u.into()),
            },
            AuthStatus::Verified(u) => Self {
                status: StatusKind::Verified,
                user: Some(u.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_status_has_no_user() {
        let json = serde_json::to_value(StatusResponse::from(AuthStatus::Anonymous)).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "anonymous" }));
    }

    #[test]
    fn public_user_hides_secrets() {
        let user = User {
            id: Uuid::new_v4(),
            username: "mia".into(),
            email: "mia@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            email_verified_at: None,
            verification_token: Some("one-time".into()),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&StatusResponse::from(AuthStatus::for_user(user))).unwrap();
        assert!(json.contains("\"pending_verification\""));
        assert!(json.contains("mia@example.com"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("one-time"));
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{
    repo_types::{NewUser, Session, User},
    store::{AuthStore, StoreError, StoreResult},
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: HashMap<String, Session>,
}

/// In-process store for local development and tests.
///
/// Every operation takes the lock once, so conditional updates are atomic.
#[derive(Default)]
pub struct MemoryAuthStore {
    tables: RwLock<Tables>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthStore for MemoryAuthStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.username == new_user.username) {
            return Err(StoreError::Conflict("username"));
        }
        if t.users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::Conflict("email"));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            email_verified_at: None,
            verification_token: Some(new_user.verification_token),
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.username == username).cloned())
    }

    async fn consume_verification_token(
        &self,
        user_id: Uuid,
        token: &str,
        verified_at: OffsetDateTime,
    ) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t.users.get_mut(&user_id) {
            Some(user)
                if user.email_verified_at.is_none()
                    && user.verification_token.as_deref() == Some(token) =>
            {
                user.email_verified_at = Some(verified_at);
                user.verification_token = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn rotate_verification_token(&self, user_id: Uuid, token: &str) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t.users.get_mut(&user_id) {
            Some(user) if user.email_verified_at.is_none() => {
                user.verification_token = Some(token.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_session(&self, session: &Session) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if !t.users.contains_key(&session.user_id) {
            return Err(StoreError::Unavailable(format!(
                "user {} does not exist",
                session.user_id
            )));
        }
        if t.sessions.contains_key(&session.token) {
            return Err(StoreError::Conflict("token"));
        }
        t.sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(token).cloned())
    }

    async fn touch_session(&self, token: &str, at: OffsetDateTime) -> StoreResult<()> {
        if let Some(s) = self.tables.write().await.sessions.get_mut(token) {
            s.refreshed_at = at;
        }
        Ok(())
    }

    async fn delete_session(&self, token: &str) -> StoreResult<()> {
        self.tables.write().await.sessions.remove(token);
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut t = self.tables.write().await;
        let before = t.sessions.len();
        t.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - t.sessions.len()) as u64)
    }

    async fn delete_sessions_before(&self, cutoff: OffsetDateTime) -> StoreResult<u64> {
        let mut t = self.tables.write().await;
        let before = t.sessions.len();
        t.sessions.retain(|_, s| s.refreshed_at >= cutoff);
        Ok((before - t.sessions.len()) as u64)
    }
}

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::{
    repo_types::{NewUser, Session, User},
    store::{AuthStore, StoreResult},
};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, email_verified_at, verification_token, created_at";

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgAuthStore {
    db: PgPool,
}

impl PgAuthStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_user_where(&self, column: &str, value: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

#[async_trait]
impl AuthStore for PgAuthStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, verification_token)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.verification_token)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.find_user_where("email", email).await
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.find_user_where("username", username).await
    }

    async fn consume_verification_token(
        &self,
        user_id: Uuid,
        token: &str,
        verified_at: OffsetDateTime,
    ) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET email_verified_at = $3,
                   verification_token = NULL
             WHERE id = $1
               AND verification_token = $2
               AND email_verified_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(verified_at)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn rotate_verification_token(&self, user_id: Uuid, token: &str) -> StoreResult<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET verification_token = $2
             WHERE id = $1
               AND email_verified_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(token)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() == 1)
    }

    async fn insert_session(&self, session: &Session) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, created_at, refreshed_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.refreshed_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn find_session(&self, token: &str) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT token, user_id, created_at, refreshed_at
              FROM sessions
             WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(session)
    }

    async fn touch_session(&self, token: &str, at: OffsetDateTime) -> StoreResult<()> {
        sqlx::query("UPDATE sessions SET refreshed_at = $2 WHERE token = $1")
            .bind(token)
            .bind(at)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn delete_session(&self, token: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: Uuid) -> StoreResult<u64> {
        let res = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }

    async fn delete_sessions_before(&self, cutoff: OffsetDateTime) -> StoreResult<u64> {
        let res = sqlx::query("DELETE FROM sessions WHERE refreshed_at < $1")
            .bind(cutoff)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected())
    }
}

/// Runs against a real database when `TEST_DATABASE_URL` is set, skipped otherwise.
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sqlx::postgres::PgPoolOptions;

    use super::*;
    use crate::auth::store::StoreError;

    async fn store() -> Option<PgAuthStore> {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set; skipping postgres store test");
            return None;
        };
        let db = PgPoolOptions::new()
            .max_connections(8)
            .connect(&url)
            .await
            .expect("connect to test database");
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .expect("migrate test database");
        Some(PgAuthStore::new(db))
    }

    fn new_user(tag: &str) -> NewUser {
        let suffix = Uuid::new_v4().simple().to_string();
        NewUser {
            username: format!("{tag}_{}", &suffix[..12]),
            email: format!("{tag}_{suffix}@example.com"),
            password_hash: "$argon2id$placeholder".into(),
            verification_token: format!("verify-{suffix}"),
        }
    }

    fn session_for(user_id: Uuid) -> Session {
        let now = OffsetDateTime::now_utc();
        Session {
            token: Uuid::new_v4().simple().to_string(),
            user_id,
            created_at: now,
            refreshed_at: now,
        }
    }

    #[tokio::test]
    async fn duplicate_users_map_to_named_conflicts() {
        let Some(store) = store().await else { return };
        let first = new_user("dup");
        store.create_user(first.clone()).await.unwrap();

        let mut same_email = new_user("dup");
        same_email.email = first.email.clone();
        let err = store.create_user(same_email).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict("email")));

        let mut same_name = new_user("dup");
        same_name.username = first.username.clone();
        let err = store.create_user(same_name).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict("username")));
    }

    #[tokio::test]
    async fn duplicate_session_token_is_a_conflict() {
        let Some(store) = store().await else { return };
        let user = store.create_user(new_user("tok")).await.unwrap();
        let session = session_for(user.id);
        store.insert_session(&session).await.unwrap();

        let err = store.insert_session(&session).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict("token")));
    }

    #[tokio::test]
    async fn concurrent_consumption_applies_exactly_once() {
        let Some(store) = store().await else { return };
        let input = new_user("race");
        let token = input.verification_token.clone();
        let user = store.create_user(input).await.unwrap();

        let user_id = user.id;
        let store = Arc::new(store);
        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let token = token.clone();
                tokio::spawn(async move {
                    store
                        .consume_verification_token(user_id, &token, OffsetDateTime::now_utc())
                        .await
                        .unwrap()
                })
            })
            .collect();
        let mut wins = 0;
        for attempt in attempts {
            if attempt.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);

        let stored = store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.is_verified());
        assert!(stored.verification_token.is_none());
        assert!(!store.rotate_verification_token(user.id, "fresh").await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_user_cascades_to_sessions() {
        let Some(store) = store().await else { return };
        let user = store.create_user(new_user("gone")).await.unwrap();
        let session = session_for(user.id);
        store.insert_session(&session).await.unwrap();
        assert!(store.find_session(&session.token).await.unwrap().is_some());

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user.id)
            .execute(&store.db)
            .await
            .unwrap();
        assert!(store.find_session(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn purge_and_revoke_all_count_rows() {
        let Some(store) = store().await else { return };
        let user = store.create_user(new_user("purge")).await.unwrap();
        let mut stale = session_for(user.id);
        stale.refreshed_at -= time::Duration::days(400);
        let fresh = session_for(user.id);
        store.insert_session(&stale).await.unwrap();
        store.insert_session(&fresh).await.unwrap();

        let cutoff = OffsetDateTime::now_utc() - time::Duration::days(365);
        assert!(store.delete_sessions_before(cutoff).await.unwrap() >= 1);
        assert!(store.find_session(&stale.token).await.unwrap().is_none());
        assert!(store.find_session(&fresh.token).await.unwrap().is_some());

        assert_eq!(store.delete_user_sessions(user.id).await.unwrap(), 1);
        assert!(store.find_session(&fresh.token).await.unwrap().is_none());
    }
}

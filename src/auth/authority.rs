use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::auth::{
    clock::{Clock, SystemClock},
    error::{AuthError, AuthResult},
    repo_types::{Session, User},
    store::{AuthStore, StoreError},
    tokens::{self, OsTokenSource, TokenSource},
};

/// Fresh tokens drawn before giving up on storage-reported collisions.
const ISSUE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub ttl: Duration,
    /// Push the expiry forward on every successful validation.
    pub sliding: bool,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::days(90),
            sliding: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// What the caller's session says about them.
#[derive(Debug, Clone)]
pub enum AuthStatus {
    Anonymous,
    PendingVerification(User),
    Verified(User),
}

impl AuthStatus {
    pub fn for_user(user: User) -> Self {
        if user.is_verified() {
            AuthStatus::Verified(user)
        } else {
            AuthStatus::PendingVerification(user)
        }
    }
}

/// Issues, validates and revokes opaque session tokens.
///
/// Holds no per-request state; every validation goes to the store so a
/// revocation is visible to the very next request.
#[derive(Clone)]
pub struct SessionAuthority {
    store: Arc<dyn AuthStore>,
    tokens: Arc<dyn TokenSource>,
    clock: Arc<dyn Clock>,
    policy: SessionPolicy,
}

impl SessionAuthority {
    pub fn new(store: Arc<dyn AuthStore>, policy: SessionPolicy) -> Self {
        Self::with_parts(store, Arc::new(OsTokenSource), Arc::new(SystemClock), policy)
    }

    pub fn with_parts(
        store: Arc<dyn AuthStore>,
        tokens: Arc<dyn TokenSource>,
        clock: Arc<dyn Clock>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            store,
            tokens,
            clock,
            policy,
        }
    }

    pub fn store(&self) -> &Arc<dyn AuthStore> {
        &self.store
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// One-time token for email verification links.
    pub fn new_verification_token(&self) -> String {
        tokens::generate(self.tokens.as_ref())
    }

    #[instrument(skip(self))]
    pub async fn issue_session(&self, user_id: Uuid) -> AuthResult<IssuedSession> {
        let now = self.clock.now();
        for attempt in 1..=ISSUE_ATTEMPTS {
            let session = Session {
                token: tokens::generate(self.tokens.as_ref()),
                user_id,
                created_at: now,
                refreshed_at: now,
            };
            match self.store.insert_session(&session).await {
                Ok(()) => {
                    info!(%user_id, "session issued");
                    return Ok(IssuedSession {
                        expires_at: session.expires_at(self.policy.ttl),
                        token: session.token,
                    });
                }
                Err(StoreError::Conflict(_)) => {
                    warn!(%user_id, attempt, "session token collision");
                }
                Err(StoreError::Unavailable(e)) => return Err(AuthError::Persistence(e)),
            }
        }
        Err(AuthError::Persistence(
            "could not allocate a unique session token".into(),
        ))
    }

    #[instrument(skip_all)]
    pub async fn validate_session(&self, token: &str) -> AuthResult<User> {
        if !tokens::is_well_formed(token) {
            debug!("malformed session token");
            return Err(AuthError::Unauthenticated);
        }
        let Some(session) = self.store.find_session(token).await? else {
            debug!("unknown session token");
            return Err(AuthError::Unauthenticated);
        };
        let now = self.clock.now();
        if now >= session.expires_at(self.policy.ttl) {
            debug!(user_id = %session.user_id, "session expired");
            return Err(AuthError::Unauthenticated);
        }
        let Some(user) = self.store.find_user_by_id(session.user_id).await? else {
            warn!(user_id = %session.user_id, "session without user");
            return Err(AuthError::Unauthenticated);
        };
        if self.policy.sliding {
            self.store.touch_session(token, now).await?;
        }
        Ok(user)
    }

    /// Status for an optional token; only storage failures are errors.
    pub async fn status(&self, token: Option<&str>) -> AuthResult<AuthStatus> {
        let Some(token) = token else {
            return Ok(AuthStatus::Anonymous);
        };
        match self.validate_session(token).await {
            Ok(user) => Ok(AuthStatus::for_user(user)),
            Err(AuthError::Unauthenticated) => Ok(AuthStatus::Anonymous),
            Err(e) => Err(e),
        }
    }

    /// Idempotent: absent or malformed tokens are not an error.
    #[instrument(skip_all)]
    pub async fn revoke_session(&self, token: &str) -> AuthResult<()> {
        if !tokens::is_well_formed(token) {
            return Ok(());
        }
        self.store.delete_session(token).await?;
        debug!("session revoked");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn revoke_all_sessions(&self, user_id: Uuid) -> AuthResult<u64> {
        let n = self.store.delete_user_sessions(user_id).await?;
        info!(%user_id, revoked = n, "all sessions revoked");
        Ok(n)
    }

    #[instrument(skip(self, submitted))]
    pub async fn verify_email(&self, user_id: Uuid, submitted: &str) -> AuthResult<()> {
        if submitted.is_empty() {
            return Err(AuthError::InvalidVerificationToken);
        }
        let applied = self
            .store
            .consume_verification_token(user_id, submitted, self.clock.now())
            .await?;
        if !applied {
            warn!(%user_id, "verification token rejected");
            return Err(AuthError::InvalidVerificationToken);
        }
        info!(%user_id, "email verified");
        Ok(())
    }

    /// Delete sessions whose validity window has passed.
    pub async fn purge_expired(&self) -> AuthResult<u64> {
        let Some(cutoff) = self.clock.now().checked_sub(self.policy.ttl) else {
            return Ok(0);
        };
        let n = self.store.delete_sessions_before(cutoff).await?;
        if n > 0 {
            info!(purged = n, "expired sessions purged");
        }
        Ok(n)
    }
}

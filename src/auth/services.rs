use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        authority::IssuedSession,
        dto::{LoginRequest, RegisterRequest},
        error::{AuthError, AuthResult},
        password::{hash_password, verify_password, DUMMY_PASSWORD_HASH, MIN_PASSWORD_LEN},
        repo_types::{NewUser, User},
    },
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[a-z0-9_]{3,32}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

/// Creates a pending user and sends the verification link.
/// Returns the user and whether the link went out.
pub async fn register(st: &AppState, mut req: RegisterRequest) -> AuthResult<(User, bool)> {
    req.email = req.email.trim().to_lowercase();
    req.username = req.username.trim().to_lowercase();

    if !is_valid_email(&req.email) {
        warn!(email = %req.email, "invalid email");
        return Err(AuthError::Validation("Invalid email".into()));
    }
    if !is_valid_username(&req.username) {
        warn!(username = %req.username, "invalid username");
        return Err(AuthError::Validation(
            "Username must be 3-32 characters of a-z, 0-9 or _".into(),
        ));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AuthError::Validation("Password too short".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let verification_token = st.auth.new_verification_token();
    let user = st
        .auth
        .store()
        .create_user(NewUser {
            username: req.username,
            email: req.email,
            password_hash,
            verification_token: verification_token.clone(),
        })
        .await?;
    info!(user_id = %user.id, username = %user.username, "user registered");

    let sent = send_verification(st, &user, &verification_token).await;
    Ok((user, sent))
}

/// Checks credentials and opens a new session.
pub async fn login(st: &AppState, req: LoginRequest) -> AuthResult<(User, IssuedSession)> {
    let login = req.login.trim().to_lowercase();
    let store = st.auth.store();
    let found = if login.contains('@') {
        store.find_user_by_email(&login).await?
    } else {
        store.find_user_by_username(&login).await?
    };
    if !password_matches(found.as_ref(), &req.password)? {
        match &found {
            Some(user) => warn!(user_id = %user.id, "login invalid password"),
            None => warn!(login = %login, "login unknown user"),
        }
        return Err(AuthError::InvalidCredentials);
    }
    let Some(user) = found else {
        return Err(AuthError::InvalidCredentials);
    };

    let session = st.auth.issue_session(user.id).await?;
    info!(user_id = %user.id, "user logged in");
    Ok((user, session))
}

/// Runs argon2 whether or not the account exists.
fn password_matches(user: Option<&User>, plain: &str) -> AuthResult<bool> {
    match user {
        Some(user) => verify_password(plain, &user.password_hash),
        None => verify_password(plain, DUMMY_PASSWORD_HASH).map(|_| false),
    }
}

/// Rotates the verification token of a pending user and sends it again.
pub async fn resend_verification(st: &AppState, user_id: Uuid) -> AuthResult<bool> {
    let token = st.auth.new_verification_token();
    let rotated = st
        .auth
        .store()
        .rotate_verification_token(user_id, &token)
        .await?;
    let found = st.auth.store().find_user_by_id(user_id).await?;
    let Some(user) = found else {
        warn!(user_id = %user_id, "resend for missing user");
        return Err(AuthError::Unauthenticated);
    };
    if !rotated {
        return Err(AuthError::AlreadyVerified);
    }
    Ok(send_verification(st, &user, &token).await)
}

async fn send_verification(st: &AppState, user: &User, token: &str) -> bool {
    match st.mailer.send(user, token).await {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, user_id = %user.id, "sending verification failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
    }

    #[test]
    fn username_validation() {
        assert!(is_valid_username("swipe_king99"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("Has-Dash"));
        assert!(!is_valid_username(&"x".repeat(33)));
    }

    fn login_req(login: &str, password: &str) -> LoginRequest {
        LoginRequest {
            login: login.into(),
            password: password.into(),
        }
    }

    async fn registered(st: &AppState, name: &str) -> User {
        let (user, _) = register(
            st,
            RegisterRequest {
                username: name.into(),
                email: format!("{name}@example.com"),
                password: "hunter2hunter2".into(),
            },
        )
        .await
        .unwrap();
        user
    }

    #[test]
    fn unknown_accounts_still_run_the_password_check() {
        assert!(!password_matches(None, "hunter2hunter2").unwrap());
        assert!(!password_matches(None, "").unwrap());
    }

    #[tokio::test]
    async fn unknown_and_wrong_password_logins_look_alike() {
        let st = AppState::fake();
        registered(&st, "rhea").await;

        let unknown = login(&st, login_req("nobody@example.com", "hunter2hunter2"))
            .await
            .unwrap_err();
        let wrong = login(&st, login_req("rhea", "not-the-password"))
            .await
            .unwrap_err();
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());

        let (user, _) = login(&st, login_req("RHEA@example.com", "hunter2hunter2"))
            .await
            .unwrap();
        assert_eq!(user.username, "rhea");
    }

    #[tokio::test]
    async fn resend_for_missing_user_is_unauthenticated() {
        let st = AppState::fake();
        let err = resend_verification(&st, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn resend_for_verified_user_conflicts() {
        let st = AppState::fake();
        let user = registered(&st, "sven").await;
        assert!(resend_verification(&st, user.id).await.unwrap());

        let token = st.auth.new_verification_token();
        st.auth.store().rotate_verification_token(user.id, &token).await.unwrap();
        st.auth.verify_email(user.id, &token).await.unwrap();

        let err = resend_verification(&st, user.id).await.unwrap_err();
        assert!(matches!(err, AuthError::AlreadyVerified));
    }
}

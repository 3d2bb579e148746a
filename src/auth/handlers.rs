use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        authority::AuthStatus,
        cookies::{build_clear_cookie, build_session_cookie},
        dto::{
            LoginRequest, LoginResponse, PublicUser, RegisterRequest, RegisterResponse,
            StatusResponse, VerifyEmailRequest,
        },
        error::AuthResult,
        extractors::{CurrentUser, SessionToken, VerifiedUser},
        middleware::SlidingRefresh,
        services,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/logout-all", post(logout_all))
        .route("/auth/verify", post(verify_email))
        .route("/auth/verify/resend", post(resend_verification))
        .route("/auth/status", get(status))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AuthResult<(StatusCode, Json<RegisterResponse>)> {
    let (user, verification_sent) = services::register(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: user.into(),
            verification_sent,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AuthResult<impl IntoResponse> {
    let (user, session) = services::login(&state, payload).await?;
    let max_age = state.auth.policy().ttl.whole_seconds();
    let cookie = build_session_cookie(&session.token, max_age, &state.cookies);
    Ok((
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            user: user.into(),
            expires_at: session.expires_at,
        }),
    ))
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> AuthResult<impl IntoResponse> {
    if let Some(token) = token {
        state.auth.revoke_session(&token).await?;
    }
    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, build_clear_cookie(&state.cookies))],
    ))
}

#[instrument(skip_all)]
pub async fn logout_all(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AuthResult<impl IntoResponse> {
    state.auth.revoke_all_sessions(current.user.id).await?;
    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, build_clear_cookie(&state.cookies))],
    ))
}

#[instrument(skip_all)]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> AuthResult<StatusCode> {
    state
        .auth
        .verify_email(payload.user_id, &payload.token)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all)]
pub async fn resend_verification(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AuthResult<Json<serde_json::Value>> {
    let sent = services::resend_verification(&state, current.user.id).await?;
    info!(user_id = %current.user.id, sent, "verification resent");
    Ok(Json(serde_json::json!({ "verification_sent": sent })))
}

#[instrument(skip_all)]
pub async fn status(
    State(state): State<AppState>,
    refresh: Option<Extension<SlidingRefresh>>,
    SessionToken(token): SessionToken,
) -> AuthResult<Json<StatusResponse>> {
    let status = state.auth.status(token.as_deref()).await?;
    if let (Some(Extension(refresh)), Some(token)) = (refresh, token.as_deref()) {
        if !matches!(status, AuthStatus::Anonymous) {
            refresh.mark(token);
        }
    }
    Ok(Json(status.into()))
}

#[instrument(skip_all)]
pub async fn get_me(VerifiedUser(user): VerifiedUser) -> Json<PublicUser> {
    Json(user.into())
}

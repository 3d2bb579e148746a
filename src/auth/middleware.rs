use std::sync::{Arc, OnceLock};

use axum::{
    extract::{Request, State},
    http::{header::SET_COOKIE, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::cookies::build_session_cookie;
use crate::state::AppState;

/// Set by handlers once a sliding session was validated for this request.
#[derive(Clone, Default)]
pub struct SlidingRefresh(Arc<OnceLock<String>>);

impl SlidingRefresh {
    pub fn mark(&self, token: &str) {
        let _ = self.0.set(token.to_owned());
    }

    fn token(&self) -> Option<&str> {
        self.0.get().map(String::as_str)
    }
}

/// Re-issues the session cookie with a fresh `Max-Age` after a sliding
/// session was used.
pub async fn refresh_session_cookie(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if !state.auth.policy().sliding {
        return next.run(req).await;
    }

    let refresh = SlidingRefresh::default();
    req.extensions_mut().insert(refresh.clone());
    let mut res = next.run(req).await;

    // handlers that already set the cookie (login, logout) win
    if res.headers().contains_key(SET_COOKIE) {
        return res;
    }
    let Some(token) = refresh.token() else {
        return res;
    };
    let max_age = state.auth.policy().ttl.whole_seconds();
    match HeaderValue::from_str(&build_session_cookie(token, max_age, &state.cookies)) {
        Ok(cookie) => {
            debug!("session cookie refreshed");
            res.headers_mut().append(SET_COOKIE, cookie);
        }
        Err(e) => warn!(error = %e, "refreshed session cookie is not a valid header"),
    }
    res
}

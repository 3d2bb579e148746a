use crate::state::AppState;
use axum::Router;

pub mod authority;
pub mod clock;
pub mod cookies;
mod dto;
pub mod error;
pub(crate) mod extractors;
pub mod handlers;
pub mod mailer;
pub mod memory;
pub mod middleware;
mod password;
pub mod repo;
pub mod repo_types;
mod services;
pub mod store;
pub mod tokens;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}

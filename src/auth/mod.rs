use axum::Router;

use crate::state::AppState;

mod claims;
pub(crate) mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub(crate) mod jwt;
mod otp;
pub(crate) mod password;
mod repo;
pub(crate) mod repo_types;

pub use extractors::{AuthUser, SESSION_COOKIE};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::public_routes())
        .merge(handlers::protected_routes())
}

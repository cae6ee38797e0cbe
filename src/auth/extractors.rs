use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo_types::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "auth_token";

/// Extracts the session cookie, validates the token and resolves the current
/// user record. The password hash never leaves serialization thanks to the
/// `skip_serializing` markers on [`User`].
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or(ApiError::Unauthenticated("Unauthorized! Token not found"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_session(&token).map_err(|_| {
            warn!("invalid or expired session token");
            ApiError::Unauthenticated("Unauthorized! Invalid token")
        })?;

        let user = User::find_by_id(&state.db, claims.sub).await?;
        match user {
            Some(user) if user.is_active => Ok(AuthUser(user)),
            _ => Err(ApiError::Unauthenticated("Unauthorized! User not found")),
        }
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::Role;

/// What a token is allowed to do. A password-reset token is only accepted by
/// the reset-password step, never as a session credential.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Session,
    PasswordReset,
}

/// JWT payload. Session tokens carry the email and role; reset tokens only
/// carry the subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub purpose: TokenPurpose,
}

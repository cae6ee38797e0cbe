use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};

/// Request body for user registration. Fields default to empty so missing
/// input surfaces as a field-level validation error instead of a decode
/// failure.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    pub skill: Option<String>,
    pub age: Option<i32>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for OTP verification.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub code: String,
}

/// Request body for resending the verification OTP.
#[derive(Debug, Deserialize)]
pub struct ResendOtpRequest {
    #[serde(default)]
    pub email: String,
}

/// Request body for password login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for requesting a password reset code.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

/// Request body for exchanging a reset code for a reset token.
#[derive(Debug, Deserialize)]
pub struct VerifyResetCodeRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub reset_code: String,
}

/// Request body for resetting the password with a purpose-scoped token.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub reset_token: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Request body for changing the password while authenticated.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_verified: bool,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            is_verified: user.is_verified,
        }
    }
}

/// Response returned after registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user_id: Uuid,
}

/// Response returned after a successful verification or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: PublicUser,
}

/// Response carrying the purpose-scoped reset token.
#[derive(Debug, Serialize)]
pub struct ResetTokenResponse {
    pub success: bool,
    pub message: String,
    pub reset_token: String,
}

/// Response for the authenticated identity endpoint.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
}

/// Plain envelope for operations without a payload.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_serialization_never_leaks_the_hash() {
        let now = time::OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: "Alice".into(),
            age: 22,
            skill: "Go".into(),
            email: "a@x.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::User,
            is_verified: true,
            verification_code: None,
            verification_code_expires: None,
            reset_password_code: None,
            reset_password_expires: None,
            last_password_change: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&PublicUser::from(&user)).unwrap();
        assert!(json.contains("a@x.com"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn missing_request_fields_default_to_empty() {
        let payload: LoginRequest = serde_json::from_str("{}").unwrap();
        assert!(payload.email.is_empty());
        assert!(payload.password.is_empty());
    }
}

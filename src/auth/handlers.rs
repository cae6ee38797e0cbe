use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::auth::{
    dto::{
        AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, MeResponse,
        MessageResponse, PublicUser, RegisterRequest, RegisterResponse, ResendOtpRequest,
        ResetPasswordRequest, ResetTokenResponse, VerifyRequest, VerifyResetCodeRequest,
    },
    extractors::{AuthUser, SESSION_COOKIE},
    jwt::JwtKeys,
    otp::{generate_otp, RESET_CODE_TTL, VERIFICATION_CODE_TTL},
    password::{hash_password, verify_password},
    repo_types::User,
};
use crate::error::ApiError;
use crate::mailer::{password_changed_email, reset_code_email, verification_email};
use crate::state::AppState;

/// Response for `/forgot-password` is identical whether or not the email
/// exists, so the endpoint cannot be used to enumerate accounts.
const FORGOT_PASSWORD_MESSAGE: &str = "If your email exists, you will receive a reset code.";

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/registration", post(register))
        .route("/verify-user", post(verify_user))
        .route("/reset-otp", post(resend_otp))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/forgot-password", post(forgot_password))
        .route("/verify-reset-code", post(verify_reset_code))
        .route("/reset-password", post(reset_password))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/change-password", post(change_password))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.config.cookie_secure)
        .same_site(SameSite::Strict)
        .max_age(state.config.jwt.session_ttl())
        .build()
}

/// The code mismatch is reported before expiry, and a consumed (cleared)
/// code counts as a mismatch so it cannot be replayed.
fn check_verification_code(user: &User, code: &str, now: OffsetDateTime) -> Result<(), ApiError> {
    let stored = user.verification_code.as_deref().ok_or(ApiError::InvalidCode)?;
    if stored != code {
        return Err(ApiError::InvalidCode);
    }
    match user.verification_code_expires {
        Some(expires) if now > expires => Err(ApiError::CodeExpired),
        _ => Ok(()),
    }
}

fn validate_new_password(new_password: &str, confirm_password: &str) -> Result<(), ApiError> {
    if new_password != confirm_password {
        return Err(ApiError::FieldMismatch);
    }
    if new_password.len() < 6 {
        return Err(ApiError::WeakPassword);
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    let name = payload.name.trim().to_string();

    if name.is_empty() {
        return Err(ApiError::Validation("Name is required".into()));
    }
    if name.len() < 3 || name.len() > 50 {
        return Err(ApiError::Validation(
            "Name must be between 3 and 50 characters".into(),
        ));
    }
    let age = payload
        .age
        .ok_or_else(|| ApiError::Validation("Age is required".into()))?;
    if !(10..=100).contains(&age) {
        return Err(ApiError::Validation("Age must be between 10 and 100".into()));
    }
    if payload.email.is_empty() {
        return Err(ApiError::Validation("Email is required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::Validation("Password is required".into()));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::WeakPassword);
    }
    let skill = match payload.skill.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => "Other".to_string(),
    };

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::DuplicateEmail);
    }

    let hash = hash_password(&payload.password)?;
    let code = generate_otp();
    let expires = OffsetDateTime::now_utc() + VERIFICATION_CODE_TTL;

    let user = User::create(
        &state.db,
        &name,
        age,
        &skill,
        &payload.email,
        &hash,
        &code,
        expires,
    )
    .await?;

    // The send is awaited but not fatal; /reset-otp is the retry path.
    let mail = verification_email(&code, VERIFICATION_CODE_TTL.whole_minutes());
    if let Err(e) = state
        .mailer
        .send(&user.email, &mail.subject, &mail.html, &mail.text)
        .await
    {
        error!(error = %e, email = %user.email, "failed to send verification email");
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "User created. Verification code sent to email.".into(),
            user_id: user.id,
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn verify_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.code.is_empty() {
        return Err(ApiError::Validation("Email and code are required!".into()));
    }

    let mut user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or(ApiError::NotFound("User not found with this email!"))?;

    check_verification_code(&user, &payload.code, OffsetDateTime::now_utc())?;

    User::mark_verified(&state.db, user.id).await?;
    user.is_verified = true;
    user.verification_code = None;
    user.verification_code_expires = None;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_session(&user)?;
    let jar = jar.add(session_cookie(&state, token.clone()));

    info!(user_id = %user.id, "user verified and logged in");
    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            message: "Login successful!".into(),
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(payload): Json<ResendOtpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::Validation("Email is required".into()));
    }

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    let code = generate_otp();
    let expires = OffsetDateTime::now_utc() + VERIFICATION_CODE_TTL;
    User::refresh_verification_code(&state.db, user.id, &code, expires).await?;

    // This endpoint is the retry path, so a failed send is an error here.
    let mail = verification_email(&code, VERIFICATION_CODE_TTL.whole_minutes());
    state
        .mailer
        .send(&user.email, &mail.subject, &mail.html, &mail.text)
        .await?;

    info!(user_id = %user.id, "verification code reissued");
    Ok(Json(MessageResponse {
        success: true,
        message: "New verification code sent".into(),
    }))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::Validation("Email is required!".into()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::Validation("Password is required!".into()));
    }

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(user) if user.is_active => user,
        _ => {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::NotFound("User not found!"));
        }
    };

    if !user.is_verified {
        warn!(user_id = %user.id, "login before verification");
        return Err(ApiError::NotVerified);
    }

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::PasswordMismatch);
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign_session(&user)?;
    let jar = jar.add(session_cookie(&state, token.clone()));

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            message: "User login success".into(),
            token,
            user: PublicUser::from(&user),
        }),
    ))
}

/// Clears the cookie unconditionally. There is no server-side revocation; a
/// replayed token stays valid until its natural expiry.
#[instrument(skip(jar))]
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    (
        jar,
        Json(MessageResponse {
            success: true,
            message: "User logged out successfully".into(),
        }),
    )
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::Validation("Email is required!".into()));
    }

    if let Some(user) = User::find_by_email(&state.db, &email).await? {
        if user.is_active {
            let code = generate_otp();
            let expires = OffsetDateTime::now_utc() + RESET_CODE_TTL;
            User::set_reset_code(&state.db, user.id, &code, expires).await?;

            let mail = reset_code_email(&code, RESET_CODE_TTL.whole_minutes());
            if let Err(e) = state
                .mailer
                .send(&user.email, &mail.subject, &mail.html, &mail.text)
                .await
            {
                // Still answer with the generic message; a different status
                // here would leak that the account exists.
                error!(error = %e, user_id = %user.id, "failed to send reset code email");
            }
            info!(user_id = %user.id, "password reset code issued");
        }
    }

    Ok(Json(MessageResponse {
        success: true,
        message: FORGOT_PASSWORD_MESSAGE.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn verify_reset_code(
    State(state): State<AppState>,
    Json(payload): Json<VerifyResetCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.reset_code.is_empty() {
        return Err(ApiError::Validation(
            "Email and reset code are required!".into(),
        ));
    }

    let user = User::find_by_email_and_reset_code(
        &state.db,
        &email,
        &payload.reset_code,
        OffsetDateTime::now_utc(),
    )
    .await?
    .ok_or(ApiError::InvalidResetCode)?;

    let keys = JwtKeys::from_ref(&state);
    let reset_token = keys.sign_reset(user.id)?;

    info!(user_id = %user.id, "reset code verified");
    Ok(Json(ResetTokenResponse {
        success: true,
        message: "Reset code verified successfully!".into(),
        reset_token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.reset_token.is_empty()
        || payload.new_password.is_empty()
        || payload.confirm_password.is_empty()
    {
        return Err(ApiError::Validation("All fields are required!".into()));
    }
    validate_new_password(&payload.new_password, &payload.confirm_password)?;

    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_reset(&payload.reset_token)
        .map_err(|_| ApiError::InvalidResetToken)?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(ApiError::NotFound("User not found!"))?;

    if verify_password(&payload.new_password, &user.password_hash)? {
        return Err(ApiError::SamePassword);
    }

    let hash = hash_password(&payload.new_password)?;
    User::update_password(&state.db, user.id, &hash).await?;

    let mail = password_changed_email();
    if let Err(e) = state
        .mailer
        .send(&user.email, &mail.subject, &mail.html, &mail.text)
        .await
    {
        error!(error = %e, user_id = %user.id, "failed to send password change confirmation");
    }

    info!(user_id = %user.id, "password reset completed");
    Ok(Json(MessageResponse {
        success: true,
        message: "Password reset successfully! You can now login with your new password.".into(),
    }))
}

#[instrument(skip(state, user, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.current_password.is_empty()
        || payload.new_password.is_empty()
        || payload.confirm_password.is_empty()
    {
        return Err(ApiError::Validation("All fields are required!".into()));
    }
    validate_new_password(&payload.new_password, &payload.confirm_password)?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!(user_id = %user.id, "change password with wrong current password");
        return Err(ApiError::WrongPassword);
    }
    if verify_password(&payload.new_password, &user.password_hash)? {
        return Err(ApiError::SamePassword);
    }

    let hash = hash_password(&payload.new_password)?;
    User::update_password(&state.db, user.id, &hash).await?;

    let mail = password_changed_email();
    if let Err(e) = state
        .mailer
        .send(&user.email, &mail.subject, &mail.html, &mail.text)
        .await
    {
        error!(error = %e, user_id = %user.id, "failed to send password change confirmation");
    }

    info!(user_id = %user.id, "password changed");
    Ok(Json(MessageResponse {
        success: true,
        message: "Password changed successfully!".into(),
    }))
}

#[instrument(skip(user))]
pub async fn me(AuthUser(user): AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        success: true,
        message: "User authenticated".into(),
        user: PublicUser::from(&user),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::Role;
    use time::Duration;
    use uuid::Uuid;

    fn user_with_code(code: Option<&str>, expires: Option<OffsetDateTime>) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            name: "Alice".into(),
            age: 22,
            skill: "Go".into(),
            email: "a@x.com".into(),
            password_hash: "unused".into(),
            role: Role::User,
            is_verified: false,
            verification_code: code.map(str::to_string),
            verification_code_expires: expires,
            reset_password_code: None,
            reset_password_expires: None,
            last_password_change: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn matching_unexpired_code_passes() {
        let now = OffsetDateTime::now_utc();
        let user = user_with_code(Some("123456"), Some(now + Duration::minutes(3)));
        assert!(check_verification_code(&user, "123456", now).is_ok());
    }

    #[test]
    fn wrong_code_is_invalid_not_expired() {
        let now = OffsetDateTime::now_utc();
        let user = user_with_code(Some("123456"), Some(now - Duration::minutes(1)));
        // Mismatch wins over expiry.
        assert!(matches!(
            check_verification_code(&user, "654321", now),
            Err(ApiError::InvalidCode)
        ));
    }

    #[test]
    fn expired_code_is_reported_distinctly() {
        let now = OffsetDateTime::now_utc();
        let user = user_with_code(Some("123456"), Some(now - Duration::seconds(1)));
        assert!(matches!(
            check_verification_code(&user, "123456", now),
            Err(ApiError::CodeExpired)
        ));
    }

    #[test]
    fn consumed_code_cannot_be_replayed() {
        // After a successful verification both fields are cleared.
        let now = OffsetDateTime::now_utc();
        let user = user_with_code(None, None);
        assert!(matches!(
            check_verification_code(&user, "123456", now),
            Err(ApiError::InvalidCode)
        ));
    }

    #[test]
    fn new_password_must_match_confirmation() {
        assert!(matches!(
            validate_new_password("abcdef", "abcdeg"),
            Err(ApiError::FieldMismatch)
        ));
    }

    #[test]
    fn new_password_must_be_long_enough() {
        assert!(matches!(
            validate_new_password("abc", "abc"),
            Err(ApiError::WeakPassword)
        ));
        assert!(validate_new_password("abcdef", "abcdef").is_ok());
    }

    #[test]
    fn email_regex_accepts_plausible_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.io"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@mail.com"));
    }
}

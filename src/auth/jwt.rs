use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenPurpose};
use crate::auth::repo_types::{Role, User};
use crate::config::JwtConfig;
use crate::state::AppState;

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub session_ttl: Duration,
    pub reset_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            session_ttl_minutes,
            reset_ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            session_ttl: Duration::from_secs((session_ttl_minutes as u64) * 60),
            reset_ttl: Duration::from_secs((reset_ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    fn sign(
        &self,
        sub: Uuid,
        email: Option<String>,
        role: Option<Role>,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub,
            email,
            role,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            purpose,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %sub, purpose = ?purpose, "jwt signed");
        Ok(token)
    }

    pub fn sign_session(&self, user: &User) -> anyhow::Result<String> {
        self.sign(
            user.id,
            Some(user.email.clone()),
            Some(user.role),
            TokenPurpose::Session,
            self.session_ttl,
        )
    }

    pub fn sign_reset(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign(user_id, None, None, TokenPurpose::PasswordReset, self.reset_ttl)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, purpose = ?data.claims.purpose, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_session(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.purpose != TokenPurpose::Session {
            anyhow::bail!("not a session token");
        }
        Ok(claims)
    }

    pub fn verify_reset(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.purpose != TokenPurpose::PasswordReset {
            anyhow::bail!("not a password reset token");
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::Role;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    fn make_user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            name: "Alice".into(),
            age: 22,
            skill: "Go".into(),
            email: "a@x.com".into(),
            password_hash: "unused".into(),
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
        }
    }

    #[test]
    fn sign_and_verify_session_token() {
        let keys = make_keys();
        let user = make_user();
        let token = keys.sign_session(&user).expect("sign session");
        let claims = keys.verify_session(&token).expect("verify session");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email.as_deref(), Some("a@x.com"));
        assert_eq!(claims.role, Some(Role::User));
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.purpose, TokenPurpose::Session);
    }

    #[test]
    fn reset_token_carries_only_the_subject() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_reset(user_id).expect("sign reset");
        let claims = keys.verify_reset(&token).expect("verify reset");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, None);
        assert_eq!(claims.role, None);
        assert_eq!(claims.purpose, TokenPurpose::PasswordReset);
    }

    #[test]
    fn verify_session_rejects_reset_token() {
        let keys = make_keys();
        let token = keys.sign_reset(Uuid::new_v4()).expect("sign reset");
        let err = keys.verify_session(&token).unwrap_err();
        assert!(err.to_string().contains("not a session token"));
    }

    #[test]
    fn verify_reset_rejects_session_token() {
        let keys = make_keys();
        let token = keys.sign_session(&make_user()).expect("sign session");
        let err = keys.verify_reset(&token).unwrap_err();
        assert!(err.to_string().contains("not a password reset token"));
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let keys = make_keys();
        let mut other = make_keys();
        other.issuer = "other-issuer".into();
        other.audience = "other-aud".into();
        let token = keys.sign_session(&make_user()).expect("sign session");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_tampered_token() {
        let keys = make_keys();
        let token = keys.sign_session(&make_user()).expect("sign session");
        let mut tampered = token.clone();
        tampered.pop();
        assert!(keys.verify(&tampered).is_err());
    }
}

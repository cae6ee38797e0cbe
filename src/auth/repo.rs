use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, age, skill, email, password_hash, role, is_verified,
                   verification_code, verification_code_expires,
                   reset_password_code, reset_password_expires,
                   last_password_change, is_active, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by id.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, age, skill, email, password_hash, role, is_verified,
                   verification_code, verification_code_expires,
                   reset_password_code, reset_password_expires,
                   last_password_change, is_active, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create an unverified user with a pending verification code.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        db: &PgPool,
        name: &str,
        age: i32,
        skill: &str,
        email: &str,
        password_hash: &str,
        verification_code: &str,
        verification_code_expires: OffsetDateTime,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, age, skill, email, password_hash,
                               verification_code, verification_code_expires)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, age, skill, email, password_hash, role, is_verified,
                      verification_code, verification_code_expires,
                      reset_password_code, reset_password_expires,
                      last_password_change, is_active, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(age)
        .bind(skill)
        .bind(email)
        .bind(password_hash)
        .bind(verification_code)
        .bind(verification_code_expires)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Replace the pending verification code, e.g. when the client asks for a
    /// new OTP.
    pub async fn refresh_verification_code(
        db: &PgPool,
        id: Uuid,
        code: &str,
        expires: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET verification_code = $2,
                verification_code_expires = $3,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(code)
        .bind(expires)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Mark the user verified and clear the consumed OTP so it cannot be
    /// replayed.
    pub async fn mark_verified(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET is_verified = TRUE,
                verification_code = NULL,
                verification_code_expires = NULL,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Store a password reset code with its expiry.
    pub async fn set_reset_code(
        db: &PgPool,
        id: Uuid,
        code: &str,
        expires: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_password_code = $2,
                reset_password_expires = $3,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(code)
        .bind(expires)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Find a user whose reset code matches and has not expired yet, as a
    /// single conditional query.
    pub async fn find_by_email_and_reset_code(
        db: &PgPool,
        email: &str,
        code: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, age, skill, email, password_hash, role, is_verified,
                   verification_code, verification_code_expires,
                   reset_password_code, reset_password_expires,
                   last_password_change, is_active, created_at, updated_at
            FROM users
            WHERE email = $1
              AND reset_password_code = $2
              AND reset_password_expires > $3
            "#,
        )
        .bind(email)
        .bind(code)
        .bind(now)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Replace the password hash, clear any pending reset state and record
    /// the change time.
    pub async fn update_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                reset_password_code = NULL,
                reset_password_expires = NULL,
                last_password_change = now(),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }
}

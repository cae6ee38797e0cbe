use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::User;

impl User {
    /// List every user, newest first.
    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, age, skill, email, password_hash, role, is_verified,
                   verification_code, verification_code_expires,
                   reset_password_code, reset_password_expires,
                   last_password_change, is_active, created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Apply a partial profile update; absent fields keep their value.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: Option<String>,
        age: Option<i32>,
        skill: Option<String>,
        is_active: Option<bool>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                age = COALESCE($3, age),
                skill = COALESCE($4, skill),
                is_active = COALESCE($5, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, age, skill, email, password_hash, role, is_verified,
                      verification_code, verification_code_expires,
                      reset_password_code, reset_password_expires,
                      last_password_change, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(age)
        .bind(skill)
        .bind(is_active)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Hard delete; returns whether a row existed.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

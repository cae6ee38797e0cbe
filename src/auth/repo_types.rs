use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User role stored in the `user_role` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// User record in the database.
///
/// The OTP pair and the reset pair have independent lifecycles; both are
/// cleared as soon as the code is consumed so a code cannot be replayed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub skill: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verification_code: Option<String>,
    #[serde(skip_serializing)]
    pub verification_code_expires: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub reset_password_code: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_expires: Option<OffsetDateTime>,
    pub last_password_change: Option<OffsetDateTime>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

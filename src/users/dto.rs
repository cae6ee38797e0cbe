use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};

/// Full profile projection for the CRUD endpoints, hash excluded.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub skill: String,
    pub email: String,
    pub role: Role,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            age: user.age,
            skill: user.skill,
            email: user.email,
            role: user.role,
            is_verified: user.is_verified,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// Partial profile update. Absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub skill: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct UsersListResponse {
    pub success: bool,
    pub message: String,
    pub data: Vec<UserResponse>,
}

#[derive(Debug, Serialize)]
pub struct UserDetailResponse {
    pub success: bool,
    pub message: String,
    pub data: UserResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_response_serialization_excludes_the_hash() {
        let now = OffsetDateTime::now_utc();
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
        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(json.contains("Alice"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn update_request_accepts_partial_bodies() {
        let payload: UpdateUserRequest = serde_json::from_str(r#"{"age": 30}"#).unwrap();
        assert_eq!(payload.age, Some(30));
        assert!(payload.name.is_none());
        assert!(payload.skill.is_none());
        assert!(payload.is_active.is_none());
    }
}

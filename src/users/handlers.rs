use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::dto::MessageResponse;
use crate::auth::repo_types::User;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{UpdateUserRequest, UserDetailResponse, UserResponse, UsersListResponse};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route(
            "/:id",
            get(get_user)
                .put(update_user)
                .patch(update_user)
                .delete(delete_user),
        )
}

#[instrument(skip(state, _auth))]
pub async fn list_users(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let users = User::list_all(&state.db).await?;
    let data = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(UsersListResponse {
        success: true,
        message: "Get All Users".into(),
        data,
    }))
}

#[instrument(skip(state, _auth))]
pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User not found."))?;
    Ok(Json(UserDetailResponse {
        success: true,
        message: "Single user".into(),
        data: UserResponse::from(user),
    }))
}

#[instrument(skip(state, _auth, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = match payload.name.as_deref().map(str::trim) {
        Some(name) if name.len() < 3 || name.len() > 50 => {
            return Err(ApiError::Validation(
                "Name must be between 3 and 50 characters".into(),
            ));
        }
        Some(name) => Some(name.to_string()),
        None => None,
    };
    if let Some(age) = payload.age {
        if !(10..=100).contains(&age) {
            return Err(ApiError::Validation("Age must be between 10 and 100".into()));
        }
    }
    let skill = match payload.skill.as_deref().map(str::trim) {
        Some("") => return Err(ApiError::Validation("Skill cannot be empty".into())),
        Some(skill) => Some(skill.to_string()),
        None => None,
    };

    let user = User::update_profile(&state.db, id, name, payload.age, skill, payload.is_active)
        .await?
        .ok_or(ApiError::NotFound("User not found."))?;

    info!(user_id = %user.id, "user updated");
    Ok(Json(UserDetailResponse {
        success: true,
        message: "User updated successfully".into(),
        data: UserResponse::from(user),
    }))
}

#[instrument(skip(state, _auth))]
pub async fn delete_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if !User::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("User not found."));
    }
    info!(user_id = %id, "user deleted");
    Ok(Json(MessageResponse {
        success: true,
        message: "User deleted successfully".into(),
    }))
}

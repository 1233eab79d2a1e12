//! User endpoints
//!
//! Any authenticated user may read profiles; changing roles, activating or
//! deactivating and deleting accounts is reserved to admins.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    routes::MessageResponse,
};
use axum::{extract::State, Extension, Json};
use taskhub_shared::{
    auth::{authorization::require_role, middleware::AuthContext, password},
    models::user::{
        ProfileUpdateInput, RoleUpdateInput, StatusUpdateInput, UpdateUser, UserProfile,
        UserQuery, UserRole,
    },
};
use uuid::Uuid;

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

/// `GET /api/users/profile`
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserProfile>> {
    let user = state
        .store
        .users
        .find_by_id(auth.user_id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user.profile()))
}

/// `PUT /api/users/profile`
///
/// Updates names, email and password of the caller; role and active flag
/// cannot be changed here.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(input): ApiJson<ProfileUpdateInput>,
) -> ApiResult<Json<UserProfile>> {
    let (mut update, new_password) = input.into_update()?;
    if let Some(plaintext) = new_password {
        update.password_hash = Some(password::hash_password_blocking(plaintext).await?);
    }

    let user = state
        .store
        .users
        .update(auth.user_id, update)
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(user_id = %user.id, "Profile updated");
    Ok(Json(user.profile()))
}

/// `GET /api/users?role&page&limit`
pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> ApiResult<Json<Vec<UserProfile>>> {
    let (filter, page) = query.into_filter()?;
    let (users, _total) = state.store.users.list(&filter, page).await?;

    Ok(Json(users.iter().map(|u| u.profile()).collect()))
}

/// `GET /api/users/:id`
pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    let user = state
        .store
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user.profile()))
}

/// `PUT /api/users/:id/role` (admin)
///
/// Takes effect at the user's next login or refresh.
pub async fn update_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<RoleUpdateInput>,
) -> ApiResult<Json<UserProfile>> {
    require_role(&auth, &[UserRole::Admin])?;
    let role = input.into_role()?;

    let user = state
        .store
        .users
        .update(
            id,
            UpdateUser {
                role: Some(role),
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(user_not_found)?;

    tracing::info!(
        admin_id = %auth.user_id,
        user_id = %user.id,
        role = %role,
        "Role changed"
    );
    Ok(Json(user.profile()))
}

/// `PUT /api/users/:id/status` (admin)
///
/// Deactivated users cannot log in, and their refresh tokens are revoked so
/// no new access token can be issued.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<StatusUpdateInput>,
) -> ApiResult<Json<UserProfile>> {
    require_role(&auth, &[UserRole::Admin])?;
    let update = input.into_update()?;

    let user = state
        .store
        .users
        .update(id, update)
        .await?
        .ok_or_else(user_not_found)?;

    if !user.is_active {
        state.store.refresh_tokens.revoke_all_for_user(user.id).await?;
    }

    tracing::info!(
        admin_id = %auth.user_id,
        user_id = %user.id,
        is_active = user.is_active,
        "Account status changed"
    );
    Ok(Json(user.profile()))
}

/// `DELETE /api/users/:id` (admin)
///
/// Tasks and projects referencing the user are left untouched.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    require_role(&auth, &[UserRole::Admin])?;

    if !state.store.users.delete(id).await? {
        return Err(user_not_found());
    }
    state.store.refresh_tokens.revoke_all_for_user(id).await?;

    tracing::info!(admin_id = %auth.user_id, user_id = %id, "User deleted");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

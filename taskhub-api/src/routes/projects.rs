//! Project endpoints
//!
//! The owner is always the caller. Updates and deletion are allowed for the
//! owner and staff (managers, admins).

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    routes::MessageResponse,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use taskhub_shared::{
    auth::{authorization::require_project_owner, middleware::AuthContext},
    models::project::{NewProjectInput, Project, ProjectPatchInput, ProjectQuery, ProjectView},
    store::expand::{expand_project, expand_projects},
};
use uuid::Uuid;

fn project_not_found() -> ApiError {
    ApiError::NotFound("Project not found".to_string())
}

async fn load_project(state: &AppState, id: Uuid) -> ApiResult<Project> {
    state
        .store
        .projects
        .find_by_id(id)
        .await?
        .ok_or_else(project_not_found)
}

/// `GET /api/projects?status&owner&page&limit`
pub async fn list_projects(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProjectQuery>,
) -> ApiResult<Json<Vec<ProjectView>>> {
    let (filter, page) = query.into_filter()?;
    let (projects, _total) = state.store.projects.list(&filter, page).await?;

    Ok(Json(
        expand_projects(state.store.users.as_ref(), projects).await?,
    ))
}

/// `GET /api/projects/:id`
pub async fn get_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ProjectView>> {
    let project = load_project(&state, id).await?;
    Ok(Json(expand_project(state.store.users.as_ref(), project).await?))
}

/// `POST /api/projects`
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(input): ApiJson<NewProjectInput>,
) -> ApiResult<(StatusCode, Json<ProjectView>)> {
    let create = input.into_create(auth.user_id)?;
    let project = state.store.projects.create(create).await?;

    tracing::info!(project_id = %project.id, user_id = %auth.user_id, "Project created");

    let view = expand_project(state.store.users.as_ref(), project).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// `PUT /api/projects/:id`
///
/// The resulting start/end dates are checked against the stored record, so
/// moving only `endDate` before the existing start date is rejected.
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<ProjectPatchInput>,
) -> ApiResult<Json<ProjectView>> {
    let update = input.into_update()?;

    let existing = load_project(&state, id).await?;
    require_project_owner(&auth, &existing)?;
    update.check_against(&existing)?;

    let project = state
        .store
        .projects
        .update(id, update)
        .await?
        .ok_or_else(project_not_found)?;

    tracing::info!(project_id = %project.id, user_id = %auth.user_id, "Project updated");
    Ok(Json(expand_project(state.store.users.as_ref(), project).await?))
}

/// `DELETE /api/projects/:id`
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let existing = load_project(&state, id).await?;
    require_project_owner(&auth, &existing)?;

    if !state.store.projects.delete(id).await? {
        return Err(project_not_found());
    }

    tracing::info!(project_id = %id, user_id = %auth.user_id, "Project deleted");
    Ok(Json(MessageResponse::new("Project deleted successfully")))
}

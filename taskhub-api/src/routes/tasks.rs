//! Task endpoints
//!
//! Responses expand `assignedTo`, `createdBy` and comment authors to user
//! summaries. The creator is always the caller; updates are allowed for the
//! creator, the assignee and staff, deletion for the creator and staff.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    routes::MessageResponse,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Serialize;
use taskhub_shared::{
    auth::{
        authorization::{require_task_editor, require_task_owner},
        middleware::AuthContext,
    },
    models::task::{
        AttachmentInput, CommentInput, NewTaskInput, Task, TaskPatchInput, TaskQuery, TaskView,
    },
    store::expand::{expand_task, expand_tasks},
};
use uuid::Uuid;

/// `GET /api/tasks` response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListResponse {
    pub tasks: Vec<TaskView>,
    pub total_pages: i64,
    pub current_page: u32,
    pub total: i64,
}

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

async fn load_task(state: &AppState, id: Uuid) -> ApiResult<Task> {
    state
        .store
        .tasks
        .find_by_id(id)
        .await?
        .ok_or_else(task_not_found)
}

/// `GET /api/tasks?status&priority&project&assignedTo&page&limit`
///
/// Newest first; `limit` defaults to 10.
pub async fn list_tasks(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TaskQuery>,
) -> ApiResult<Json<TaskListResponse>> {
    let (filter, page) = query.into_filter()?;
    let (tasks, total) = state.store.tasks.list(&filter, page).await?;
    let tasks = expand_tasks(state.store.users.as_ref(), tasks).await?;

    Ok(Json(TaskListResponse {
        tasks,
        total_pages: page.total_pages(total),
        current_page: page.page,
        total,
    }))
}

/// `GET /api/tasks/:id`
pub async fn get_task(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<TaskView>> {
    let task = load_task(&state, id).await?;
    Ok(Json(expand_task(state.store.users.as_ref(), task).await?))
}

/// `POST /api/tasks`
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(input): ApiJson<NewTaskInput>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    let create = input.into_create(auth.user_id)?;
    let task = state.store.tasks.create(create).await?;

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, "Task created");

    let view = expand_task(state.store.users.as_ref(), task).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// `PUT /api/tasks/:id`
///
/// Only supplied fields change; `assignedTo` and `dueDate` are cleared by an
/// explicit `null`.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<TaskPatchInput>,
) -> ApiResult<Json<TaskView>> {
    let update = input.into_update()?;

    let existing = load_task(&state, id).await?;
    require_task_editor(&auth, &existing)?;

    let task = state
        .store
        .tasks
        .update(id, update)
        .await?
        .ok_or_else(task_not_found)?;

    tracing::info!(task_id = %task.id, user_id = %auth.user_id, "Task updated");
    Ok(Json(expand_task(state.store.users.as_ref(), task).await?))
}

/// `DELETE /api/tasks/:id`
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let existing = load_task(&state, id).await?;
    require_task_owner(&auth, &existing)?;

    if !state.store.tasks.delete(id).await? {
        return Err(task_not_found());
    }

    tracing::info!(task_id = %id, user_id = %auth.user_id, "Task deleted");
    Ok(Json(MessageResponse::new("Task deleted successfully")))
}

/// `POST /api/tasks/:id/comments`
///
/// Any authenticated user may comment; the author is the caller.
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CommentInput>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    let comment = input.into_comment(auth.user_id)?;

    let task = state
        .store
        .tasks
        .add_comment(id, comment)
        .await?
        .ok_or_else(task_not_found)?;

    let view = expand_task(state.store.users.as_ref(), task).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// `POST /api/tasks/:id/attachments`
pub async fn add_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<AttachmentInput>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    let attachment = input.into_attachment()?;

    let existing = load_task(&state, id).await?;
    require_task_editor(&auth, &existing)?;

    let task = state
        .store
        .tasks
        .add_attachment(id, attachment)
        .await?
        .ok_or_else(task_not_found)?;

    let view = expand_task(state.store.users.as_ref(), task).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

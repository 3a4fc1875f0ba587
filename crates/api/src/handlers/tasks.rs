//! Handlers for `/tasks`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use crewline_core::audit::{actions, models};
use crewline_core::email_templates;
use crewline_core::pagination::{Page, PageRequest};
use crewline_core::policy::Action;
use crewline_core::project::{TaskStatus, TASK_TRANSITIONS};
use crewline_core::types::{Date, DbId};
use crewline_core::validation::validate;
use crewline_db::models::task::{Task, UpdateTask};
use crewline_db::repositories::{OutboxRepo, ProjectRepo, TaskRepo, UserRepo};
use crewline_db::retry::with_retry;
use serde::Deserialize;
use validator::Validate;

use crate::audit_trail::AuditEntry;
use crate::error::{AppError, AppResult};
use crate::handlers::not_found;
use crate::middleware::auth::{AuthUser, ClientIp};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MyTasksParams {
    pub status: Option<TaskStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "must not be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee_id: Option<DbId>,
    pub due_date: Option<Date>,
}

#[derive(Debug, Deserialize)]
pub struct TaskStatusRequest {
    pub status: TaskStatus,
}

/// GET /api/tasks/mine?status=&page=&limit=
pub async fn my_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<MyTasksParams>,
) -> AppResult<Json<Page<Task>>> {
    let page = PageRequest::new(params.page, params.limit);
    let (tasks, total) =
        TaskRepo::list_for_assignee(&state.pool, auth.user_id, params.status, page).await?;
    Ok(Json(Page::new(tasks, page, total)))
}

/// GET /api/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Task>>> {
    auth.authorize(Action::ProjectRead)?;
    let task = TaskRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Task", id))?;
    Ok(Json(DataResponse { data: task }))
}

/// PUT /api/tasks/{id}
///
/// A new assignee is notified by email.
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTaskRequest>,
) -> AppResult<Json<DataResponse<Task>>> {
    auth.authorize(Action::TaskManage)?;
    validate(&input)?;

    let mut tx = state.pool.begin().await?;
    let before = TaskRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found("Task", id))?;
    let new_assignee = match input.assignee_id {
        Some(user_id) if before.assignee_id != Some(user_id) => Some(
            UserRepo::find_by_id(&mut *tx, user_id)
                .await?
                .ok_or_else(|| not_found("User", user_id))?,
        ),
        _ => None,
    };

    let task = TaskRepo::update(
        &mut *tx,
        id,
        &UpdateTask {
            assignee_id: input.assignee_id,
            title: input.title.map(|t| t.trim().to_string()),
            description: input.description,
            due_date: input.due_date,
        },
    )
    .await?
    .ok_or_else(|| not_found("Task", id))?;

    if let Some(user) = new_assignee {
        let project = ProjectRepo::find_by_id(&mut *tx, task.project_id)
            .await?
            .ok_or_else(|| not_found("Project", task.project_id))?;
        OutboxRepo::enqueue(
            &mut *tx,
            &email_templates::task_assigned(&user.email, &user.first_name, &task.title, &project.name),
        )
        .await?;
    }

    AuditEntry::new(actions::UPDATE, models::TASK)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .before(&before)
        .after(&task)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Json(DataResponse { data: task }))
}

/// PUT /api/tasks/{id}/status
///
/// The assignee or a supervisor may move the task.
pub async fn set_task_status(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<TaskStatusRequest>,
) -> AppResult<Json<DataResponse<Task>>> {
    auth.authorize(Action::ProjectRead)?;
    let task = with_retry(|| transition_task(&state, &auth, &ip, id, input.status)).await?;
    Ok(Json(DataResponse { data: task }))
}

async fn transition_task(
    state: &AppState,
    auth: &AuthUser,
    ip: &ClientIp,
    id: DbId,
    target: TaskStatus,
) -> AppResult<Task> {
    let mut tx = state.pool.begin().await?;
    let task = TaskRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found("Task", id))?;
    TASK_TRANSITIONS.check(task.status, target, &auth.context_for_owner(task.assignee_id))?;
    if task.status == target {
        return Ok(task);
    }

    let updated = TaskRepo::set_status(&mut *tx, id, task.status, target)
        .await?
        .ok_or_else(|| AppError::concurrent_modification("Task"))?;
    AuditEntry::new(actions::STATUS_CHANGE, models::TASK)
        .record(id)
        .by(Some(auth.user_id))
        .ip(ip)
        .before(&task)
        .after(&updated)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(updated)
}

/// DELETE /api/tasks/{id}
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    auth.authorize(Action::TaskManage)?;

    let mut tx = state.pool.begin().await?;
    let before = TaskRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found("Task", id))?;
    TaskRepo::delete(&mut *tx, id).await?;
    AuditEntry::new(actions::DELETE, models::TASK)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .before(&before)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

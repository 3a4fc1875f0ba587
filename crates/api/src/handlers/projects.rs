//! Handlers for `/projects`, including the project board status and the
//! project's task list.
//!
//! Team and client links are written in the same transaction as the project
//! row, so a failed link (unknown team, duplicate) leaves nothing behind.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use crewline_core::audit::{actions, models};
use crewline_core::email_templates::{self, EmailMessage};
use crewline_core::pagination::{Page, PageRequest};
use crewline_core::policy::Action;
use crewline_core::project::{
    is_completion, validate_schedule, ProjectStatus, TaskStatus, PROJECT_TRANSITIONS,
};
use crewline_core::types::{Date, DbId};
use crewline_core::validation::validate;
use crewline_db::models::project::{CreateProject, Project, ProjectDetail, TeamLink, UpdateProject};
use crewline_db::models::task::{CreateTask, Task};
use crewline_db::repositories::{OutboxRepo, ProjectRepo, TaskRepo, UserRepo};
use crewline_db::retry::with_retry;
use serde::Deserialize;
use sqlx::PgConnection;
use validator::Validate;

use crate::audit_trail::AuditEntry;
use crate::error::{AppError, AppResult};
use crate::handlers::not_found;
use crate::middleware::auth::{AuthUser, ClientIp};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProjectListParams {
    pub status: Option<ProjectStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// A team link with an optional per-link note.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamLinkInput {
    pub team_id: DbId,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "is required"))]
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<Date>,
    pub due_date: Option<Date>,
    #[serde(default)]
    pub team_ids: Vec<DbId>,
    #[serde(default)]
    pub teams: Vec<TeamLinkInput>,
    #[serde(default)]
    pub client_ids: Vec<DbId>,
}

/// Absent link lists leave the existing links untouched; a present list
/// replaces them.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "must not be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<Date>,
    pub due_date: Option<Date>,
    pub team_ids: Option<Vec<DbId>>,
    pub teams: Option<Vec<TeamLinkInput>>,
    pub client_ids: Option<Vec<DbId>>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ProjectStatus,
}

#[derive(Debug, Deserialize)]
pub struct TaskListParams {
    pub status: Option<TaskStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "is required"))]
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Option<DbId>,
    pub due_date: Option<Date>,
}

/// Merge `teamIds` and `teams` into one de-duplicated link list. A note
/// given in `teams` wins over a bare id.
fn team_links(ids: &[DbId], teams: &[TeamLinkInput]) -> Vec<TeamLink> {
    let mut links: Vec<TeamLink> = teams
        .iter()
        .map(|t| TeamLink {
            team_id: t.team_id,
            note: t.note.clone(),
        })
        .collect();
    for id in ids {
        if !links.iter().any(|l| l.team_id == *id) {
            links.push(TeamLink {
                team_id: *id,
                note: None,
            });
        }
    }
    let mut seen = Vec::with_capacity(links.len());
    links.retain(|l| {
        if seen.contains(&l.team_id) {
            false
        } else {
            seen.push(l.team_id);
            true
        }
    });
    links
}

fn dedup(ids: &[DbId]) -> Vec<DbId> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

async fn load_detail(state: &AppState, id: DbId) -> AppResult<ProjectDetail> {
    ProjectRepo::find_detail(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Project", id))
}

/// GET /api/projects?status=&page=&limit=
pub async fn list_projects(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ProjectListParams>,
) -> AppResult<Json<Page<Project>>> {
    auth.authorize(Action::ProjectRead)?;
    let page = PageRequest::new(params.page, params.limit);
    let (projects, total) = ProjectRepo::list(&state.pool, params.status, page).await?;
    Ok(Json(Page::new(projects, page, total)))
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Json(input): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ProjectDetail>>)> {
    auth.authorize(Action::ProjectManage)?;
    validate(&input)?;
    validate_schedule(input.start_date, input.due_date)?;

    let mut tx = state.pool.begin().await?;
    let project = ProjectRepo::create(
        &mut *tx,
        &CreateProject {
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            start_date: input.start_date,
            due_date: input.due_date,
            created_by: auth.user_id,
        },
    )
    .await?;
    ProjectRepo::set_teams(&mut tx, project.id, &team_links(&input.team_ids, &input.teams)).await?;
    ProjectRepo::set_clients(&mut tx, project.id, &dedup(&input.client_ids)).await?;
    AuditEntry::new(actions::CREATE, models::PROJECT)
        .record(project.id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .after(&project)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(project_id = project.id, "Project created");
    let detail = load_detail(&state, project.id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// GET /api/projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProjectDetail>>> {
    auth.authorize(Action::ProjectRead)?;
    Ok(Json(DataResponse {
        data: load_detail(&state, id).await?,
    }))
}

/// PUT /api/projects/{id}
pub async fn update_project(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProjectRequest>,
) -> AppResult<Json<DataResponse<ProjectDetail>>> {
    auth.authorize(Action::ProjectManage)?;
    validate(&input)?;

    let mut tx = state.pool.begin().await?;
    let before = ProjectRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found("Project", id))?;
    validate_schedule(
        input.start_date.or(before.start_date),
        input.due_date.or(before.due_date),
    )?;

    let project = ProjectRepo::update(
        &mut *tx,
        id,
        &UpdateProject {
            name: input.name.map(|n| n.trim().to_string()),
            description: input.description,
            start_date: input.start_date,
            due_date: input.due_date,
        },
    )
    .await?
    .ok_or_else(|| not_found("Project", id))?;

    if input.team_ids.is_some() || input.teams.is_some() {
        let links = team_links(
            input.team_ids.as_deref().unwrap_or_default(),
            input.teams.as_deref().unwrap_or_default(),
        );
        ProjectRepo::set_teams(&mut tx, id, &links).await?;
    }
    if let Some(client_ids) = &input.client_ids {
        ProjectRepo::set_clients(&mut tx, id, &dedup(client_ids)).await?;
    }

    AuditEntry::new(actions::UPDATE, models::PROJECT)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .before(&before)
        .after(&project)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Json(DataResponse {
        data: load_detail(&state, id).await?,
    }))
}

/// DELETE /api/projects/{id}
pub async fn delete_project(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    auth.authorize(Action::ProjectManage)?;

    let mut tx = state.pool.begin().await?;
    let before = ProjectRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found("Project", id))?;
    ProjectRepo::delete(&mut *tx, id).await?;
    AuditEntry::new(actions::DELETE, models::PROJECT)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .before(&before)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/projects/{id}/status (PUT accepted as well)
///
/// Allowed for members assigned to the project and for admins. Entering
/// `Done` queues a completion email to every linked client; setting the
/// current status again changes nothing and sends nothing.
pub async fn set_status(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<StatusRequest>,
) -> AppResult<Json<DataResponse<Project>>> {
    auth.authorize(Action::ProjectRead)?;
    let project = with_retry(|| transition_project(&state, &auth, &ip, id, input.status)).await?;
    Ok(Json(DataResponse { data: project }))
}

async fn transition_project(
    state: &AppState,
    auth: &AuthUser,
    ip: &ClientIp,
    id: DbId,
    target: ProjectStatus,
) -> AppResult<Project> {
    let mut tx = state.pool.begin().await?;
    let project = ProjectRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found("Project", id))?;
    let is_member = ProjectRepo::is_member(&mut *tx, id, auth.user_id).await?;
    PROJECT_TRANSITIONS.check(project.status, target, &auth.context_as_member(is_member))?;

    if project.status == target {
        return Ok(project);
    }

    let updated = ProjectRepo::set_status(&mut *tx, id, project.status, target)
        .await?
        .ok_or_else(|| AppError::concurrent_modification("Project"))?;

    if is_completion(project.status, target) {
        queue_completion_emails(&mut tx, &updated).await?;
    }

    AuditEntry::new(actions::STATUS_CHANGE, models::PROJECT)
        .record(id)
        .by(Some(auth.user_id))
        .ip(ip)
        .before(&project)
        .after(&updated)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(
        project_id = id,
        from = %project.status,
        to = %updated.status,
        "Project status changed"
    );
    Ok(updated)
}

async fn queue_completion_emails(conn: &mut PgConnection, project: &Project) -> AppResult<()> {
    let contacts = ProjectRepo::client_contacts(&mut *conn, project.id).await?;
    let messages: Vec<EmailMessage> = contacts
        .iter()
        .map(|c| email_templates::project_completed(&c.email, &c.contact_name, &project.name))
        .collect();
    OutboxRepo::enqueue_all(conn, &messages).await?;
    Ok(())
}

/// GET /api/projects/{id}/tasks?status=&page=&limit=
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Query(params): Query<TaskListParams>,
) -> AppResult<Json<Page<Task>>> {
    auth.authorize(Action::ProjectRead)?;
    if ProjectRepo::find_by_id(&state.pool, id).await?.is_none() {
        return Err(not_found("Project", id));
    }
    let page = PageRequest::new(params.page, params.limit);
    let (tasks, total) = TaskRepo::list_for_project(&state.pool, id, params.status, page).await?;
    Ok(Json(Page::new(tasks, page, total)))
}

/// POST /api/projects/{id}/tasks
///
/// An assignee is notified by email.
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<CreateTaskRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Task>>)> {
    auth.authorize(Action::TaskManage)?;
    validate(&input)?;

    let mut tx = state.pool.begin().await?;
    let project = ProjectRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found("Project", id))?;
    let assignee = match input.assignee_id {
        Some(user_id) => Some(
            UserRepo::find_by_id(&mut *tx, user_id)
                .await?
                .ok_or_else(|| not_found("User", user_id))?,
        ),
        None => None,
    };

    let task = TaskRepo::create(
        &mut *tx,
        &CreateTask {
            project_id: id,
            assignee_id: input.assignee_id,
            title: input.title.trim().to_string(),
            description: input.description,
            due_date: input.due_date,
            created_by: auth.user_id,
        },
    )
    .await?;
    if let Some(user) = &assignee {
        OutboxRepo::enqueue(
            &mut *tx,
            &email_templates::task_assigned(&user.email, &user.first_name, &task.title, &project.name),
        )
        .await?;
    }
    AuditEntry::new(actions::CREATE, models::TASK)
        .record(task.id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .after(&task)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: task })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_links_merge_and_dedup() {
        let links = team_links(
            &[1, 2, 2],
            &[TeamLinkInput {
                team_id: 2,
                note: Some("lead".into()),
            }],
        );
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].team_id, 2);
        assert_eq!(links[0].note.as_deref(), Some("lead"));
        assert_eq!(links[1].team_id, 1);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        assert_eq!(dedup(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }
}

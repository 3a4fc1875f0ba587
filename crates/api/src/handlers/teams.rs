//! Handlers for `/teams` and team membership.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use crewline_core::audit::{actions, models};
use crewline_core::pagination::{Page, PageRequest};
use crewline_core::policy::Action;
use crewline_core::types::DbId;
use crewline_core::validation::validate;
use crewline_db::models::team::{AddTeamMember, CreateTeam, Team, TeamDetail, TeamMember, UpdateTeam};
use crewline_db::repositories::{ProjectRepo, TeamRepo, UserRepo};
use serde::Deserialize;
use validator::Validate;

use crate::audit_trail::AuditEntry;
use crate::error::AppResult;
use crate::handlers::not_found;
use crate::middleware::auth::{AuthUser, ClientIp};
use crate::query::non_empty;
use crate::response::DataResponse;
use crate::state::AppState;

/// Member role used when the request omits one.
const DEFAULT_MEMBER_ROLE: &str = "member";

#[derive(Debug, Deserialize)]
pub struct TeamListParams {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    #[validate(length(min = 1, max = 200, message = "is required"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamRequest {
    #[validate(length(min = 1, max = 200, message = "must not be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: DbId,
    /// Scope the membership to one project; omitted means team-wide.
    pub project_id: Option<DbId>,
    #[validate(length(min = 1, max = 100, message = "must not be empty"))]
    pub role: Option<String>,
    pub note: Option<String>,
}

/// GET /api/teams?search=&page=&limit=
pub async fn list_teams(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<TeamListParams>,
) -> AppResult<Json<Page<Team>>> {
    auth.authorize(Action::TeamRead)?;
    let page = PageRequest::new(params.page, params.limit);
    let search = non_empty(params.search);
    let (teams, total) = TeamRepo::list(&state.pool, search.as_deref(), page).await?;
    Ok(Json(Page::new(teams, page, total)))
}

/// POST /api/teams
pub async fn create_team(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Json(input): Json<CreateTeamRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Team>>)> {
    auth.authorize(Action::TeamManage)?;
    validate(&input)?;

    let mut tx = state.pool.begin().await?;
    let team = TeamRepo::create(
        &mut *tx,
        &CreateTeam {
            name: input.name.trim().to_string(),
            description: input.description,
        },
    )
    .await?;
    AuditEntry::new(actions::CREATE, models::TEAM)
        .record(team.id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .after(&team)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: team })))
}

/// GET /api/teams/{id}
pub async fn get_team(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TeamDetail>>> {
    auth.authorize(Action::TeamRead)?;
    let team = TeamRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Team", id))?;
    let members = TeamRepo::members(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: TeamDetail { team, members },
    }))
}

/// PUT /api/teams/{id}
pub async fn update_team(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTeamRequest>,
) -> AppResult<Json<DataResponse<Team>>> {
    auth.authorize(Action::TeamManage)?;
    validate(&input)?;

    let mut tx = state.pool.begin().await?;
    let before = TeamRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found("Team", id))?;
    let team = TeamRepo::update(
        &mut *tx,
        id,
        &UpdateTeam {
            name: input.name.map(|n| n.trim().to_string()),
            description: input.description,
        },
    )
    .await?
    .ok_or_else(|| not_found("Team", id))?;
    AuditEntry::new(actions::UPDATE, models::TEAM)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .before(&before)
        .after(&team)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Json(DataResponse { data: team }))
}

/// DELETE /api/teams/{id}
pub async fn delete_team(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    auth.authorize(Action::TeamManage)?;

    let mut tx = state.pool.begin().await?;
    let before = TeamRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found("Team", id))?;
    TeamRepo::delete(&mut *tx, id).await?;
    AuditEntry::new(actions::DELETE, models::TEAM)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .before(&before)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/teams/{id}/members
pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<AddMemberRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<TeamMember>>)> {
    auth.authorize(Action::TeamManage)?;
    validate(&input)?;

    let mut tx = state.pool.begin().await?;
    if TeamRepo::find_by_id(&mut *tx, id).await?.is_none() {
        return Err(not_found("Team", id));
    }
    if UserRepo::find_by_id(&mut *tx, input.user_id).await?.is_none() {
        return Err(not_found("User", input.user_id));
    }
    if let Some(project_id) = input.project_id {
        if ProjectRepo::find_by_id(&mut *tx, project_id).await?.is_none() {
            return Err(not_found("Project", project_id));
        }
    }

    let member = TeamRepo::add_member(
        &mut *tx,
        id,
        &AddTeamMember {
            user_id: input.user_id,
            project_id: input.project_id,
            role: input
                .role
                .map(|r| r.trim().to_string())
                .unwrap_or_else(|| DEFAULT_MEMBER_ROLE.to_string()),
            note: input.note,
        },
    )
    .await?;
    AuditEntry::new(actions::UPDATE, models::TEAM)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .after(&member)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(team_id = id, user_id = member.user_id, "Team member added");
    Ok((StatusCode::CREATED, Json(DataResponse { data: member })))
}

/// DELETE /api/teams/{id}/members/{userId}
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path((id, user_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    auth.authorize(Action::TeamManage)?;

    let mut tx = state.pool.begin().await?;
    let removed = TeamRepo::remove_member(&mut *tx, id, user_id).await?;
    if removed == 0 {
        return Err(not_found("TeamMember", user_id));
    }
    AuditEntry::new(actions::UPDATE, models::TEAM)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .before(&serde_json::json!({ "removedUserId": user_id }))
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/teams/{id}/projects/{projectId}/members
pub async fn project_members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, project_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Vec<TeamMember>>>> {
    auth.authorize(Action::TeamRead)?;
    if TeamRepo::find_by_id(&state.pool, id).await?.is_none() {
        return Err(not_found("Team", id));
    }
    let members = TeamRepo::members_on_project(&state.pool, id, project_id).await?;
    Ok(Json(DataResponse { data: members }))
}

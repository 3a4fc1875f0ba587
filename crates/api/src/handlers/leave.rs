//! Handlers for `/leave`: requests by staff, decisions by supervisors.
//!
//! A decision is a compare-and-set on the `pending` status inside a
//! transaction that also queues the requester's email, so a request is
//! decided (and notified) at most once even under concurrent decisions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use crewline_core::audit::{actions, models};
use crewline_core::email_templates;
use crewline_core::error::CoreError;
use crewline_core::leave::{
    validate_request, LeaveStatus, DELETE_RULE, EDITABLE_STATES, EDIT_RULE, LEAVE_TRANSITIONS,
};
use crewline_core::pagination::{Page, PageRequest};
use crewline_core::policy::Action;
use crewline_core::types::{Date, DbId};
use crewline_core::workflow::{ensure_state, TransitionContext};
use crewline_db::models::leave::{CreateLeave, Leave, LeaveDecision, LeaveFilter, UpdateLeave};
use crewline_db::repositories::{LeaveRepo, OutboxRepo, UserRepo};
use crewline_db::retry::with_retry;
use serde::Deserialize;

use crate::audit_trail::AuditEntry;
use crate::error::{AppError, AppResult};
use crate::handlers::not_found;
use crate::middleware::auth::{AuthUser, ClientIp};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveListParams {
    pub status: Option<LeaveStatus>,
    /// Only honoured for callers who may read every request.
    pub user_id: Option<DbId>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeaveRequest {
    pub leave_type: String,
    pub start_date: Date,
    pub end_date: Date,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeaveRequest {
    pub leave_type: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeaveStatusRequest {
    pub status: LeaveStatus,
    pub note: Option<String>,
}

fn forbidden() -> AppError {
    AppError::Core(CoreError::Forbidden(
        "Not permitted to access this leave request".into(),
    ))
}

async fn find_leave(state: &AppState, id: DbId) -> AppResult<Leave> {
    LeaveRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Leave", id))
}

/// GET /api/leave?status=&userId=&page=&limit=
///
/// Staff see their own requests; supervisors see everyone's.
pub async fn list_leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<LeaveListParams>,
) -> AppResult<Json<Page<Leave>>> {
    auth.authorize(Action::LeaveRequest)?;
    let user_id = if auth.can(Action::LeaveReadAll) {
        params.user_id
    } else {
        Some(auth.user_id)
    };
    let page = PageRequest::new(params.page, params.limit);
    let filter = LeaveFilter {
        user_id,
        status: params.status,
    };
    let (leaves, total) = LeaveRepo::list(&state.pool, &filter, page).await?;
    Ok(Json(Page::new(leaves, page, total)))
}

/// POST /api/leave
pub async fn create_leave(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Json(input): Json<CreateLeaveRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Leave>>)> {
    auth.authorize(Action::LeaveRequest)?;
    let leave_type = input.leave_type.trim().to_lowercase();
    validate_request(&leave_type, input.start_date, input.end_date)?;

    let mut tx = state.pool.begin().await?;
    let leave = LeaveRepo::create(
        &mut *tx,
        &CreateLeave {
            user_id: auth.user_id,
            leave_type,
            start_date: input.start_date,
            end_date: input.end_date,
            reason: input.reason,
        },
    )
    .await?;
    AuditEntry::new(actions::CREATE, models::LEAVE)
        .record(leave.id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .after(&leave)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: leave })))
}

/// GET /api/leave/{id}
pub async fn get_leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Leave>>> {
    auth.authorize(Action::LeaveRequest)?;
    let leave = find_leave(&state, id).await?;
    if leave.user_id != auth.user_id && !auth.can(Action::LeaveReadAll) {
        return Err(forbidden());
    }
    Ok(Json(DataResponse { data: leave }))
}

/// PUT /api/leave/{id}
///
/// Only pending requests can be edited, by the requester or a supervisor.
pub async fn update_leave(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateLeaveRequest>,
) -> AppResult<Json<DataResponse<Leave>>> {
    auth.authorize(Action::LeaveRequest)?;
    let leave = find_leave(&state, id).await?;
    if !EDIT_RULE.admits(&auth.context_for_owner(Some(leave.user_id))) {
        return Err(forbidden());
    }
    ensure_state("Leave", leave.status, EDITABLE_STATES, "edited")?;

    let leave_type = input.leave_type.map(|t| t.trim().to_lowercase());
    validate_request(
        leave_type.as_deref().unwrap_or(&leave.leave_type),
        input.start_date.unwrap_or(leave.start_date),
        input.end_date.unwrap_or(leave.end_date),
    )?;

    let mut tx = state.pool.begin().await?;
    let updated = LeaveRepo::update_pending(
        &mut *tx,
        id,
        &UpdateLeave {
            leave_type,
            start_date: input.start_date,
            end_date: input.end_date,
            reason: input.reason,
        },
    )
    .await?
    .ok_or_else(|| AppError::concurrent_modification("Leave"))?;
    AuditEntry::new(actions::UPDATE, models::LEAVE)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .before(&leave)
        .after(&updated)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/leave/{id}
pub async fn delete_leave(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    auth.authorize(Action::LeaveRequest)?;
    let leave = find_leave(&state, id).await?;
    if !DELETE_RULE.admits(&auth.context_for_owner(Some(leave.user_id))) {
        return Err(forbidden());
    }
    ensure_state("Leave", leave.status, EDITABLE_STATES, "deleted")?;

    let mut tx = state.pool.begin().await?;
    if !LeaveRepo::delete_pending(&mut *tx, id).await? {
        return Err(AppError::concurrent_modification("Leave"));
    }
    AuditEntry::new(actions::DELETE, models::LEAVE)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .before(&leave)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/leave/{id}/status
pub async fn decide_leave(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<LeaveStatusRequest>,
) -> AppResult<Json<DataResponse<Leave>>> {
    auth.authorize(Action::LeaveDecide)?;
    let note = input
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let leave = with_retry(|| apply_decision(&state, &auth, &ip, id, input.status, note)).await?;
    tracing::info!(leave_id = id, status = %leave.status, "Leave request decided");
    Ok(Json(DataResponse { data: leave }))
}

async fn apply_decision(
    state: &AppState,
    auth: &AuthUser,
    ip: &ClientIp,
    id: DbId,
    target: LeaveStatus,
    note: Option<&str>,
) -> AppResult<Leave> {
    let mut tx = state.pool.begin().await?;
    let leave = LeaveRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found("Leave", id))?;
    LEAVE_TRANSITIONS.check(leave.status, target, &TransitionContext::role_only(&auth.role))?;

    let decided = LeaveRepo::decide(
        &mut *tx,
        id,
        &LeaveDecision {
            status: target,
            decided_by: auth.user_id,
            note: note.map(str::to_string),
        },
    )
    .await?
    .ok_or_else(|| AppError::concurrent_modification("Leave"))?;

    let requester = UserRepo::find_by_id(&mut *tx, decided.user_id)
        .await?
        .ok_or_else(|| not_found("User", decided.user_id))?;
    OutboxRepo::enqueue(
        &mut *tx,
        &email_templates::leave_decision(
            &requester.email,
            &requester.first_name,
            decided.status.as_str(),
            decided.start_date,
            decided.end_date,
            note,
        ),
    )
    .await?;

    let action = if target == LeaveStatus::Approved {
        actions::APPROVE
    } else {
        actions::REJECT
    };
    AuditEntry::new(action, models::LEAVE)
        .record(id)
        .by(Some(auth.user_id))
        .ip(ip)
        .before(&leave)
        .after(&decided)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(decided)
}

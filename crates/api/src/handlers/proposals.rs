//! Handlers for `/proposals`: draft, submit, decide.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use crewline_core::audit::{actions, models};
use crewline_core::email_templates::{self, EmailMessage};
use crewline_core::error::CoreError;
use crewline_core::pagination::{Page, PageRequest};
use crewline_core::policy::Action;
use crewline_core::proposal::{
    validate_value, ProposalStatus, DELETABLE_STATES, EDITABLE_STATES, PROPOSAL_TRANSITIONS,
};
use crewline_core::roles::SUPERVISORS;
use crewline_core::types::DbId;
use crewline_core::validation::validate;
use crewline_core::workflow::{ensure_state, TransitionContext};
use crewline_db::models::proposal::{CreateProposal, Proposal, ProposalFilter, UpdateProposal};
use crewline_db::repositories::{ClientRepo, OutboxRepo, ProposalRepo, UserRepo};
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
#[serde(rename_all = "camelCase")]
pub struct ProposalListParams {
    pub status: Option<ProposalStatus>,
    pub submitted_by: Option<DbId>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProposalRequest {
    #[validate(length(min = 1, max = 200, message = "is required"))]
    pub title: String,
    pub description: Option<String>,
    pub value: f64,
    pub client_id: Option<DbId>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProposalRequest {
    #[validate(length(min = 1, max = 200, message = "must not be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub value: Option<f64>,
    pub client_id: Option<DbId>,
}

#[derive(Debug, Deserialize)]
pub struct ProposalStatusRequest {
    pub status: ProposalStatus,
    pub note: Option<String>,
}

fn not_owner() -> AppError {
    AppError::Core(CoreError::Forbidden(
        "Only the author may change this proposal".into(),
    ))
}

async fn find_proposal(state: &AppState, id: DbId) -> AppResult<Proposal> {
    ProposalRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Proposal", id))
}

async fn ensure_client_exists(state: &AppState, client_id: Option<DbId>) -> AppResult<()> {
    if let Some(client_id) = client_id {
        if ClientRepo::find_by_id(&state.pool, client_id).await?.is_none() {
            return Err(not_found("Client", client_id));
        }
    }
    Ok(())
}

/// GET /api/proposals?status=&submittedBy=&page=&limit=
///
/// Staff see their own proposals; supervisors see all.
pub async fn list_proposals(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ProposalListParams>,
) -> AppResult<Json<Page<Proposal>>> {
    auth.authorize(Action::ProposalCreate)?;
    let submitted_by = if auth.can(Action::ProposalReadAll) {
        params.submitted_by
    } else {
        Some(auth.user_id)
    };
    let page = PageRequest::new(params.page, params.limit);
    let filter = ProposalFilter {
        submitted_by,
        status: params.status,
    };
    let (proposals, total) = ProposalRepo::list(&state.pool, &filter, page).await?;
    Ok(Json(Page::new(proposals, page, total)))
}

/// POST /api/proposals
pub async fn create_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Json(input): Json<CreateProposalRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Proposal>>)> {
    auth.authorize(Action::ProposalCreate)?;
    validate(&input)?;
    validate_value(input.value)?;
    ensure_client_exists(&state, input.client_id).await?;

    let mut tx = state.pool.begin().await?;
    let proposal = ProposalRepo::create(
        &mut *tx,
        &CreateProposal {
            title: input.title.trim().to_string(),
            description: input.description,
            value: input.value,
            client_id: input.client_id,
            submitted_by: auth.user_id,
        },
    )
    .await?;
    AuditEntry::new(actions::CREATE, models::PROPOSAL)
        .record(proposal.id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .after(&proposal)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: proposal })))
}

/// GET /api/proposals/{id}
pub async fn get_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Proposal>>> {
    auth.authorize(Action::ProposalCreate)?;
    let proposal = find_proposal(&state, id).await?;
    if proposal.submitted_by != auth.user_id && !auth.can(Action::ProposalReadAll) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Not permitted to view this proposal".into(),
        )));
    }
    Ok(Json(DataResponse { data: proposal }))
}

/// PUT /api/proposals/{id}
pub async fn update_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProposalRequest>,
) -> AppResult<Json<DataResponse<Proposal>>> {
    auth.authorize(Action::ProposalCreate)?;
    validate(&input)?;
    if let Some(value) = input.value {
        validate_value(value)?;
    }

    let proposal = find_proposal(&state, id).await?;
    if proposal.submitted_by != auth.user_id {
        return Err(not_owner());
    }
    ensure_state("Proposal", proposal.status, EDITABLE_STATES, "edited")?;
    ensure_client_exists(&state, input.client_id).await?;

    let mut tx = state.pool.begin().await?;
    let updated = ProposalRepo::update_draft(
        &mut *tx,
        id,
        &UpdateProposal {
            title: input.title.map(|t| t.trim().to_string()),
            description: input.description,
            value: input.value,
            client_id: input.client_id,
        },
    )
    .await?
    .ok_or_else(|| AppError::concurrent_modification("Proposal"))?;
    AuditEntry::new(actions::UPDATE, models::PROPOSAL)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .before(&proposal)
        .after(&updated)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/proposals/{id}
pub async fn delete_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    auth.authorize(Action::ProposalCreate)?;
    let proposal = find_proposal(&state, id).await?;
    if proposal.submitted_by != auth.user_id {
        return Err(not_owner());
    }
    ensure_state("Proposal", proposal.status, DELETABLE_STATES, "deleted")?;

    let mut tx = state.pool.begin().await?;
    if !ProposalRepo::delete_in_states(&mut *tx, id, DELETABLE_STATES).await? {
        return Err(AppError::concurrent_modification("Proposal"));
    }
    AuditEntry::new(actions::DELETE, models::PROPOSAL)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .before(&proposal)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/proposals/{id}/submit
///
/// Only the author may submit, and only from `Draft`. Supervisors are
/// notified by email.
pub async fn submit_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Proposal>>> {
    auth.authorize(Action::ProposalCreate)?;
    let proposal = with_retry(|| apply_submit(&state, &auth, &ip, id)).await?;
    tracing::info!(proposal_id = id, "Proposal submitted");
    Ok(Json(DataResponse { data: proposal }))
}

async fn apply_submit(
    state: &AppState,
    auth: &AuthUser,
    ip: &ClientIp,
    id: DbId,
) -> AppResult<Proposal> {
    let mut tx = state.pool.begin().await?;
    let proposal = ProposalRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found("Proposal", id))?;
    PROPOSAL_TRANSITIONS.check(
        proposal.status,
        ProposalStatus::Submitted,
        &auth.context_for_owner(Some(proposal.submitted_by)),
    )?;

    let submitted = ProposalRepo::submit(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::concurrent_modification("Proposal"))?;

    let submitter = UserRepo::find_by_id(&mut *tx, auth.user_id)
        .await?
        .ok_or_else(|| not_found("User", auth.user_id))?;
    let reviewers = UserRepo::emails_with_roles(&mut *tx, SUPERVISORS).await?;
    let messages: Vec<EmailMessage> = reviewers
        .iter()
        .filter(|to| **to != submitter.email)
        .map(|to| email_templates::proposal_submitted(to, &submitted.title, &submitter.full_name()))
        .collect();
    OutboxRepo::enqueue_all(&mut tx, &messages).await?;

    AuditEntry::new(actions::SUBMIT, models::PROPOSAL)
        .record(id)
        .by(Some(auth.user_id))
        .ip(ip)
        .before(&proposal)
        .after(&submitted)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(submitted)
}

/// PUT /api/proposals/{id}/status
///
/// Records a supervisor decision on a submitted proposal and notifies the
/// author.
pub async fn decide_proposal(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<ProposalStatusRequest>,
) -> AppResult<Json<DataResponse<Proposal>>> {
    auth.authorize(Action::ProposalDecide)?;
    let note = input
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let proposal = with_retry(|| apply_decision(&state, &auth, &ip, id, input.status, note)).await?;
    tracing::info!(proposal_id = id, status = %proposal.status, "Proposal decided");
    Ok(Json(DataResponse { data: proposal }))
}

async fn apply_decision(
    state: &AppState,
    auth: &AuthUser,
    ip: &ClientIp,
    id: DbId,
    target: ProposalStatus,
    note: Option<&str>,
) -> AppResult<Proposal> {
    let mut tx = state.pool.begin().await?;
    let proposal = ProposalRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found("Proposal", id))?;
    PROPOSAL_TRANSITIONS.check(
        proposal.status,
        target,
        &TransitionContext::role_only(&auth.role),
    )?;

    let decided = ProposalRepo::decide(&mut *tx, id, target, auth.user_id, note)
        .await?
        .ok_or_else(|| AppError::concurrent_modification("Proposal"))?;

    let author = UserRepo::find_by_id(&mut *tx, decided.submitted_by)
        .await?
        .ok_or_else(|| not_found("User", decided.submitted_by))?;
    OutboxRepo::enqueue(
        &mut *tx,
        &email_templates::proposal_decided(&author.email, &decided.title, decided.status.as_str(), note),
    )
    .await?;

    let action = match target {
        ProposalStatus::Approved => actions::APPROVE,
        ProposalStatus::Rejected => actions::REJECT,
        _ => actions::STATUS_CHANGE,
    };
    AuditEntry::new(action, models::PROPOSAL)
        .record(id)
        .by(Some(auth.user_id))
        .ip(ip)
        .before(&proposal)
        .after(&decided)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(decided)
}

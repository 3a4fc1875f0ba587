//! Handlers for `/clients`: external client self-registration, the client
//! portal (`/clients/me`) and admin approval.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use crewline_core::audit::{actions, models};
use crewline_core::client::{can_log_in, ApprovalStatus, CLIENT_APPROVAL_TRANSITIONS};
use crewline_core::email_templates;
use crewline_core::error::CoreError;
use crewline_core::pagination::{Page, PageRequest};
use crewline_core::policy::Action;
use crewline_core::roles::{ROLE_ADMIN, ROLE_CLIENT};
use crewline_core::types::DbId;
use crewline_core::validation::{validate, validate_password, validate_phone};
use crewline_core::workflow::TransitionContext;
use crewline_db::models::client::{Client, ClientResponse, CreateClient, UpdateClientProfile};
use crewline_db::models::project::{Project, ProjectDetail};
use crewline_db::repositories::{ClientRepo, OutboxRepo, ProjectRepo, UserRepo};
use crewline_db::retry::with_retry;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::audit_trail::AuditEntry;
use crate::auth::jwt::{generate_access_token, SubjectKind, TokenSubject};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::handlers::not_found;
use crate::middleware::auth::{AuthClient, AuthUser, ClientIp};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::storage::UploadKind;
use crate::upload::{store_upload, MultipartForm};

#[derive(Debug, Validate)]
pub struct RegisterClient {
    #[validate(length(min = 1, max = 200, message = "is required"))]
    pub company_name: String,
    #[validate(length(min = 1, max = 200, message = "is required"))]
    pub contact_name: String,
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    pub phone_number: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientAuthResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub client: ClientResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientListParams {
    pub approval_status: Option<ApprovalStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 200, message = "must not be empty"))]
    pub company_name: Option<String>,
    #[validate(length(min = 1, max = 200, message = "must not be empty"))]
    pub contact_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub status: ApprovalStatus,
    pub reason: Option<String>,
}

fn hash_error(e: argon2::password_hash::Error) -> AppError {
    AppError::InternalError(format!("Password hashing error: {e}"))
}

/// Queue a "client registered" notice to every admin.
async fn notify_admins(conn: &mut sqlx::PgConnection, client: &Client) -> AppResult<()> {
    let admins = UserRepo::emails_with_roles(&mut *conn, &[ROLE_ADMIN]).await?;
    let messages: Vec<_> = admins
        .iter()
        .map(|to| email_templates::client_registered(to, &client.company_name, &client.email))
        .collect();
    OutboxRepo::enqueue_all(conn, &messages).await?;
    Ok(())
}

/// POST /api/clients/register
///
/// Multipart fields: `companyName`, `contactName`, `email`, `phoneNumber`,
/// `password`, optional `document` file. The account starts `pending`.
pub async fn register_client(
    State(state): State<AppState>,
    ip: ClientIp,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<ClientResponse>>)> {
    let mut form = MultipartForm::read(multipart).await?;
    let input = RegisterClient {
        company_name: form.required("companyName")?,
        contact_name: form.required("contactName")?,
        email: form.required("email")?.to_lowercase(),
        phone_number: form.required("phoneNumber")?,
        password: form.required("password")?,
    };
    validate(&input)?;
    validate_phone(&input.phone_number)?;
    validate_password(&input.password)?;

    if let Some(constraint) =
        ClientRepo::conflicting_constraint(&state.pool, &input.email, &input.phone_number).await?
    {
        return Err(AppError::duplicate(&constraint));
    }

    let document_url = match form.take_file("document") {
        Some(file) => Some(store_upload(&state, &file, UploadKind::Document, "clients").await?),
        None => None,
    };
    let password_hash = hash_password(&input.password).map_err(hash_error)?;

    let mut tx = state.pool.begin().await?;
    let client = ClientRepo::create(
        &mut *tx,
        &CreateClient {
            company_name: input.company_name,
            contact_name: input.contact_name,
            email: input.email,
            phone_number: input.phone_number,
            password_hash,
            document_url,
        },
    )
    .await?;
    notify_admins(&mut tx, &client).await?;

    let response = ClientResponse::from(client);
    AuditEntry::new(actions::REGISTER, models::CLIENT)
        .record(response.id)
        .ip(&ip)
        .after(&response)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(client_id = response.id, "Client registered");
    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// POST /api/clients/login
///
/// Only approved clients receive a token.
pub async fn login_client(
    State(state): State<AppState>,
    ip: ClientIp,
    Json(input): Json<ClientLoginRequest>,
) -> AppResult<Json<ClientAuthResponse>> {
    let invalid = || AppError::Core(CoreError::Unauthorized("Invalid email or password".into()));

    let client = ClientRepo::find_by_email(&state.pool, &input.email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&input.password, &client.password_hash).map_err(hash_error)? {
        return Err(invalid());
    }
    if !can_log_in(client.approval_status) {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Client account is {}",
            client.approval_status
        ))));
    }

    AuditEntry::new(actions::LOGIN, models::CLIENT)
        .record(client.id)
        .ip(&ip)
        .write(&state.pool)
        .await?;

    let access_token = generate_access_token(
        TokenSubject {
            id: client.id,
            kind: SubjectKind::Client,
            role: ROLE_CLIENT,
            permissions: &[],
        },
        &state.config.jwt,
    )
    .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    Ok(Json(ClientAuthResponse {
        access_token,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        client: ClientResponse::from(client),
    }))
}

/// GET /api/clients?approvalStatus=&page=&limit=
pub async fn list_clients(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ClientListParams>,
) -> AppResult<Json<Page<ClientResponse>>> {
    auth.authorize(Action::ClientRead)?;
    let page = PageRequest::new(params.page, params.limit);
    let (clients, total) = ClientRepo::list(&state.pool, params.approval_status, page).await?;
    Ok(Json(Page::new(clients, page, total).map(ClientResponse::from)))
}

/// GET /api/clients/{id}
pub async fn get_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ClientResponse>>> {
    auth.authorize(Action::ClientRead)?;
    let client = ClientRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Client", id))?;
    Ok(Json(DataResponse {
        data: ClientResponse::from(client),
    }))
}

async fn current_client(state: &AppState, auth: &AuthClient) -> AppResult<Client> {
    ClientRepo::find_by_id(&state.pool, auth.client_id)
        .await?
        .ok_or_else(|| not_found("Client", auth.client_id))
}

/// GET /api/clients/me
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthClient,
) -> AppResult<Json<DataResponse<ClientResponse>>> {
    let client = current_client(&state, &auth).await?;
    Ok(Json(DataResponse {
        data: ClientResponse::from(client),
    }))
}

/// PUT /api/clients/me
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthClient,
    ip: ClientIp,
    Json(input): Json<UpdateClientRequest>,
) -> AppResult<Json<DataResponse<ClientResponse>>> {
    validate(&input)?;
    if let Some(phone) = &input.phone_number {
        validate_phone(phone)?;
    }

    let mut tx = state.pool.begin().await?;
    let updated = ClientRepo::update_profile(
        &mut *tx,
        auth.client_id,
        &UpdateClientProfile {
            company_name: input.company_name,
            contact_name: input.contact_name,
            phone_number: input.phone_number,
        },
    )
    .await?
    .map(ClientResponse::from)
    .ok_or_else(|| not_found("Client", auth.client_id))?;
    AuditEntry::new(actions::UPDATE, models::CLIENT)
        .record(auth.client_id)
        .ip(&ip)
        .after(&updated)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Json(DataResponse { data: updated }))
}

/// PUT /api/clients/me/documents (multipart `document`)
///
/// Replaces the registration document. A decided account goes back to
/// `pending` for a fresh review.
pub async fn resubmit_documents(
    State(state): State<AppState>,
    auth: AuthClient,
    ip: ClientIp,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<ClientResponse>>> {
    let mut form = MultipartForm::read(multipart).await?;
    let file = form
        .take_file("document")
        .ok_or_else(|| AppError::BadRequest("Missing required file 'document'".into()))?;

    let client = current_client(&state, &auth).await?;
    if client.approval_status != ApprovalStatus::Pending {
        let ctx = TransitionContext {
            role: ROLE_CLIENT,
            is_owner: true,
            is_member: false,
        };
        CLIENT_APPROVAL_TRANSITIONS.check(client.approval_status, ApprovalStatus::Pending, &ctx)?;
    }
    let url = store_upload(&state, &file, UploadKind::Document, "clients").await?;

    let mut tx = state.pool.begin().await?;
    let updated = ClientRepo::resubmit_documents(&mut *tx, client.id, client.approval_status, &url)
        .await?
        .ok_or_else(|| AppError::concurrent_modification("Client"))?;
    notify_admins(&mut tx, &updated).await?;

    let response = ClientResponse::from(updated);
    AuditEntry::new(actions::UPLOAD, models::CLIENT)
        .record(response.id)
        .ip(&ip)
        .before(&ClientResponse::from(client))
        .after(&response)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Json(DataResponse { data: response }))
}

/// GET /api/clients/me/projects
pub async fn my_projects(
    State(state): State<AppState>,
    auth: AuthClient,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<Page<Project>>> {
    let client = current_client(&state, &auth).await?;
    if !can_log_in(client.approval_status) {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Client account is {}",
            client.approval_status
        ))));
    }
    let page = params.page_request();
    let (projects, total) = ProjectRepo::list_for_client(&state.pool, client.id, page).await?;
    Ok(Json(Page::new(projects, page, total)))
}

/// GET /api/clients/me/projects/{projectId}
///
/// Projects not linked to the client are reported as missing.
pub async fn my_project(
    State(state): State<AppState>,
    auth: AuthClient,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProjectDetail>>> {
    let client = current_client(&state, &auth).await?;
    if !can_log_in(client.approval_status) {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Client account is {}",
            client.approval_status
        ))));
    }
    if !ProjectRepo::has_client(&state.pool, project_id, client.id).await? {
        return Err(not_found("Project", project_id));
    }
    let project = ProjectRepo::find_detail(&state.pool, project_id)
        .await?
        .ok_or_else(|| not_found("Project", project_id))?;
    Ok(Json(DataResponse { data: project }))
}

/// PUT /api/clients/{id}/approval
pub async fn decide_approval(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<ApprovalRequest>,
) -> AppResult<Json<DataResponse<ClientResponse>>> {
    auth.authorize(Action::ClientApprove)?;
    let client = with_retry(|| apply_decision(&state, &auth, &ip, id, &input)).await?;
    tracing::info!(client_id = id, status = %client.approval_status, "Client approval decided");
    Ok(Json(DataResponse { data: client }))
}

async fn apply_decision(
    state: &AppState,
    auth: &AuthUser,
    ip: &ClientIp,
    id: DbId,
    input: &ApprovalRequest,
) -> AppResult<ClientResponse> {
    let mut tx = state.pool.begin().await?;
    let client = ClientRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found("Client", id))?;
    CLIENT_APPROVAL_TRANSITIONS.check(
        client.approval_status,
        input.status,
        &TransitionContext::role_only(&auth.role),
    )?;

    let reason = input
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    let updated = ClientRepo::decide(
        &mut *tx,
        id,
        client.approval_status,
        input.status,
        auth.user_id,
        reason,
    )
    .await?
    .ok_or_else(|| AppError::concurrent_modification("Client"))?;

    OutboxRepo::enqueue(
        &mut *tx,
        &email_templates::client_approval(
            &updated.email,
            &updated.contact_name,
            updated.approval_status.as_str(),
            reason,
        ),
    )
    .await?;

    let action = if input.status == ApprovalStatus::Approved {
        actions::APPROVE
    } else {
        actions::REJECT
    };
    let response = ClientResponse::from(updated);
    AuditEntry::new(action, models::CLIENT)
        .record(id)
        .by(Some(auth.user_id))
        .ip(ip)
        .before(&ClientResponse::from(client))
        .after(&response)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(response)
}

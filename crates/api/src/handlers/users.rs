//! Handlers for `/users`: admin management of staff accounts.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use crewline_core::audit::{actions, models};
use crewline_core::credentials::generate_password;
use crewline_core::email_templates;
use crewline_core::error::CoreError;
use crewline_core::pagination::{Page, PageRequest};
use crewline_core::policy::Action;
use crewline_core::roles::validate_user_role;
use crewline_core::types::DbId;
use crewline_core::validation::{validate, validate_password, validate_phone};
use crewline_db::models::user::{CreateUser, UpdateUser, UserFilter, UserResponse};
use crewline_db::repositories::{OutboxRepo, RoleRepo, UserRepo};
use serde::Deserialize;
use validator::Validate;

use crate::audit_trail::AuditEntry;
use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};
use crate::handlers::not_found;
use crate::middleware::auth::{AuthUser, ClientIp};
use crate::query::non_empty;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::storage::UploadKind;
use crate::upload::{store_upload, MultipartForm};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListParams {
    pub role: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "is required"))]
    pub last_name: String,
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    pub phone_number: String,
    pub role: String,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "must not be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "must not be empty"))]
    pub last_name: Option<String>,
    #[validate(email(message = "must be a valid email"))]
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: Option<String>,
}

async fn role_id_for(state: &AppState, role: &str) -> AppResult<DbId> {
    validate_user_role(role).map_err(|e| AppError::Core(CoreError::Validation(e)))?;
    let role = RoleRepo::find_by_name(&state.pool, role)
        .await?
        .ok_or_else(|| AppError::InternalError(format!("Role '{role}' is not seeded")))?;
    Ok(role.id)
}

/// GET /api/users?role=&search=&page=&limit=
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<UserListParams>,
) -> AppResult<Json<Page<UserResponse>>> {
    auth.authorize(Action::UserRead)?;
    let page = PageRequest::new(params.page, params.limit);
    let filter = UserFilter {
        role: non_empty(params.role),
        search: non_empty(params.search),
    };
    let (users, total) = UserRepo::list(&state.pool, &filter, page).await?;
    Ok(Json(Page::new(users, page, total).map(UserResponse::from)))
}

/// POST /api/users
///
/// Creates a staff account. The credentials are always emailed; a password
/// is generated when none is given.
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    auth.authorize(Action::UserManage)?;
    validate(&input)?;
    validate_phone(&input.phone_number)?;
    if let Some(password) = &input.password {
        validate_password(password)?;
    }
    let role_id = role_id_for(&state, &input.role).await?;

    let password = input.password.clone().unwrap_or_else(generate_password);
    let password_hash = hash_password(&password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let mut tx = state.pool.begin().await?;
    let user = UserRepo::create(
        &mut *tx,
        &CreateUser {
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            phone_number: input.phone_number.trim().to_string(),
            password_hash,
            role_id,
            image_url: None,
        },
    )
    .await?;
    OutboxRepo::enqueue(
        &mut *tx,
        &email_templates::welcome_credentials(&user.email, &user.first_name, &password),
    )
    .await?;

    let response = UserResponse::from(user);
    AuditEntry::new(actions::CREATE, models::USER)
        .record(response.id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .after(&response)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(user_id = response.id, role = %response.role, "User created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// GET /api/users/{id}
///
/// Any user may read their own account.
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    if id != auth.user_id {
        auth.authorize(Action::UserRead)?;
    }
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("User", id))?;
    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

/// PUT /api/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUserRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    auth.authorize(Action::UserManage)?;
    validate(&input)?;
    if let Some(phone) = &input.phone_number {
        validate_phone(phone)?;
    }
    let role_id = match &input.role {
        Some(role) => Some(role_id_for(&state, role).await?),
        None => None,
    };

    let mut tx = state.pool.begin().await?;
    let before = UserRepo::find_by_id(&mut *tx, id)
        .await?
        .map(UserResponse::from)
        .ok_or_else(|| not_found("User", id))?;
    let updated = UserRepo::update(
        &mut *tx,
        id,
        &UpdateUser {
            first_name: input.first_name.map(|v| v.trim().to_string()),
            last_name: input.last_name.map(|v| v.trim().to_string()),
            email: input.email.map(|v| v.trim().to_lowercase()),
            phone_number: input.phone_number.map(|v| v.trim().to_string()),
            role_id,
        },
    )
    .await?
    .map(UserResponse::from)
    .ok_or_else(|| not_found("User", id))?;

    AuditEntry::new(actions::UPDATE, models::USER)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .before(&before)
        .after(&updated)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    auth.authorize(Action::UserManage)?;
    if id == auth.user_id {
        return Err(AppError::BadRequest("You cannot delete your own account".into()));
    }

    let mut tx = state.pool.begin().await?;
    let before = UserRepo::find_by_id(&mut *tx, id)
        .await?
        .map(UserResponse::from)
        .ok_or_else(|| not_found("User", id))?;
    UserRepo::delete(&mut *tx, id).await?;
    AuditEntry::new(actions::DELETE, models::USER)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .before(&before)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/users/{id}/image (multipart `image`)
pub async fn upload_image(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    if id != auth.user_id {
        auth.authorize(Action::UserManage)?;
    }
    let mut form = MultipartForm::read(multipart).await?;
    let file = form
        .take_file("image")
        .ok_or_else(|| AppError::BadRequest("Missing required file 'image'".into()))?;

    if UserRepo::find_by_id(&state.pool, id).await?.is_none() {
        return Err(not_found("User", id));
    }
    let url = store_upload(&state, &file, UploadKind::Image, "users").await?;

    let mut tx = state.pool.begin().await?;
    if !UserRepo::update_image(&mut *tx, id, &url).await? {
        return Err(not_found("User", id));
    }
    AuditEntry::new(actions::UPLOAD, models::USER)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .after(&serde_json::json!({ "imageUrl": url }))
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("User", id))?;
    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

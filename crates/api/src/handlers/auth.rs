//! Handlers for `/auth`: self-registration, login, one-time codes and
//! password management for staff users.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use crewline_core::audit::{actions, models};
use crewline_core::credentials::generate_password;
use crewline_core::email_templates;
use crewline_core::error::CoreError;
use crewline_core::otp::{self, StoredOtp, OTP_TTL_MINUTES};
use crewline_core::roles::ROLE_STAFF;
use crewline_core::validation::{validate, validate_password, validate_phone};
use crewline_db::models::user::{CreateUser, User, UserResponse};
use crewline_db::repositories::{OutboxRepo, RoleRepo, UserRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::audit_trail::AuditEntry;
use crate::auth::jwt::{generate_access_token, SubjectKind, TokenSubject};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::handlers::not_found;
use crate::middleware::auth::{AuthUser, ClientIp};
use crate::response::DataResponse;
use crate::state::AppState;
use crate::storage::UploadKind;
use crate::upload::{store_upload, MultipartForm};

/// Consecutive failed logins before the account is locked.
const MAX_FAILED_ATTEMPTS: i32 = 5;

/// Lock duration after too many failed logins.
const LOCK_DURATION_MINS: i32 = 15;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Fields of the multipart self-registration form.
#[derive(Debug, Validate)]
pub struct RegisterUser {
    #[validate(length(min = 1, max = 100, message = "is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "is required"))]
    pub last_name: String,
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    pub phone_number: String,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OtpRequest {
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerifyRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn hash_error(e: argon2::password_hash::Error) -> AppError {
    AppError::InternalError(format!("Password hashing error: {e}"))
}

// ---------------------------------------------------------------------------
// Registration and login
// ---------------------------------------------------------------------------

/// POST /api/auth/register
///
/// Multipart self-registration as `staff`. Fields: `firstName`, `lastName`,
/// `email`, `phoneNumber`, optional `password` and optional `image` file.
/// When no password is supplied one is generated and emailed; otherwise a
/// verification code is emailed.
pub async fn register(
    State(state): State<AppState>,
    ip: ClientIp,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    let mut form = MultipartForm::read(multipart).await?;
    let input = RegisterUser {
        first_name: form.required("firstName")?,
        last_name: form.required("lastName")?,
        email: form.required("email")?.to_lowercase(),
        phone_number: form.required("phoneNumber")?,
        password: form.text("password"),
    };
    validate(&input)?;
    validate_phone(&input.phone_number)?;
    if let Some(password) = &input.password {
        validate_password(password)?;
    }

    let role = RoleRepo::find_by_name(&state.pool, ROLE_STAFF)
        .await?
        .ok_or_else(|| AppError::InternalError("Role 'staff' is not seeded".into()))?;

    let phone_number = input.phone_number.trim().to_string();
    if let Some(constraint) =
        UserRepo::conflicting_constraint(&state.pool, &input.email, &phone_number).await?
    {
        return Err(AppError::duplicate(&constraint));
    }

    let image_url = match form.take_file("image") {
        Some(file) => Some(store_upload(&state, &file, UploadKind::Image, "users").await?),
        None => None,
    };

    let generated = input.password.is_none();
    let password = input.password.clone().unwrap_or_else(generate_password);
    let password_hash = hash_password(&password).map_err(hash_error)?;

    let mut tx = state.pool.begin().await?;
    let user = UserRepo::create(
        &mut *tx,
        &CreateUser {
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone_number,
            password_hash,
            role_id: role.id,
            image_url,
        },
    )
    .await?;

    let message = if generated {
        email_templates::welcome_credentials(&user.email, &user.first_name, &password)
    } else {
        let code = otp::generate_otp();
        let code_hash = hash_password(&code).map_err(hash_error)?;
        UserRepo::store_otp(&mut *tx, user.id, &code_hash, otp::expiry_from(Utc::now())).await?;
        email_templates::otp_code(&user.email, &code, OTP_TTL_MINUTES)
    };
    OutboxRepo::enqueue(&mut *tx, &message).await?;

    let response = UserResponse::from(user);
    AuditEntry::new(actions::REGISTER, models::USER)
        .record(response.id)
        .by(Some(response.id))
        .ip(&ip)
        .after(&response)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(user_id = response.id, "User registered");
    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ip: ClientIp,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let invalid = || AppError::Core(CoreError::Unauthorized("Invalid email or password".into()));

    let user = UserRepo::find_by_email(&state.pool, &input.email)
        .await?
        .ok_or_else(invalid)?;

    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is temporarily locked. Try again later.".into(),
            )));
        }
    }

    let password_valid = verify_password(&input.password, &user.password_hash).map_err(hash_error)?;
    if !password_valid {
        let (failures, locked_until) = UserRepo::record_failed_login(
            &state.pool,
            user.id,
            MAX_FAILED_ATTEMPTS,
            LOCK_DURATION_MINS,
        )
        .await?;
        if failures >= MAX_FAILED_ATTEMPTS {
            tracing::warn!(user_id = user.id, failures, ?locked_until, "Account locked after failed logins");
        }
        return Err(invalid());
    }

    let mut tx = state.pool.begin().await?;
    UserRepo::record_successful_login(&mut *tx, user.id).await?;
    AuditEntry::new(actions::LOGIN, models::USER)
        .record(user.id)
        .by(Some(user.id))
        .ip(&ip)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    let access_token = generate_access_token(
        TokenSubject {
            id: user.id,
            kind: SubjectKind::User,
            role: &user.role,
            permissions: &user.permissions,
        },
        &state.config.jwt,
    )
    .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    Ok(Json(AuthResponse {
        access_token,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        user: UserResponse::from(user),
    }))
}

// ---------------------------------------------------------------------------
// One-time codes
// ---------------------------------------------------------------------------

/// POST /api/auth/otp/request
///
/// Always answers 200 so the endpoint cannot be used to probe for accounts.
pub async fn request_otp(
    State(state): State<AppState>,
    Json(input): Json<OtpRequest>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    validate(&input)?;

    if let Some(user) = UserRepo::find_by_email(&state.pool, &input.email).await? {
        let code = otp::generate_otp();
        let code_hash = hash_password(&code).map_err(hash_error)?;

        let mut tx = state.pool.begin().await?;
        UserRepo::store_otp(&mut *tx, user.id, &code_hash, otp::expiry_from(Utc::now())).await?;
        OutboxRepo::enqueue(&mut *tx, &email_templates::otp_code(&user.email, &code, OTP_TTL_MINUTES))
            .await?;
        tx.commit().await?;
        tracing::info!(user_id = user.id, "Verification code issued");
    }

    Ok(Json(DataResponse {
        data: MessageResponse {
            message: "If the account exists, a verification code has been sent",
        },
    }))
}

fn invalid_code() -> AppError {
    AppError::Core(CoreError::Validation("Invalid verification code".into()))
}

/// Check `code` against the user's stored code.
///
/// A mismatch is recorded immediately (outside any caller transaction) and
/// discards the code once the attempt limit is reached. On success returns
/// the stored hash, which the caller must consume with a compare-and-clear.
async fn check_otp(state: &AppState, user: &User, code: &str) -> AppResult<String> {
    let stored = StoredOtp {
        hash: user.otp_hash.as_deref(),
        expires_at: user.otp_expires_at,
        attempts: user.otp_attempts,
    };
    let hash = otp::usable_hash(&stored, Utc::now())?;

    let matches = otp::is_well_formed(code) && verify_password(code, hash).map_err(hash_error)?;
    if !matches {
        let attempts = UserRepo::record_otp_failure(&state.pool, user.id).await?;
        tracing::info!(user_id = user.id, attempts, "Verification code mismatch");
        return Err(invalid_code());
    }
    Ok(hash.to_string())
}

async fn find_for_code(state: &AppState, email: &str) -> AppResult<User> {
    UserRepo::find_by_email(&state.pool, email)
        .await?
        .ok_or_else(invalid_code)
}

/// POST /api/auth/otp/verify
///
/// Marks the account's email as verified.
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(input): Json<OtpVerifyRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = find_for_code(&state, &input.email).await?;
    let observed = check_otp(&state, &user, input.otp.trim()).await?;

    let mut tx = state.pool.begin().await?;
    if !UserRepo::consume_otp(&mut *tx, user.id, &observed).await? {
        return Err(invalid_code());
    }
    UserRepo::mark_email_verified(&mut *tx, user.id).await?;
    tx.commit().await?;

    let user = UserRepo::find_by_id(&state.pool, user.id)
        .await?
        .ok_or_else(|| not_found("User", user.id))?;
    tracing::info!(user_id = user.id, "Email verified");
    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

/// POST /api/auth/password/reset
pub async fn reset_password(
    State(state): State<AppState>,
    ip: ClientIp,
    Json(input): Json<PasswordResetRequest>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    validate_password(&input.new_password)?;
    let user = find_for_code(&state, &input.email).await?;
    let observed = check_otp(&state, &user, input.otp.trim()).await?;
    let password_hash = hash_password(&input.new_password).map_err(hash_error)?;

    let mut tx = state.pool.begin().await?;
    if !UserRepo::consume_otp(&mut *tx, user.id, &observed).await? {
        return Err(invalid_code());
    }
    UserRepo::update_password(&mut *tx, user.id, &password_hash).await?;
    AuditEntry::new(actions::PASSWORD_RESET, models::USER)
        .record(user.id)
        .by(Some(user.id))
        .ip(&ip)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(user_id = user.id, "Password reset");
    Ok(Json(DataResponse {
        data: MessageResponse {
            message: "Password has been reset",
        },
    }))
}

// ---------------------------------------------------------------------------
// Current user
// ---------------------------------------------------------------------------

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| not_found("User", auth.user_id))?;
    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

/// PUT /api/auth/password
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    validate_password(&input.new_password)?;
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| not_found("User", auth.user_id))?;

    if !verify_password(&input.current_password, &user.password_hash).map_err(hash_error)? {
        return Err(AppError::Core(CoreError::Validation(
            "Current password is incorrect".into(),
        )));
    }

    let password_hash = hash_password(&input.new_password).map_err(hash_error)?;
    let mut tx = state.pool.begin().await?;
    UserRepo::update_password(&mut *tx, user.id, &password_hash).await?;
    AuditEntry::new(actions::PASSWORD_RESET, models::USER)
        .record(user.id)
        .by(Some(user.id))
        .ip(&ip)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

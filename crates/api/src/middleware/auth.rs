//! JWT-based authentication extractors for Axum handlers.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use crewline_core::error::CoreError;
use crewline_core::types::DbId;

use crate::auth::jwt::{validate_token, Claims, SubjectKind};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated staff user extracted from a Bearer token.
///
/// Client tokens are rejected with 403; use [`AuthClient`] for the client
/// portal routes.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub role: String,
    /// Permission strings of the user's role at token issue time.
    pub permissions: Vec<String>,
}

/// Authenticated external client extracted from a Bearer token.
#[derive(Debug, Clone)]
pub struct AuthClient {
    pub client_id: DbId,
}

fn bearer_claims(parts: &Parts, state: &AppState) -> Result<Claims, AppError> {
    let auth_header = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing Authorization header".into(),
            ))
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized(
            "Invalid Authorization format. Expected: Bearer <token>".into(),
        ))
    })?;

    validate_token(token, &state.config.jwt)
        .map_err(|_| AppError::Core(CoreError::Unauthorized("Invalid or expired token".into())))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state)?;
        if claims.kind != SubjectKind::User {
            return Err(AppError::Core(CoreError::Forbidden(
                "This endpoint requires a staff account".into(),
            )));
        }
        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
            permissions: claims.permissions,
        })
    }
}

impl FromRequestParts<AppState> for AuthClient {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state)?;
        if claims.kind != SubjectKind::Client {
            return Err(AppError::Core(CoreError::Forbidden(
                "This endpoint requires a client account".into(),
            )));
        }
        Ok(AuthClient {
            client_id: claims.sub,
        })
    }
}

/// Best-effort caller address for audit rows, from `X-Forwarded-For` (first
/// hop) or `X-Real-IP`.
#[derive(Debug, Clone, Default)]
pub struct ClientIp(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let ip = header("x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty())
            .or_else(|| header("x-real-ip"));
        Ok(ClientIp(ip))
    }
}

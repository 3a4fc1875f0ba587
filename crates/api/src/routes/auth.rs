//! Route definitions for the `/auth` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /register         -> register (multipart, public)
/// POST /login            -> login (public)
/// POST /otp/request      -> request_otp (public)
/// POST /otp/verify       -> verify_otp (public)
/// POST /password/reset   -> reset_password (public)
/// GET  /me               -> me
/// PUT  /password         -> change_password
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/otp/request", post(auth::request_otp))
        .route("/otp/verify", post(auth::verify_otp))
        .route("/password/reset", post(auth::reset_password))
        .route("/me", get(auth::me))
        .route("/password", put(auth::change_password))
}

pub mod audits;
pub mod auth;
pub mod clients;
pub mod finance;
pub mod health;
pub mod hse;
pub mod leave;
pub mod projects;
pub mod proposals;
pub mod tasks;
pub mod teams;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// /auth/...        staff registration, login, one-time codes
/// /users/...       staff accounts
/// /clients/...     client registration, portal and approval
/// /teams/...       teams and memberships
/// /projects/...    projects, board status, project tasks
/// /tasks/...       tasks
/// /leave/...       leave requests and decisions
/// /proposals/...   proposal workflow
/// /hse/...         incident reports and compliance documents
/// /finance/...     expenses
/// /audits/...      audit log and CSV export
/// ```
///
/// Each resource documents its own sub-routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/clients", clients::router())
        .nest("/teams", teams::router())
        .nest("/projects", projects::router())
        .nest("/tasks", tasks::router())
        .nest("/leave", leave::router())
        .nest("/proposals", proposals::router())
        .nest("/hse", hse::router())
        .nest("/finance", finance::router())
        .nest("/audits", audits::router())
}

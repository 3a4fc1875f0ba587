//! Route definitions for the `/clients` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::clients;
use crate::state::AppState;

/// Routes mounted at `/clients`.
///
/// ```text
/// POST      /register                  -> register_client (multipart, public)
/// POST      /login                     -> login_client (public)
/// GET, PUT  /me                        -> get_me, update_me (client token)
/// PUT       /me/documents              -> resubmit_documents (client token, multipart)
/// GET       /me/projects               -> my_projects (client token)
/// GET       /me/projects/{projectId}   -> my_project (client token)
/// GET       /                          -> list_clients
/// GET       /{id}                      -> get_client
/// PUT       /{id}/approval             -> decide_approval
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(clients::register_client))
        .route("/login", post(clients::login_client))
        .route("/me", get(clients::get_me).put(clients::update_me))
        .route("/me/documents", put(clients::resubmit_documents))
        .route("/me/projects", get(clients::my_projects))
        .route("/me/projects/{project_id}", get(clients::my_project))
        .route("/", get(clients::list_clients))
        .route("/{id}", get(clients::get_client))
        .route("/{id}/approval", put(clients::decide_approval))
}

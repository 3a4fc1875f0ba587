//! Route definitions for the `/projects` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::projects;
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET, POST         /             -> list_projects, create_project
/// GET, PUT, DELETE  /{id}         -> get_project, update_project, delete_project
/// POST, PUT         /{id}/status  -> set_status
/// GET, POST         /{id}/tasks   -> list_tasks, create_task
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(projects::list_projects).post(projects::create_project))
        .route(
            "/{id}",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/{id}/status",
            post(projects::set_status).put(projects::set_status),
        )
        .route(
            "/{id}/tasks",
            get(projects::list_tasks).post(projects::create_task),
        )
}

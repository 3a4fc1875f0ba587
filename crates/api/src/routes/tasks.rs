//! Route definitions for the `/tasks` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET               /mine         -> my_tasks
/// GET, PUT, DELETE  /{id}         -> get_task, update_task, delete_task
/// PUT               /{id}/status  -> set_task_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/mine", get(tasks::my_tasks))
        .route(
            "/{id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/{id}/status", put(tasks::set_task_status))
}

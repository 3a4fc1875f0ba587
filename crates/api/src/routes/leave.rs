//! Route definitions for the `/leave` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::leave;
use crate::state::AppState;

/// Routes mounted at `/leave`.
///
/// ```text
/// GET, POST         /             -> list_leave, create_leave
/// GET, PUT, DELETE  /{id}         -> get_leave, update_leave, delete_leave
/// PUT               /{id}/status  -> decide_leave
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(leave::list_leave).post(leave::create_leave))
        .route(
            "/{id}",
            get(leave::get_leave)
                .put(leave::update_leave)
                .delete(leave::delete_leave),
        )
        .route("/{id}/status", put(leave::decide_leave))
}

//! Route definitions for the `/teams` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::teams;
use crate::state::AppState;

/// Routes mounted at `/teams`.
///
/// ```text
/// GET, POST         /                                  -> list_teams, create_team
/// GET, PUT, DELETE  /{id}                              -> get_team, update_team, delete_team
/// POST              /{id}/members                      -> add_member
/// DELETE            /{id}/members/{userId}             -> remove_member
/// GET               /{id}/projects/{projectId}/members -> project_members
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(teams::list_teams).post(teams::create_team))
        .route(
            "/{id}",
            get(teams::get_team)
                .put(teams::update_team)
                .delete(teams::delete_team),
        )
        .route("/{id}/members", post(teams::add_member))
        .route("/{id}/members/{user_id}", delete(teams::remove_member))
        .route(
            "/{id}/projects/{project_id}/members",
            get(teams::project_members),
        )
}

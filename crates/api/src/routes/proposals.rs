//! Route definitions for the `/proposals` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::proposals;
use crate::state::AppState;

/// Routes mounted at `/proposals`.
///
/// ```text
/// GET, POST         /             -> list_proposals, create_proposal
/// GET, PUT, DELETE  /{id}         -> get_proposal, update_proposal, delete_proposal
/// POST              /{id}/submit  -> submit_proposal
/// PUT               /{id}/status  -> decide_proposal
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(proposals::list_proposals).post(proposals::create_proposal),
        )
        .route(
            "/{id}",
            get(proposals::get_proposal)
                .put(proposals::update_proposal)
                .delete(proposals::delete_proposal),
        )
        .route("/{id}/submit", post(proposals::submit_proposal))
        .route("/{id}/status", put(proposals::decide_proposal))
}

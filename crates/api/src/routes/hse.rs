//! Route definitions for the `/hse` resource.

use axum::routing::{delete, get, put};
use axum::Router;

use crate::handlers::hse;
use crate::state::AppState;

/// Routes mounted at `/hse`.
///
/// ```text
/// GET, POST  /reports              -> list_reports, create_report (multipart)
/// GET        /reports/{id}         -> get_report
/// PUT        /reports/{id}/status  -> set_report_status
/// GET, POST  /documents            -> list_documents, upload_document (multipart)
/// DELETE     /documents/{id}       -> delete_document
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports", get(hse::list_reports).post(hse::create_report))
        .route("/reports/{id}", get(hse::get_report))
        .route("/reports/{id}/status", put(hse::set_report_status))
        .route(
            "/documents",
            get(hse::list_documents).post(hse::upload_document),
        )
        .route("/documents/{id}", delete(hse::delete_document))
}

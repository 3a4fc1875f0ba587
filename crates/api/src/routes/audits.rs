//! Route definitions for the `/audits` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::audits;
use crate::state::AppState;

/// Routes mounted at `/audits`.
///
/// ```text
/// GET /        -> list_audits
/// GET /export  -> export_audits (CSV)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(audits::list_audits))
        .route("/export", get(audits::export_audits))
}

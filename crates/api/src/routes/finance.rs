//! Route definitions for the `/finance` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::finance;
use crate::state::AppState;

/// Routes mounted at `/finance`.
///
/// ```text
/// GET, POST    /expenses        -> list_expenses, create_expense
/// GET, DELETE  /expenses/{id}   -> get_expense, delete_expense
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/expenses",
            get(finance::list_expenses).post(finance::create_expense),
        )
        .route(
            "/expenses/{id}",
            get(finance::get_expense).delete(finance::delete_expense),
        )
}

//! Handlers for `/audits`: paginated listing and CSV export.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crewline_core::audit::{render_csv, CsvRow};
use crewline_core::pagination::{Page, PageRequest};
use crewline_core::policy::Action;
use crewline_core::types::{DbId, Timestamp};
use crewline_db::models::audit::{Audit, AuditFilter};
use crewline_db::repositories::AuditRepo;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::non_empty;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditListParams {
    pub action: Option<String>,
    pub model: Option<String>,
    pub user_id: Option<DbId>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl AuditListParams {
    fn filter(&self) -> AuditFilter {
        AuditFilter {
            action: non_empty(self.action.clone()),
            model: non_empty(self.model.clone()),
            user_id: self.user_id,
            from: self.from,
            to: self.to,
        }
    }
}

/// GET /api/audits?action=&model=&userId=&from=&to=&page=&limit=
pub async fn list_audits(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<AuditListParams>,
) -> AppResult<Json<Page<Audit>>> {
    auth.authorize(Action::AuditView)?;
    let page = PageRequest::new(params.page, params.limit);
    let (audits, total) = AuditRepo::list(&state.pool, &params.filter(), page).await?;
    Ok(Json(Page::new(audits, page, total)))
}

/// GET /api/audits/export (same filters, no pagination)
pub async fn export_audits(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<AuditListParams>,
) -> AppResult<Response> {
    auth.authorize(Action::AuditView)?;
    let audits = AuditRepo::export(&state.pool, &params.filter()).await?;
    let csv = render_csv(audits.iter().map(|a| CsvRow {
        id: a.id,
        action: &a.action,
        model: &a.model,
        record_id: a.record_id,
        user_email: a.user_email.as_deref(),
        ip_address: a.ip_address.as_deref(),
        created_at: a.created_at,
    }));

    tracing::info!(rows = audits.len(), user_id = auth.user_id, "Audit log exported");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"audit-logs.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

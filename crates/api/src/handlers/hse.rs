//! Handlers for `/hse`: incident reports and compliance documents.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use crewline_core::audit::{actions, models};
use crewline_core::email_templates::{self, EmailMessage};
use crewline_core::error::CoreError;
use crewline_core::hse::{HseReportStatus, Severity, DOCUMENT_CATEGORIES, HSE_REPORT_TRANSITIONS};
use crewline_core::pagination::{Page, PageRequest};
use crewline_core::policy::Action;
use crewline_core::roles::{ROLE_MANAGER, SUPERVISORS};
use crewline_core::types::{Date, DbId};
use crewline_core::workflow::TransitionContext;
use crewline_db::models::hse::{
    CreateHseDocument, CreateHseReport, HseDocument, HseReport, HseReportFilter,
};
use crewline_db::repositories::{HseDocumentRepo, HseReportRepo, OutboxRepo, UserRepo};
use crewline_db::retry::with_retry;
use serde::Deserialize;

use crate::audit_trail::AuditEntry;
use crate::error::{AppError, AppResult};
use crate::handlers::not_found;
use crate::middleware::auth::{AuthUser, ClientIp};
use crate::query::non_empty;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::storage::UploadKind;
use crate::upload::{store_upload, MultipartForm};

#[derive(Debug, Deserialize)]
pub struct ReportListParams {
    pub status: Option<HseReportStatus>,
    pub severity: Option<Severity>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReportStatusRequest {
    pub status: HseReportStatus,
}

#[derive(Debug, Deserialize)]
pub struct DocumentListParams {
    pub category: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Recipients of the new-report notice: managers always, admins as well
/// when the severity calls for escalation.
fn report_recipient_roles(severity: Severity) -> &'static [&'static str] {
    if severity.requires_escalation() {
        SUPERVISORS
    } else {
        &[ROLE_MANAGER]
    }
}

// ---------------------------------------------------------------------------
// Incident reports
// ---------------------------------------------------------------------------

/// GET /api/hse/reports?status=&severity=&page=&limit=
pub async fn list_reports(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<ReportListParams>,
) -> AppResult<Json<Page<HseReport>>> {
    auth.authorize(Action::HseReportView)?;
    let page = PageRequest::new(params.page, params.limit);
    let filter = HseReportFilter {
        status: params.status,
        severity: params.severity,
    };
    let (reports, total) = HseReportRepo::list(&state.pool, &filter, page).await?;
    Ok(Json(Page::new(reports, page, total)))
}

/// POST /api/hse/reports
///
/// Multipart fields: `title`, `description`, `severity`, `incidentDate`,
/// optional `location` and optional `attachment` file.
pub async fn create_report(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<HseReport>>)> {
    auth.authorize(Action::HseReportCreate)?;
    let mut form = MultipartForm::read(multipart).await?;
    let title = form.required("title")?;
    let description = form.required("description")?;
    let severity: Severity = form
        .parsed("severity")?
        .ok_or_else(|| AppError::BadRequest("Missing required field 'severity'".into()))?;
    let incident_date: Date = form
        .parsed("incidentDate")?
        .ok_or_else(|| AppError::BadRequest("Missing required field 'incidentDate'".into()))?;
    let location = form.text("location");

    let attachment_url = match form.take_file("attachment") {
        Some(file) => Some(store_upload(&state, &file, UploadKind::Document, "hse/reports").await?),
        None => None,
    };

    let mut tx = state.pool.begin().await?;
    let report = HseReportRepo::create(
        &mut *tx,
        &CreateHseReport {
            reported_by: auth.user_id,
            title,
            description,
            severity,
            location,
            incident_date,
            attachment_url,
        },
    )
    .await?;

    let reporter = UserRepo::find_by_id(&mut *tx, auth.user_id)
        .await?
        .ok_or_else(|| not_found("User", auth.user_id))?;
    let recipients = UserRepo::emails_with_roles(&mut *tx, report_recipient_roles(severity)).await?;
    let messages: Vec<EmailMessage> = recipients
        .iter()
        .map(|to| {
            email_templates::hse_escalation(
                to,
                &report.title,
                report.severity.as_str(),
                report.location.as_deref(),
                &reporter.full_name(),
            )
        })
        .collect();
    OutboxRepo::enqueue_all(&mut tx, &messages).await?;

    AuditEntry::new(actions::CREATE, models::HSE_REPORT)
        .record(report.id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .after(&report)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(report_id = report.id, severity = %report.severity, "HSE report filed");
    Ok((StatusCode::CREATED, Json(DataResponse { data: report })))
}

/// GET /api/hse/reports/{id}
///
/// Reporters may always read their own report.
pub async fn get_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<HseReport>>> {
    auth.authorize(Action::HseReportCreate)?;
    let report = HseReportRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("HseReport", id))?;
    if report.reported_by != auth.user_id && !auth.can(Action::HseReportView) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Not permitted to view this report".into(),
        )));
    }
    Ok(Json(DataResponse { data: report }))
}

/// PUT /api/hse/reports/{id}/status
pub async fn set_report_status(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
    Json(input): Json<ReportStatusRequest>,
) -> AppResult<Json<DataResponse<HseReport>>> {
    auth.authorize(Action::HseReportManage)?;
    let report = with_retry(|| transition_report(&state, &auth, &ip, id, input.status)).await?;
    Ok(Json(DataResponse { data: report }))
}

async fn transition_report(
    state: &AppState,
    auth: &AuthUser,
    ip: &ClientIp,
    id: DbId,
    target: HseReportStatus,
) -> AppResult<HseReport> {
    let mut tx = state.pool.begin().await?;
    let report = HseReportRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found("HseReport", id))?;
    HSE_REPORT_TRANSITIONS.check(report.status, target, &TransitionContext::role_only(&auth.role))?;

    let updated = HseReportRepo::set_status(&mut *tx, id, report.status, target)
        .await?
        .ok_or_else(|| AppError::concurrent_modification("HseReport"))?;
    AuditEntry::new(actions::STATUS_CHANGE, models::HSE_REPORT)
        .record(id)
        .by(Some(auth.user_id))
        .ip(ip)
        .before(&report)
        .after(&updated)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(updated)
}

// ---------------------------------------------------------------------------
// Compliance documents
// ---------------------------------------------------------------------------

/// GET /api/hse/documents?category=&page=&limit=
pub async fn list_documents(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<DocumentListParams>,
) -> AppResult<Json<Page<HseDocument>>> {
    auth.authorize(Action::HseDocumentView)?;
    let page = PageRequest::new(params.page, params.limit);
    let category = non_empty(params.category);
    let (documents, total) = HseDocumentRepo::list(&state.pool, category.as_deref(), page).await?;
    Ok(Json(Page::new(documents, page, total)))
}

/// POST /api/hse/documents
///
/// Multipart fields: `title`, `category`, `file`.
pub async fn upload_document(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<HseDocument>>)> {
    auth.authorize(Action::HseDocumentManage)?;
    let mut form = MultipartForm::read(multipart).await?;
    let title = form.required("title")?;
    let category = form.required("category")?.to_lowercase();
    if !DOCUMENT_CATEGORIES.contains(&category.as_str()) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Invalid category '{category}'. Must be one of: {}",
            DOCUMENT_CATEGORIES.join(", ")
        ))));
    }
    let file = form
        .take_file("file")
        .ok_or_else(|| AppError::BadRequest("Missing required file 'file'".into()))?;
    let file_url = store_upload(&state, &file, UploadKind::Document, "hse/documents").await?;

    let mut tx = state.pool.begin().await?;
    let document = HseDocumentRepo::create(
        &mut *tx,
        &CreateHseDocument {
            title,
            category,
            file_url,
            uploaded_by: auth.user_id,
        },
    )
    .await?;
    AuditEntry::new(actions::UPLOAD, models::HSE_DOCUMENT)
        .record(document.id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .after(&document)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: document })))
}

/// DELETE /api/hse/documents/{id}
pub async fn delete_document(
    State(state): State<AppState>,
    auth: AuthUser,
    ip: ClientIp,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    auth.authorize(Action::HseDocumentManage)?;

    let mut tx = state.pool.begin().await?;
    let before = HseDocumentRepo::find_by_id(&mut *tx, id)
        .await?
        .ok_or_else(|| not_found("HseDocument", id))?;
    HseDocumentRepo::delete(&mut *tx, id).await?;
    AuditEntry::new(actions::DELETE, models::HSE_DOCUMENT)
        .record(id)
        .by(Some(auth.user_id))
        .ip(&ip)
        .before(&before)
        .write(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewline_core::roles::ROLE_ADMIN;

    #[test]
    fn escalation_reaches_admins() {
        assert!(report_recipient_roles(Severity::Critical).contains(&ROLE_ADMIN));
        assert!(report_recipient_roles(Severity::High).contains(&ROLE_ADMIN));
        assert_eq!(report_recipient_roles(Severity::Low), &[ROLE_MANAGER]);
    }
}

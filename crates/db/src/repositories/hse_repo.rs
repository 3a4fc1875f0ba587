//! Repositories for `hse_reports` and `hse_documents`.

use crewline_core::hse::HseReportStatus;
use crewline_core::pagination::PageRequest;
use crewline_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::filter::{BindValue, Filter};
use crate::models::hse::{CreateHseDocument, CreateHseReport, HseDocument, HseReport, HseReportFilter};

const REPORT_COLUMNS: &str = "id, reported_by, title, description, severity, location, \
    incident_date, status, attachment_url, created_at, updated_at";

const DOCUMENT_COLUMNS: &str = "id, title, category, file_url, uploaded_by, created_at";

// ---------------------------------------------------------------------------
// Incident reports
// ---------------------------------------------------------------------------

pub struct HseReportRepo;

impl HseReportRepo {
    pub async fn create(db: impl PgExecutor<'_>, input: &CreateHseReport) -> Result<HseReport, sqlx::Error> {
        let query = format!(
            "INSERT INTO hse_reports
                (reported_by, title, description, severity, location, incident_date, attachment_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {REPORT_COLUMNS}"
        );
        sqlx::query_as::<_, HseReport>(&query)
            .bind(input.reported_by)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.severity.as_str())
            .bind(&input.location)
            .bind(input.incident_date)
            .bind(&input.attachment_url)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(db: impl PgExecutor<'_>, id: DbId) -> Result<Option<HseReport>, sqlx::Error> {
        let query = format!("SELECT {REPORT_COLUMNS} FROM hse_reports WHERE id = $1");
        sqlx::query_as::<_, HseReport>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        params: &HseReportFilter,
        page: PageRequest,
    ) -> Result<(Vec<HseReport>, i64), sqlx::Error> {
        let mut filter = Filter::new();
        if let Some(status) = params.status {
            filter.eq("status", BindValue::Text(status.as_str().into()));
        }
        if let Some(severity) = params.severity {
            filter.eq("severity", BindValue::Text(severity.as_str().into()));
        }
        filter
            .fetch_page(pool, REPORT_COLUMNS, "hse_reports", "incident_date DESC, id DESC", page)
            .await
    }

    /// Compare-and-set status change.
    pub async fn set_status(
        db: impl PgExecutor<'_>,
        id: DbId,
        observed: HseReportStatus,
        target: HseReportStatus,
    ) -> Result<Option<HseReport>, sqlx::Error> {
        let query = format!(
            "UPDATE hse_reports SET status = $3 WHERE id = $1 AND status = $2 RETURNING {REPORT_COLUMNS}"
        );
        sqlx::query_as::<_, HseReport>(&query)
            .bind(id)
            .bind(observed.as_str())
            .bind(target.as_str())
            .fetch_optional(db)
            .await
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

pub struct HseDocumentRepo;

impl HseDocumentRepo {
    pub async fn create(db: impl PgExecutor<'_>, input: &CreateHseDocument) -> Result<HseDocument, sqlx::Error> {
        let query = format!(
            "INSERT INTO hse_documents (title, category, file_url, uploaded_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {DOCUMENT_COLUMNS}"
        );
        sqlx::query_as::<_, HseDocument>(&query)
            .bind(&input.title)
            .bind(&input.category)
            .bind(&input.file_url)
            .bind(input.uploaded_by)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(db: impl PgExecutor<'_>, id: DbId) -> Result<Option<HseDocument>, sqlx::Error> {
        let query = format!("SELECT {DOCUMENT_COLUMNS} FROM hse_documents WHERE id = $1");
        sqlx::query_as::<_, HseDocument>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        category: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<HseDocument>, i64), sqlx::Error> {
        let mut filter = Filter::new();
        if let Some(category) = category {
            filter.eq("category", BindValue::Text(category.to_string()));
        }
        filter
            .fetch_page(pool, DOCUMENT_COLUMNS, "hse_documents", "created_at DESC, id DESC", page)
            .await
    }

    pub async fn delete(db: impl PgExecutor<'_>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM hse_documents WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

//! HSE incident reports and compliance documents.

use crewline_core::hse::{HseReportStatus, Severity};
use crewline_core::types::{Date, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HseReport {
    pub id: DbId,
    pub reported_by: DbId,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub severity: Severity,
    pub location: Option<String>,
    pub incident_date: Date,
    #[sqlx(try_from = "String")]
    pub status: HseReportStatus,
    pub attachment_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateHseReport {
    pub reported_by: DbId,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub location: Option<String>,
    pub incident_date: Date,
    pub attachment_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HseReportFilter {
    pub status: Option<HseReportStatus>,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HseDocument {
    pub id: DbId,
    pub title: String,
    pub category: String,
    pub file_url: String,
    pub uploaded_by: Option<DbId>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateHseDocument {
    pub title: String,
    pub category: String,
    pub file_url: String,
    pub uploaded_by: DbId,
}

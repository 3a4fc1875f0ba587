//! Audit trail rows. Immutable once written (no `updated_at`).

use crewline_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// An audit row joined with the acting user's email.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub id: DbId,
    pub action: String,
    pub model: String,
    pub record_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub user_email: Option<String>,
    pub ip_address: Option<String>,
    pub before_json: Option<serde_json::Value>,
    pub after_json: Option<serde_json::Value>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateAudit {
    pub action: &'static str,
    pub model: &'static str,
    pub record_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub ip_address: Option<String>,
    pub before_json: Option<serde_json::Value>,
    pub after_json: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub action: Option<String>,
    pub model: Option<String>,
    pub user_id: Option<DbId>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

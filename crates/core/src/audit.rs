//! Audit trail constants, redaction and CSV rendering.
//!
//! Audit rows are append-only. Every mutating handler writes one inside the
//! same transaction as the mutation it describes.

use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Action constants
// ---------------------------------------------------------------------------

/// Known values for the `action` column.
pub mod actions {
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
    pub const STATUS_CHANGE: &str = "status_change";
    pub const SUBMIT: &str = "submit";
    pub const APPROVE: &str = "approve";
    pub const REJECT: &str = "reject";
    pub const LOGIN: &str = "login";
    pub const REGISTER: &str = "register";
    pub const PASSWORD_RESET: &str = "password_reset";
    pub const UPLOAD: &str = "upload";
}

/// Known values for the `model` column.
pub mod models {
    pub const USER: &str = "User";
    pub const CLIENT: &str = "Client";
    pub const TEAM: &str = "Team";
    pub const PROJECT: &str = "Project";
    pub const TASK: &str = "Task";
    pub const LEAVE: &str = "Leave";
    pub const PROPOSAL: &str = "Proposal";
    pub const HSE_REPORT: &str = "HseReport";
    pub const HSE_DOCUMENT: &str = "HseDocument";
    pub const FINANCE_EXPENSE: &str = "FinanceExpense";
}

// ---------------------------------------------------------------------------
// Sensitive field redaction
// ---------------------------------------------------------------------------

/// Keys whose values never reach the `before_json` / `after_json` columns.
pub const SENSITIVE_FIELDS: &[&str] = &["password", "otp", "token", "secret"];

/// Replace the value of every key containing a [`SENSITIVE_FIELDS`] entry
/// with `"[REDACTED]"`, recursively.
pub fn redact_sensitive_fields(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let redacted = map
                .iter()
                .map(|(key, val)| {
                    let lower = key.to_lowercase();
                    if SENSITIVE_FIELDS.iter().any(|f| lower.contains(f)) {
                        (key.clone(), serde_json::Value::String("[REDACTED]".into()))
                    } else {
                        (key.clone(), redact_sensitive_fields(val))
                    }
                })
                .collect();
            serde_json::Value::Object(redacted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(redact_sensitive_fields).collect())
        }
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

/// Fixed header of the audit CSV export.
pub const CSV_HEADER: &str = "id,action,model,recordId,user.email,ipAddress,createdAt";

/// One exported audit line.
#[derive(Debug, Clone)]
pub struct CsvRow<'a> {
    pub id: DbId,
    pub action: &'a str,
    pub model: &'a str,
    pub record_id: Option<DbId>,
    pub user_email: Option<&'a str>,
    pub ip_address: Option<&'a str>,
    pub created_at: Timestamp,
}

/// Quote a field per RFC 4180 when it contains a delimiter, quote or line
/// break. Embedded quotes are doubled.
pub fn csv_escape(field: &str) -> std::borrow::Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        std::borrow::Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        std::borrow::Cow::Borrowed(field)
    }
}

/// Render a complete CSV document (header plus one CRLF-terminated line per
/// row). Missing optional values become empty fields.
pub fn render_csv<'a>(rows: impl IntoIterator<Item = CsvRow<'a>>) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push_str("\r\n");
    for row in rows {
        let record_id = row.record_id.map(|id| id.to_string()).unwrap_or_default();
        let fields = [
            row.id.to_string(),
            csv_escape(row.action).into_owned(),
            csv_escape(row.model).into_owned(),
            record_id,
            csv_escape(row.user_email.unwrap_or("")).into_owned(),
            csv_escape(row.ip_address.unwrap_or("")).into_owned(),
            row.created_at.to_rfc3339(),
        ];
        out.push_str(&fields.join(","));
        out.push_str("\r\n");
    }
    out
}

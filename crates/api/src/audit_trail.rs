//! Builder for audit rows written by mutating handlers.
//!
//! Snapshots are serialized from the response types and pass through
//! [`redact_sensitive_fields`] before they are stored.

use crewline_core::audit::redact_sensitive_fields;
use crewline_core::types::DbId;
use crewline_db::models::audit::CreateAudit;
use crewline_db::repositories::AuditRepo;
use serde::Serialize;
use sqlx::PgExecutor;

use crate::error::AppResult;
use crate::middleware::auth::ClientIp;

#[derive(Debug, Clone)]
pub struct AuditEntry {
    inner: CreateAudit,
}

fn snapshot<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value)
        .ok()
        .map(|v| redact_sensitive_fields(&v))
}

impl AuditEntry {
    /// `action` and `model` come from [`crewline_core::audit::actions`] and
    /// [`crewline_core::audit::models`].
    pub fn new(action: &'static str, model: &'static str) -> Self {
        Self {
            inner: CreateAudit {
                action,
                model,
                record_id: None,
                user_id: None,
                ip_address: None,
                before_json: None,
                after_json: None,
            },
        }
    }

    pub fn record(mut self, id: DbId) -> Self {
        self.inner.record_id = Some(id);
        self
    }

    pub fn by(mut self, user_id: Option<DbId>) -> Self {
        self.inner.user_id = user_id;
        self
    }

    pub fn ip(mut self, ip: &ClientIp) -> Self {
        self.inner.ip_address = ip.0.clone();
        self
    }

    pub fn before<T: Serialize>(mut self, value: &T) -> Self {
        self.inner.before_json = snapshot(value);
        self
    }

    pub fn after<T: Serialize>(mut self, value: &T) -> Self {
        self.inner.after_json = snapshot(value);
        self
    }

    pub async fn write(self, db: impl PgExecutor<'_>) -> AppResult<()> {
        AuditRepo::record(db, &self.inner).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crewline_core::audit::{actions, models};
    use serde_json::json;

    use super::*;

    #[test]
    fn snapshots_are_redacted() {
        let entry = AuditEntry::new(actions::UPDATE, models::USER)
            .record(3)
            .by(Some(1))
            .after(&json!({"email": "a@example.com", "password": "hunter22"}));

        let after = entry.inner.after_json.unwrap();
        assert_eq!(after["email"], "a@example.com");
        assert_ne!(after["password"], "hunter22");
        assert_eq!(entry.inner.record_id, Some(3));
        assert_eq!(entry.inner.user_id, Some(1));
    }

    #[test]
    fn ip_is_copied() {
        let entry = AuditEntry::new(actions::LOGIN, models::USER)
            .ip(&ClientIp(Some("10.0.0.1".into())));
        assert_eq!(entry.inner.ip_address.as_deref(), Some("10.0.0.1"));
    }
}

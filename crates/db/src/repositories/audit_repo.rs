//! Repository for the append-only `audits` table.

use crewline_core::pagination::PageRequest;
use sqlx::{PgExecutor, PgPool};

use crate::filter::{BindValue, Filter};
use crate::models::audit::{Audit, AuditFilter, CreateAudit};

const COLUMNS: &str = "a.id, a.action, a.model, a.record_id, a.user_id, u.email AS user_email, \
    a.ip_address, a.before_json, a.after_json, a.created_at";

const FROM: &str = "audits a LEFT JOIN users u ON u.id = a.user_id";

/// Upper bound on rows returned by a single CSV export.
pub const EXPORT_LIMIT: i64 = 50_000;

pub struct AuditRepo;

impl AuditRepo {
    /// Append one audit row.
    pub async fn record(db: impl PgExecutor<'_>, entry: &CreateAudit) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO audits (action, model, record_id, user_id, ip_address, before_json, after_json)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.action)
        .bind(entry.model)
        .bind(entry.record_id)
        .bind(entry.user_id)
        .bind(&entry.ip_address)
        .bind(&entry.before_json)
        .bind(&entry.after_json)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn list(
        pool: &PgPool,
        params: &AuditFilter,
        page: PageRequest,
    ) -> Result<(Vec<Audit>, i64), sqlx::Error> {
        build_filter(params)
            .fetch_page(pool, COLUMNS, FROM, "a.created_at DESC, a.id DESC", page)
            .await
    }

    /// All rows matching the filter, oldest first, capped at
    /// [`EXPORT_LIMIT`].
    pub async fn export(pool: &PgPool, params: &AuditFilter) -> Result<Vec<Audit>, sqlx::Error> {
        let filter = build_filter(params);
        let query = format!(
            "SELECT {COLUMNS} FROM {FROM} {} ORDER BY a.created_at ASC, a.id ASC LIMIT {EXPORT_LIMIT}",
            filter.where_clause()
        );
        filter
            .bind_as(sqlx::query_as::<_, Audit>(&query))
            .fetch_all(pool)
            .await
    }
}

fn build_filter(params: &AuditFilter) -> Filter {
    let mut filter = Filter::new();
    if let Some(action) = &params.action {
        filter.eq("a.action", BindValue::Text(action.clone()));
    }
    if let Some(model) = &params.model {
        filter.eq("a.model", BindValue::Text(model.clone()));
    }
    if let Some(user_id) = params.user_id {
        filter.eq("a.user_id", BindValue::BigInt(user_id));
    }
    if let Some(from) = params.from {
        filter.cmp("a.created_at", ">=", BindValue::Timestamp(from));
    }
    if let Some(to) = params.to {
        filter.cmp("a.created_at", "<=", BindValue::Timestamp(to));
    }
    filter
}

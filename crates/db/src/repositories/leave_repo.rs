//! Repository for the `leaves` table.
//!
//! Every mutation after creation is conditional on the request still being
//! `pending`; a `None` / `false` result means the row was decided (or
//! removed) by a concurrent request.

use crewline_core::leave::LeaveStatus;
use crewline_core::pagination::PageRequest;
use crewline_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::filter::{BindValue, Filter};
use crate::models::leave::{CreateLeave, Leave, LeaveDecision, LeaveFilter, UpdateLeave};

const COLUMNS: &str = "id, user_id, leave_type, start_date, end_date, reason, status, \
    decided_by, decided_at, decision_note, created_at, updated_at";

pub struct LeaveRepo;

impl LeaveRepo {
    pub async fn create(db: impl PgExecutor<'_>, input: &CreateLeave) -> Result<Leave, sqlx::Error> {
        let query = format!(
            "INSERT INTO leaves (user_id, leave_type, start_date, end_date, reason)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Leave>(&query)
            .bind(input.user_id)
            .bind(&input.leave_type)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(&input.reason)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(db: impl PgExecutor<'_>, id: DbId) -> Result<Option<Leave>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM leaves WHERE id = $1");
        sqlx::query_as::<_, Leave>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        params: &LeaveFilter,
        page: PageRequest,
    ) -> Result<(Vec<Leave>, i64), sqlx::Error> {
        let mut filter = Filter::new();
        if let Some(user_id) = params.user_id {
            filter.eq("user_id", BindValue::BigInt(user_id));
        }
        if let Some(status) = params.status {
            filter.eq("status", BindValue::Text(status.as_str().into()));
        }
        filter
            .fetch_page(pool, COLUMNS, "leaves", "start_date DESC, id DESC", page)
            .await
    }

    /// Apply field edits while the request is still `pending`.
    pub async fn update_pending(
        db: impl PgExecutor<'_>,
        id: DbId,
        input: &UpdateLeave,
    ) -> Result<Option<Leave>, sqlx::Error> {
        let query = format!(
            "UPDATE leaves SET
                leave_type = COALESCE($2, leave_type),
                start_date = COALESCE($3, start_date),
                end_date = COALESCE($4, end_date),
                reason = COALESCE($5, reason)
             WHERE id = $1 AND status = $6
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Leave>(&query)
            .bind(id)
            .bind(&input.leave_type)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(&input.reason)
            .bind(LeaveStatus::Pending.as_str())
            .fetch_optional(db)
            .await
    }

    /// Record a decision on a `pending` request.
    pub async fn decide(
        db: impl PgExecutor<'_>,
        id: DbId,
        decision: &LeaveDecision,
    ) -> Result<Option<Leave>, sqlx::Error> {
        let query = format!(
            "UPDATE leaves SET
                status = $2,
                decided_by = $3,
                decided_at = NOW(),
                decision_note = $4
             WHERE id = $1 AND status = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Leave>(&query)
            .bind(id)
            .bind(decision.status.as_str())
            .bind(decision.decided_by)
            .bind(&decision.note)
            .bind(LeaveStatus::Pending.as_str())
            .fetch_optional(db)
            .await
    }

    /// Delete a request that is still `pending`.
    pub async fn delete_pending(db: impl PgExecutor<'_>, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM leaves WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(LeaveStatus::Pending.as_str())
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

//! Repository for the `proposals` table.

use crewline_core::pagination::PageRequest;
use crewline_core::proposal::ProposalStatus;
use crewline_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::filter::{BindValue, Filter};
use crate::models::proposal::{CreateProposal, Proposal, ProposalFilter, UpdateProposal};

const COLUMNS: &str = "id, title, description, value, client_id, submitted_by, status, \
    submitted_at, approved_by, approved_at, decision_note, created_at, updated_at";

pub struct ProposalRepo;

impl ProposalRepo {
    /// Insert a new proposal in `Draft`.
    pub async fn create(db: impl PgExecutor<'_>, input: &CreateProposal) -> Result<Proposal, sqlx::Error> {
        let query = format!(
            "INSERT INTO proposals (title, description, value, client_id, submitted_by)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Proposal>(&query)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.value)
            .bind(input.client_id)
            .bind(input.submitted_by)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(db: impl PgExecutor<'_>, id: DbId) -> Result<Option<Proposal>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM proposals WHERE id = $1");
        sqlx::query_as::<_, Proposal>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        params: &ProposalFilter,
        page: PageRequest,
    ) -> Result<(Vec<Proposal>, i64), sqlx::Error> {
        let mut filter = Filter::new();
        if let Some(submitted_by) = params.submitted_by {
            filter.eq("submitted_by", BindValue::BigInt(submitted_by));
        }
        if let Some(status) = params.status {
            filter.eq("status", BindValue::Text(status.as_str().into()));
        }
        filter
            .fetch_page(pool, COLUMNS, "proposals", "created_at DESC, id DESC", page)
            .await
    }

    /// Apply field edits while the proposal is still a `Draft`.
    pub async fn update_draft(
        db: impl PgExecutor<'_>,
        id: DbId,
        input: &UpdateProposal,
    ) -> Result<Option<Proposal>, sqlx::Error> {
        let query = format!(
            "UPDATE proposals SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                value = COALESCE($4, value),
                client_id = COALESCE($5, client_id)
             WHERE id = $1 AND status = $6
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Proposal>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.value)
            .bind(input.client_id)
            .bind(ProposalStatus::Draft.as_str())
            .fetch_optional(db)
            .await
    }

    /// `Draft -> Submitted`, stamping `submitted_at`. All other fields are
    /// left untouched.
    pub async fn submit(db: impl PgExecutor<'_>, id: DbId) -> Result<Option<Proposal>, sqlx::Error> {
        let query = format!(
            "UPDATE proposals SET status = $2, submitted_at = NOW()
             WHERE id = $1 AND status = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Proposal>(&query)
            .bind(id)
            .bind(ProposalStatus::Submitted.as_str())
            .bind(ProposalStatus::Draft.as_str())
            .fetch_optional(db)
            .await
    }

    /// `Submitted -> decision`, recording the decider.
    pub async fn decide(
        db: impl PgExecutor<'_>,
        id: DbId,
        decision: ProposalStatus,
        decided_by: DbId,
        note: Option<&str>,
    ) -> Result<Option<Proposal>, sqlx::Error> {
        let query = format!(
            "UPDATE proposals SET
                status = $2,
                approved_by = $3,
                approved_at = NOW(),
                decision_note = $4
             WHERE id = $1 AND status = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Proposal>(&query)
            .bind(id)
            .bind(decision.as_str())
            .bind(decided_by)
            .bind(note)
            .bind(ProposalStatus::Submitted.as_str())
            .fetch_optional(db)
            .await
    }

    /// Delete the proposal if its status is one of `allowed`.
    pub async fn delete_in_states(
        db: impl PgExecutor<'_>,
        id: DbId,
        allowed: &[ProposalStatus],
    ) -> Result<bool, sqlx::Error> {
        let allowed: Vec<&str> = allowed.iter().map(|s| s.as_str()).collect();
        let result = sqlx::query("DELETE FROM proposals WHERE id = $1 AND status = ANY($2)")
            .bind(id)
            .bind(&allowed)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

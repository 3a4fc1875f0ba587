//! Repository for the `clients` table.

use crewline_core::client::ApprovalStatus;
use crewline_core::pagination::PageRequest;
use crewline_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::filter::{BindValue, Filter};
use crate::models::client::{Client, CreateClient, UpdateClientProfile};

const COLUMNS: &str = "id, company_name, contact_name, email, phone_number, password_hash, \
    approval_status, document_url, rejection_reason, approved_by, approved_at, \
    created_at, updated_at";

pub struct ClientRepo;

impl ClientRepo {
    /// Insert a self-registered client. New clients start `pending`.
    pub async fn create(db: impl PgExecutor<'_>, input: &CreateClient) -> Result<Client, sqlx::Error> {
        let query = format!(
            "INSERT INTO clients (company_name, contact_name, email, phone_number, password_hash, document_url)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Client>(&query)
            .bind(&input.company_name)
            .bind(&input.contact_name)
            .bind(&input.email)
            .bind(&input.phone_number)
            .bind(&input.password_hash)
            .bind(&input.document_url)
            .fetch_one(db)
            .await
    }

    pub async fn find_by_id(db: impl PgExecutor<'_>, id: DbId) -> Result<Option<Client>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM clients WHERE id = $1");
        sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_email(
        db: impl PgExecutor<'_>,
        email: &str,
    ) -> Result<Option<Client>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM clients WHERE LOWER(email) = LOWER($1)");
        sqlx::query_as::<_, Client>(&query)
            .bind(email)
            .fetch_optional(db)
            .await
    }

    /// Name of the unique constraint an insert with this email and phone
    /// would violate.
    pub async fn conflicting_constraint(
        db: impl PgExecutor<'_>,
        email: &str,
        phone_number: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<String>>(
            "SELECT CASE
                WHEN EXISTS (SELECT 1 FROM clients WHERE email = $1) THEN 'uq_clients_email'
                WHEN EXISTS (SELECT 1 FROM clients WHERE phone_number = $2) THEN 'uq_clients_phone'
             END",
        )
        .bind(email)
        .bind(phone_number)
        .fetch_one(db)
        .await
    }

    pub async fn list(
        pool: &PgPool,
        approval_status: Option<ApprovalStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Client>, i64), sqlx::Error> {
        let mut filter = Filter::new();
        if let Some(status) = approval_status {
            filter.eq("approval_status", BindValue::Text(status.as_str().into()));
        }
        filter
            .fetch_page(pool, COLUMNS, "clients", "created_at DESC, id DESC", page)
            .await
    }

    pub async fn update_profile(
        db: impl PgExecutor<'_>,
        id: DbId,
        input: &UpdateClientProfile,
    ) -> Result<Option<Client>, sqlx::Error> {
        let query = format!(
            "UPDATE clients SET
                company_name = COALESCE($2, company_name),
                contact_name = COALESCE($3, contact_name),
                phone_number = COALESCE($4, phone_number)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .bind(&input.company_name)
            .bind(&input.contact_name)
            .bind(&input.phone_number)
            .fetch_optional(db)
            .await
    }

    /// Record an approval decision, but only if the client is still in the
    /// `observed` state. Returns `None` when the row changed concurrently.
    pub async fn decide(
        db: impl PgExecutor<'_>,
        id: DbId,
        observed: ApprovalStatus,
        decision: ApprovalStatus,
        decided_by: DbId,
        rejection_reason: Option<&str>,
    ) -> Result<Option<Client>, sqlx::Error> {
        let query = format!(
            "UPDATE clients SET
                approval_status = $3,
                approved_by = $4,
                approved_at = NOW(),
                rejection_reason = $5
             WHERE id = $1 AND approval_status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .bind(observed.as_str())
            .bind(decision.as_str())
            .bind(decided_by)
            .bind(rejection_reason)
            .fetch_optional(db)
            .await
    }

    /// Replace the registration document and put the client back into
    /// `pending`, clearing the previous decision. Compare-and-set on
    /// `observed`.
    pub async fn resubmit_documents(
        db: impl PgExecutor<'_>,
        id: DbId,
        observed: ApprovalStatus,
        document_url: &str,
    ) -> Result<Option<Client>, sqlx::Error> {
        let query = format!(
            "UPDATE clients SET
                approval_status = 'pending',
                document_url = $3,
                rejection_reason = NULL,
                approved_by = NULL,
                approved_at = NULL
             WHERE id = $1 AND approval_status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .bind(observed.as_str())
            .bind(document_url)
            .fetch_optional(db)
            .await
    }
}

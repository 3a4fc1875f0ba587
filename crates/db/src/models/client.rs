//! External client accounts.

use crewline_core::client::ApprovalStatus;
use crewline_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Full `clients` row, including the password hash.
#[derive(Debug, Clone, FromRow)]
pub struct Client {
    pub id: DbId,
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone_number: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub approval_status: ApprovalStatus,
    pub document_url: Option<String>,
    pub rejection_reason: Option<String>,
    pub approved_by: Option<DbId>,
    pub approved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    pub id: DbId,
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone_number: String,
    pub approval_status: ApprovalStatus,
    pub document_url: Option<String>,
    pub rejection_reason: Option<String>,
    pub approved_by: Option<DbId>,
    pub approved_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Client> for ClientResponse {
    fn from(c: Client) -> Self {
        Self {
            id: c.id,
            company_name: c.company_name,
            contact_name: c.contact_name,
            email: c.email,
            phone_number: c.phone_number,
            approval_status: c.approval_status,
            document_url: c.document_url,
            rejection_reason: c.rejection_reason,
            approved_by: c.approved_by,
            approved_at: c.approved_at,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Minimal client reference embedded in project responses.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub id: DbId,
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct CreateClient {
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone_number: String,
    pub password_hash: String,
    pub document_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateClientProfile {
    pub company_name: Option<String>,
    pub contact_name: Option<String>,
    pub phone_number: Option<String>,
}

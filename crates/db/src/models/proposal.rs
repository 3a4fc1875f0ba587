//! Sales proposals.

use crewline_core::proposal::ProposalStatus;
use crewline_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub value: f64,
    pub client_id: Option<DbId>,
    pub submitted_by: DbId,
    #[sqlx(try_from = "String")]
    pub status: ProposalStatus,
    pub submitted_at: Option<Timestamp>,
    pub approved_by: Option<DbId>,
    pub approved_at: Option<Timestamp>,
    pub decision_note: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateProposal {
    pub title: String,
    pub description: Option<String>,
    pub value: f64,
    pub client_id: Option<DbId>,
    pub submitted_by: DbId,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProposal {
    pub title: Option<String>,
    pub description: Option<String>,
    pub value: Option<f64>,
    pub client_id: Option<DbId>,
}

#[derive(Debug, Clone, Default)]
pub struct ProposalFilter {
    pub submitted_by: Option<DbId>,
    pub status: Option<ProposalStatus>,
}

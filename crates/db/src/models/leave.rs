//! Leave requests.

use crewline_core::leave::LeaveStatus;
use crewline_core::types::{Date, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Leave {
    pub id: DbId,
    pub user_id: DbId,
    pub leave_type: String,
    pub start_date: Date,
    pub end_date: Date,
    pub reason: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: LeaveStatus,
    pub decided_by: Option<DbId>,
    pub decided_at: Option<Timestamp>,
    pub decision_note: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateLeave {
    pub user_id: DbId,
    pub leave_type: String,
    pub start_date: Date,
    pub end_date: Date,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateLeave {
    pub leave_type: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub reason: Option<String>,
}

/// Outcome recorded when a supervisor decides a request.
#[derive(Debug, Clone)]
pub struct LeaveDecision {
    pub status: LeaveStatus,
    pub decided_by: DbId,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LeaveFilter {
    /// Restrict to one requester; `None` lists everyone's requests.
    pub user_id: Option<DbId>,
    pub status: Option<LeaveStatus>,
}

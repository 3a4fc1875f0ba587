//! Project tasks.

use crewline_core::project::TaskStatus;
use crewline_core::types::{Date, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: DbId,
    pub project_id: DbId,
    pub assignee_id: Option<DbId>,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    pub due_date: Option<Date>,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: DbId,
    pub assignee_id: Option<DbId>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<Date>,
    pub created_by: DbId,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub assignee_id: Option<DbId>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<Date>,
}

//! Project entity model, link tables and DTOs.

use crewline_core::project::ProjectStatus;
use crewline_core::types::{Date, DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::client::ClientSummary;

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    pub start_date: Option<Date>,
    pub due_date: Option<Date>,
    pub created_by: Option<DbId>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A team linked to a project, with the link's note.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTeam {
    pub team_id: DbId,
    pub name: String,
    pub note: Option<String>,
}

/// A project together with its team and client links.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub teams: Vec<ProjectTeam>,
    pub clients: Vec<ClientSummary>,
}

/// A team link to create alongside a project.
#[derive(Debug, Clone)]
pub struct TeamLink {
    pub team_id: DbId,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<Date>,
    pub due_date: Option<Date>,
    pub created_by: DbId,
}

/// Partial update of project fields. Status is changed only through the
/// status transition endpoint.
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<Date>,
    pub due_date: Option<Date>,
}

/// Recipient of a project completion email.
#[derive(Debug, Clone, FromRow)]
pub struct ProjectClientContact {
    pub client_id: DbId,
    pub contact_name: String,
    pub email: String,
}
